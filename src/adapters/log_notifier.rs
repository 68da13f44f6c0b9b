//! Notifier that writes alerts to the tracing log.

use crate::domain::error::TurtleError;
use crate::ports::notify_port::NotifierPort;
use tracing::info;

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl NotifierPort for LogNotifier {
    fn send(&self, message: &str) -> Result<(), TurtleError> {
        info!(target: "turtletrader::alert", "{message}");
        Ok(())
    }
}
