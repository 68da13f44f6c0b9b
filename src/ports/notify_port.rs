//! Notification delivery port.

use crate::domain::error::TurtleError;

pub trait NotifierPort {
    fn send(&self, message: &str) -> Result<(), TurtleError>;
}
