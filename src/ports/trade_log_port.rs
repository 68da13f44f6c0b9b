//! Append-only trade record sink.

use crate::domain::error::TurtleError;
use crate::domain::position::TradeRecord;

pub trait TradeLogPort {
    fn append(&mut self, trade: &TradeRecord) -> Result<(), TurtleError>;
}
