//! The seam between the strategy driver and the world it trades in.
//!
//! The backtester implements it over preloaded series; the live runner
//! implements it over an exchange client plus state, log and alert sinks.

use chrono::NaiveDateTime;

use crate::domain::error::TurtleError;
use crate::domain::ledger::PositionLedger;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::position::{Fill, OrderIntent, TradeRecord};

pub trait VenuePort {
    /// Evaluation time of the current tick.
    fn now(&self) -> NaiveDateTime;

    /// Up to `count` completed bars for `asset`, oldest first.
    fn candles(&mut self, asset: &str, count: usize) -> Result<Vec<OhlcvBar>, TurtleError>;

    /// Execution price for an order triggered at signal price `reference`.
    fn quote(&mut self, asset: &str, reference: f64) -> Result<f64, TurtleError>;

    fn execute(&mut self, order: &OrderIntent) -> Result<Fill, TurtleError>;

    /// Called once per committed transition, after the ledger changed.
    fn committed(&mut self, ledger: &PositionLedger, trade: &TradeRecord)
    -> Result<(), TurtleError>;

    /// Mark price used for valuation at the end of the tick.
    fn mark(&mut self, asset: &str) -> Option<f64>;
}
