//! Exchange client port used by the live runner.

use crate::domain::error::TurtleError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::position::{Fill, OrderIntent};

pub trait ExchangePort {
    /// Most recent `count` candles, oldest first. The last one may still be
    /// forming. Fewer rows than requested is not an error.
    fn get_candles(
        &self,
        asset: &str,
        timeframe: &str,
        count: usize,
    ) -> Result<Vec<OhlcvBar>, TurtleError>;

    /// Last traded price. Zero or negative means no usable quote.
    fn get_current_price(&self, asset: &str) -> Result<f64, TurtleError>;

    fn get_account_balance(&self) -> Result<f64, TurtleError>;

    fn set_leverage(&mut self, asset: &str, leverage: u32) -> Result<(), TurtleError>;

    /// Place a market order for `order.amount` units; returns what filled.
    fn place_market_order(&mut self, order: &OrderIntent) -> Result<Fill, TurtleError>;
}
