//! Historical candle data port.

use crate::domain::error::TurtleError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Daily bars for `asset` within `[start_date, end_date]`, sorted by date.
    fn fetch_ohlcv(
        &self,
        asset: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, TurtleError>;
}
