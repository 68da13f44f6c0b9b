//! OHLCV bar representation and read-only windows over a series.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// All bars with `date <= as_of`. The series must be sorted by date.
pub fn window_until(bars: &[OhlcvBar], as_of: NaiveDate) -> &[OhlcvBar] {
    let end = bars.partition_point(|b| b.date <= as_of);
    &bars[..end]
}

/// The trailing `count` bars (or fewer, if the series is shorter).
pub fn tail(bars: &[OhlcvBar], count: usize) -> &[OhlcvBar] {
    &bars[bars.len().saturating_sub(count)..]
}
