//! Volatility scaler.
//!
//! Sample standard deviation of simple daily close-to-close returns over the
//! trailing `lookback + 1` closes, scaled to a fixed 90-day horizon:
//!
//! scaled_vol = stdev(close[t] / close[t-1] - 1) * sqrt(90)
//!
//! The allocation multiplier `target / scaled_vol` sizes every asset to a
//! comparable risk budget.

use crate::domain::ohlcv::{tail, OhlcvBar};
use crate::domain::skip::Skip;

/// Horizon (in days) the daily standard deviation is scaled to.
pub const HORIZON_DAYS: f64 = 90.0;

/// Return observations that may be missing before the estimate is refused.
pub const GAP_TOLERANCE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Volatility {
    pub daily_std: f64,
    pub scaled: f64,
    pub observations: usize,
}

impl Volatility {
    /// `target / scaled`.
    pub fn multiplier(&self, target: f64) -> f64 {
        target / self.scaled
    }
}

/// Minimum number of return observations accepted for `lookback`.
pub fn required_observations(lookback: usize) -> usize {
    lookback.saturating_sub(GAP_TOLERANCE).max(2)
}

pub fn daily_returns(bars: &[OhlcvBar]) -> Vec<f64> {
    bars.windows(2)
        .filter(|w| w[0].close != 0.0)
        .map(|w| w[1].close / w[0].close - 1.0)
        .collect()
}

/// Sample (n - 1) standard deviation. `None` for fewer than two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}

/// Estimate scaled volatility from the trailing `lookback + 1` bars of `bars`.
pub fn estimate(bars: &[OhlcvBar], lookback: usize) -> Result<Volatility, Skip> {
    let window = tail(bars, lookback + 1);
    let returns = daily_returns(window);
    let need = required_observations(lookback);

    if returns.len() < need {
        return Err(Skip::InsufficientData {
            have: returns.len(),
            need,
        });
    }

    let daily_std = sample_std(&returns).ok_or(Skip::InsufficientData {
        have: returns.len(),
        need,
    })?;
    let scaled = daily_std * HORIZON_DAYS.sqrt();

    if scaled == 0.0 || !scaled.is_finite() {
        return Err(Skip::FlatPrices);
    }

    Ok(Volatility {
        daily_std,
        scaled,
        observations: returns.len(),
    })
}
