//! Reasons a slot or asset is skipped for a tick. These are expected
//! conditions, not errors.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Skip {
    /// Warm-up: not enough bars or return observations yet.
    InsufficientData { have: usize, need: usize },
    /// Realized volatility is zero, so there is no sizing signal.
    FlatPrices,
    /// A price quote was zero or negative.
    NonPositivePrice { price: f64 },
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Skip::InsufficientData { have, need } => {
                write!(f, "insufficient data: have {have}, need {need}")
            }
            Skip::FlatPrices => write!(f, "zero volatility"),
            Skip::NonPositivePrice { price } => write!(f, "non-positive price {price}"),
        }
    }
}
