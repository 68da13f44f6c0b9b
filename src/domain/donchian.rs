//! Donchian channel breakout signals.
//!
//! The window handed in must contain completed bars only. The most recent
//! bar is the signal bar: its close is the reference price, and it is
//! excluded from the channel, which spans the `period` bars before it.
//!
//! upper   = max(high) over the channel bars
//! lower   = min(low)  over the channel bars
//! midline = (upper + lower) / 2
//!
//! All comparisons are strict; touching a bound never triggers.

use crate::domain::ohlcv::{tail, OhlcvBar};
use crate::domain::position::Side;
use crate::domain::skip::Skip;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Channel {
    pub period: usize,
    pub upper: f64,
    pub lower: f64,
    pub midline: f64,
    pub reference: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Enter(Side),
    Exit(Side),
    Hold,
}

/// Minimum window length producing a channel for `period`.
pub fn required_bars(period: usize) -> usize {
    period + 1
}

pub fn channel(bars: &[OhlcvBar], period: usize) -> Result<Channel, Skip> {
    let need = required_bars(period);
    if period == 0 || bars.len() < need {
        return Err(Skip::InsufficientData {
            have: bars.len(),
            need,
        });
    }

    let window = tail(bars, need);
    let (channel_bars, signal_bar) = window.split_at(period);

    let upper = channel_bars
        .iter()
        .map(|b| b.high)
        .fold(f64::NEG_INFINITY, f64::max);
    let lower = channel_bars
        .iter()
        .map(|b| b.low)
        .fold(f64::INFINITY, f64::min);

    Ok(Channel {
        period,
        upper,
        lower,
        midline: (upper + lower) / 2.0,
        reference: signal_bar[0].close,
    })
}

impl Channel {
    /// Breakout entry side, if any. Shorts are suppressed for long-only assets.
    pub fn entry(&self, long_only: bool) -> Option<Side> {
        if self.reference > self.upper {
            Some(Side::Long)
        } else if !long_only && self.reference < self.lower {
            Some(Side::Short)
        } else {
            None
        }
    }

    /// Whether an open position on `side` crossed back through the midline.
    pub fn exits(&self, side: Side) -> bool {
        match side {
            Side::Long => self.reference < self.midline,
            Side::Short => self.reference > self.midline,
        }
    }

    /// Entry signals are only consulted when the slot is flat, exit signals
    /// only when it holds `open`.
    pub fn signal(&self, open: Option<Side>, long_only: bool) -> Signal {
        match open {
            None => self.entry(long_only).map_or(Signal::Hold, Signal::Enter),
            Some(side) if self.exits(side) => Signal::Exit(side),
            Some(_) => Signal::Hold,
        }
    }
}

/// Channel plus signal in one call.
pub fn evaluate(
    bars: &[OhlcvBar],
    period: usize,
    open: Option<Side>,
    long_only: bool,
) -> Result<(Channel, Signal), Skip> {
    let ch = channel(bars, period)?;
    Ok((ch, ch.signal(open, long_only)))
}
