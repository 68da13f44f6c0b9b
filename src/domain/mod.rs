//! Core domain types and logic.

pub mod ohlcv;
pub mod position;
pub mod skip;
pub mod volatility;
pub mod donchian;
pub mod ledger;
pub mod equity;
pub mod strategy;
pub mod driver;
pub mod backtest;
pub mod live;
pub mod metrics;
pub mod universe;
pub mod config_validation;
pub mod error;
