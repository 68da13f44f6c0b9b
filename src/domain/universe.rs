//! Asset universe: parsing asset and period lists from configuration and
//! loading the candle series each asset needs for a backtest.

use crate::domain::error::TurtleError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in list")]
    EmptyToken,

    #[error("duplicate entry: {0}")]
    Duplicate(String),

    #[error("invalid period: {0}")]
    InvalidPeriod(String),
}

/// Comma-separated asset list, upper-cased, duplicates rejected.
pub fn parse_assets(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut assets = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let asset = trimmed.to_uppercase();
        if !seen.insert(asset.clone()) {
            return Err(UniverseError::Duplicate(asset));
        }
        assets.push(asset);
    }

    Ok(assets)
}

/// Comma-separated list of positive lookback periods, order preserved.
pub fn parse_periods(input: &str) -> Result<Vec<usize>, UniverseError> {
    let mut periods = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let period: usize = trimmed
            .parse()
            .map_err(|_| UniverseError::InvalidPeriod(trimmed.to_string()))?;
        if period == 0 {
            return Err(UniverseError::InvalidPeriod(trimmed.to_string()));
        }
        if !seen.insert(period) {
            return Err(UniverseError::Duplicate(trimmed.to_string()));
        }
        periods.push(period);
    }

    Ok(periods)
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData,
    FetchFailed(String),
}

#[derive(Debug, Clone)]
pub struct SkippedAsset {
    pub asset: String,
    pub reason: SkipReason,
}

#[derive(Debug)]
pub struct LoadedUniverse {
    pub series: HashMap<String, Vec<OhlcvBar>>,
    pub skipped: Vec<SkippedAsset>,
}

impl LoadedUniverse {
    pub fn loaded_assets(&self, order: &[String]) -> Vec<String> {
        order
            .iter()
            .filter(|a| self.series.contains_key(*a))
            .cloned()
            .collect()
    }
}

/// Fetch every asset's series; assets without data are skipped, but at
/// least one must load.
pub fn load_universe(
    data_port: &dyn DataPort,
    assets: &[String],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<LoadedUniverse, TurtleError> {
    let mut series = HashMap::new();
    let mut skipped = Vec::new();

    for asset in assets {
        match data_port.fetch_ohlcv(asset, start_date, end_date) {
            Ok(bars) if bars.is_empty() => {
                warn!(%asset, "skipping asset: no data");
                skipped.push(SkippedAsset {
                    asset: asset.clone(),
                    reason: SkipReason::NoData,
                });
            }
            Ok(bars) => {
                info!(%asset, bars = bars.len(), "loaded series");
                series.insert(asset.clone(), bars);
            }
            Err(e) => {
                warn!(%asset, error = %e, "skipping asset: fetch failed");
                skipped.push(SkippedAsset {
                    asset: asset.clone(),
                    reason: SkipReason::FetchFailed(e.to_string()),
                });
            }
        }
    }

    if series.is_empty() {
        return Err(TurtleError::NoData {
            asset: "all".to_string(),
        });
    }

    Ok(LoadedUniverse { series, skipped })
}
