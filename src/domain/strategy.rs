//! Strategy configuration: lookback periods, volatility targeting and
//! per-asset trading permissions.

use super::position::Side;

pub const DEFAULT_PERIODS: [usize; 5] = [5, 10, 20, 30, 60];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssetSettings {
    pub long_only: bool,
    pub long_leverage: u32,
    pub short_leverage: u32,
}

impl Default for AssetSettings {
    fn default() -> Self {
        AssetSettings {
            long_only: false,
            long_leverage: 1,
            short_leverage: 1,
        }
    }
}

impl AssetSettings {
    pub fn leverage(&self, side: Side) -> u32 {
        match side {
            Side::Long => self.long_leverage,
            Side::Short => self.short_leverage,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetConfig {
    pub asset: String,
    pub settings: AssetSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    /// Donchian lookbacks, evaluated in this order.
    pub periods: Vec<usize>,
    pub volatility_period: usize,
    pub volatility_target: f64,
    /// Share of the account the strategy may deploy.
    pub usage_ratio: f64,
    pub fee_rate: f64,
    /// Assets, evaluated in this order.
    pub assets: Vec<AssetConfig>,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            periods: DEFAULT_PERIODS.to_vec(),
            volatility_period: 90,
            volatility_target: 0.25,
            usage_ratio: 0.5,
            fee_rate: 0.0,
            assets: Vec::new(),
        }
    }
}

impl StrategyConfig {
    pub fn asset_names(&self) -> Vec<String> {
        self.assets.iter().map(|a| a.asset.clone()).collect()
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    pub fn max_period(&self) -> usize {
        self.periods.iter().copied().max().unwrap_or(0)
    }

    /// Bars the driver requests per asset per tick.
    pub fn bars_needed(&self) -> usize {
        (self.volatility_period + 1).max(self.max_period() + 1)
    }

    /// Days of history consumed before the first meaningful tick.
    pub fn warmup_days(&self) -> usize {
        self.volatility_period + self.max_period() + 5
    }

    /// Keep only the listed assets, preserving configuration order.
    pub fn retain_assets(&mut self, keep: &[String]) {
        self.assets.retain(|a| keep.contains(&a.asset));
    }
}
