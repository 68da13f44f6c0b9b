//! Equity accounting: total and per-asset valuation at a date.
//!
//! total     = investment + sum(trade pnl) + sum(unrealized at mark)
//! asset(a)  = investment / asset_count + sum(trade pnl of a) + sum(unrealized of a)
//!
//! Positions whose asset has no mark for the date contribute zero
//! unrealized PnL. The per-asset values always sum to the total.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

use super::error::TurtleError;
use super::ledger::PositionLedger;

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquitySnapshot {
    pub date: NaiveDate,
    pub total_value: f64,
    pub cash: f64,
    pub open_positions: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Valuation {
    pub total: f64,
    pub per_asset: BTreeMap<String, f64>,
}

impl Valuation {
    pub fn per_asset_sum(&self) -> f64 {
        self.per_asset.values().sum()
    }

    /// `|sum(per_asset) - total| <= tolerance * max(1, |total|)`
    pub fn reconciles(&self, tolerance: f64) -> bool {
        let diff = (self.per_asset_sum() - self.total).abs();
        diff <= tolerance * self.total.abs().max(1.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquityAccountant {
    strategy_investment: f64,
    assets: Vec<String>,
}

impl EquityAccountant {
    pub fn new(strategy_investment: f64, assets: Vec<String>) -> Self {
        EquityAccountant {
            strategy_investment,
            assets,
        }
    }

    pub fn strategy_investment(&self) -> f64 {
        self.strategy_investment
    }

    pub fn base_per_asset(&self) -> f64 {
        if self.assets.is_empty() {
            0.0
        } else {
            self.strategy_investment / self.assets.len() as f64
        }
    }

    pub fn value_at(&self, ledger: &PositionLedger, marks: &HashMap<String, f64>) -> Valuation {
        let base = self.base_per_asset();
        let mut per_asset: BTreeMap<String, f64> =
            self.assets.iter().map(|a| (a.clone(), base)).collect();

        // Trades and positions of assets no longer configured still count,
        // under a zero base, so the split keeps summing to the total.
        for trade in ledger.trades() {
            *per_asset.entry(trade.asset.clone()).or_insert(0.0) += trade.pnl;
        }

        let mut unrealized = 0.0;
        for (key, pos) in ledger.positions() {
            let pnl = match marks.get(&key.asset) {
                Some(&mark) if mark > 0.0 => pos.pnl_at(mark),
                _ => 0.0,
            };
            unrealized += pnl;
            *per_asset.entry(key.asset.clone()).or_insert(0.0) += pnl;
        }

        let invested = if self.assets.is_empty() {
            0.0
        } else {
            self.strategy_investment
        };

        Valuation {
            total: invested + ledger.realized_pnl() + unrealized,
            per_asset,
        }
    }
}

/// Time-ordered snapshot series for the whole strategy and per asset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EquityHistory {
    pub snapshots: Vec<EquitySnapshot>,
    pub per_asset: BTreeMap<String, Vec<EquityPoint>>,
}

impl EquityHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        date: NaiveDate,
        valuation: &Valuation,
        cash: f64,
        open_positions: usize,
    ) -> Result<(), TurtleError> {
        if let Some(last) = self.snapshots.last() {
            if date <= last.date {
                return Err(TurtleError::Data {
                    reason: format!("equity snapshot {date} is not after {}", last.date),
                });
            }
        }

        self.snapshots.push(EquitySnapshot {
            date,
            total_value: valuation.total,
            cash,
            open_positions,
        });
        for (asset, &value) in &valuation.per_asset {
            self.per_asset.entry(asset.clone()).or_default().push(EquityPoint {
                date,
                equity: value,
            });
        }
        Ok(())
    }

    pub fn last(&self) -> Option<&EquitySnapshot> {
        self.snapshots.last()
    }

    pub fn curve(&self) -> Vec<EquityPoint> {
        self.snapshots
            .iter()
            .map(|s| EquityPoint {
                date: s.date,
                equity: s.total_value,
            })
            .collect()
    }
}
