//! Strategy driver: one evaluation tick across every asset and period.
//!
//! Per tick the driver splits `strategy_capital` evenly across assets,
//! scales each asset's share by its volatility multiplier, divides it
//! evenly across periods, then walks the periods in configuration order
//! opening or closing slots on breakout signals. One equity snapshot is
//! recorded at the end of every tick.

use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{debug, info};

use super::donchian::{self, Signal};
use super::equity::{EquityAccountant, EquityHistory, Valuation};
use super::error::TurtleError;
use super::ledger::PositionLedger;
use super::position::{SlotKey, TradeAction, TradeRecord};
use super::skip::Skip;
use super::strategy::{AssetConfig, StrategyConfig};
use super::volatility;
use crate::ports::venue_port::VenuePort;

/// Everything one strategy instance carries between ticks.
#[derive(Debug, Clone)]
pub struct StrategyContext {
    pub config: StrategyConfig,
    pub ledger: PositionLedger,
    pub accountant: EquityAccountant,
    pub history: EquityHistory,
}

impl StrategyContext {
    pub fn new(config: StrategyConfig, ledger: PositionLedger, strategy_investment: f64) -> Self {
        let accountant = EquityAccountant::new(strategy_investment, config.asset_names());
        StrategyContext {
            config,
            ledger,
            accountant,
            history: EquityHistory::new(),
        }
    }

    /// Value the ledger against `marks` and append a snapshot for `date`.
    pub fn snapshot(
        &mut self,
        date: NaiveDate,
        marks: &HashMap<String, f64>,
    ) -> Result<Valuation, TurtleError> {
        let valuation = self.accountant.value_at(&self.ledger, marks);
        self.history.record(
            date,
            &valuation,
            self.ledger.cash,
            self.ledger.open_count(),
        )?;
        Ok(valuation)
    }
}

/// A slot (or, with `period == None`, a whole asset) left alone this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSlot {
    pub asset: String,
    pub period: Option<usize>,
    pub reason: Skip,
}

#[derive(Debug, Clone)]
pub struct TickReport {
    pub date: NaiveDate,
    pub trades: Vec<TradeRecord>,
    pub skipped: Vec<SkippedSlot>,
    pub valuation: Valuation,
}

/// Capital for one slot: `base * multiplier / period_count`.
pub fn capital_per_period(base: f64, multiplier: f64, period_count: usize) -> f64 {
    if period_count == 0 {
        0.0
    } else {
        base * multiplier / period_count as f64
    }
}

pub fn run_tick(
    ctx: &mut StrategyContext,
    venue: &mut dyn VenuePort,
    strategy_capital: f64,
) -> Result<TickReport, TurtleError> {
    let now = venue.now();
    let asset_count = ctx.config.asset_count();
    let base = if asset_count == 0 {
        0.0
    } else {
        strategy_capital / asset_count as f64
    };
    let bars_needed = ctx.config.bars_needed();

    let mut trades = Vec::new();
    let mut skipped = Vec::new();
    let assets: Vec<AssetConfig> = ctx.config.assets.clone();

    for asset_cfg in &assets {
        let asset = asset_cfg.asset.as_str();
        let bars = venue.candles(asset, bars_needed)?;

        let vol = match volatility::estimate(&bars, ctx.config.volatility_period) {
            Ok(v) => v,
            Err(reason) => {
                debug!(%asset, %reason, "skipping asset");
                skipped.push(SkippedSlot {
                    asset: asset.to_string(),
                    period: None,
                    reason,
                });
                continue;
            }
        };
        let multiplier = vol.multiplier(ctx.config.volatility_target);
        let capital = capital_per_period(base, multiplier, ctx.config.periods.len());
        debug!(
            %asset,
            scaled_vol = vol.scaled,
            multiplier,
            capital_per_period = capital,
            "sized asset"
        );

        for &period in &ctx.config.periods {
            let key = SlotKey::new(asset, period);
            let open_side = ctx.ledger.get(&key).map(|p| p.side);

            let (channel, signal) =
                match donchian::evaluate(&bars, period, open_side, asset_cfg.settings.long_only) {
                    Ok(result) => result,
                    Err(reason) => {
                        debug!(%key, %reason, "skipping slot");
                        skipped.push(SkippedSlot {
                            asset: asset.to_string(),
                            period: Some(period),
                            reason,
                        });
                        continue;
                    }
                };
            debug!(
                %key,
                upper = channel.upper,
                lower = channel.lower,
                midline = channel.midline,
                reference = channel.reference,
                "channel"
            );

            let (side, action) = match signal {
                Signal::Hold => continue,
                Signal::Enter(side) => (side, TradeAction::Open),
                Signal::Exit(side) => (side, TradeAction::Close),
            };

            let price = venue.quote(asset, channel.reference)?;
            if price <= 0.0 || !price.is_finite() {
                let reason = Skip::NonPositivePrice { price };
                debug!(%key, %reason, "skipping slot");
                skipped.push(SkippedSlot {
                    asset: asset.to_string(),
                    period: Some(period),
                    reason,
                });
                continue;
            }

            let record = match action {
                TradeAction::Open => {
                    let leverage = asset_cfg.settings.leverage(side);
                    let intent = ctx.ledger.plan_open(&key, side, capital, leverage, price)?;
                    let fill = venue.execute(&intent)?;
                    ctx.ledger.commit_open(&intent, fill, now)?
                }
                TradeAction::Close => {
                    let intent = ctx.ledger.plan_close(&key, price)?;
                    let fill = venue.execute(&intent)?;
                    ctx.ledger.commit_close(&intent, fill, now)?
                }
            };
            log_trade(&record);
            venue.committed(&ctx.ledger, &record)?;
            trades.push(record);
        }
    }

    let marks = collect_marks(ctx, venue);
    let valuation = ctx.snapshot(now.date(), &marks)?;

    Ok(TickReport {
        date: now.date(),
        trades,
        skipped,
        valuation,
    })
}

fn collect_marks(ctx: &StrategyContext, venue: &mut dyn VenuePort) -> HashMap<String, f64> {
    let mut assets: Vec<String> = ctx.config.asset_names();
    for (key, _) in ctx.ledger.positions() {
        if !assets.contains(&key.asset) {
            assets.push(key.asset.clone());
        }
    }
    assets
        .into_iter()
        .filter_map(|asset| venue.mark(&asset).map(|price| (asset, price)))
        .collect()
}

fn log_trade(record: &TradeRecord) {
    let key = format!("{}-{}", record.asset, record.period);
    match record.action {
        TradeAction::Open => info!(
            %key,
            side = %record.side,
            amount = record.amount,
            price = record.price,
            leverage = record.leverage,
            "opened"
        ),
        TradeAction::Close => info!(
            %key,
            side = %record.side,
            price = record.price,
            pnl = record.pnl,
            "closed"
        ),
    }
}
