//! Backtest engine: daily ticks over preloaded series through the
//! strategy driver.
//!
//! The bar dated on the tick day counts as completed, so signals and
//! fills both use that day's close. Open positions are marked at the
//! close of the tick day; assets without a bar on that day are not marked.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::HashMap;
use tracing::{info, warn};

use super::driver::{run_tick, StrategyContext};
use super::equity::EquityHistory;
use super::error::TurtleError;
use super::ledger::{LedgerState, PositionLedger};
use super::ohlcv::{tail, window_until, OhlcvBar};
use super::position::{Fill, OrderIntent, TradeRecord};
use super::strategy::StrategyConfig;
use crate::ports::venue_port::VenuePort;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    /// Configuration with the date range adjusted to the data.
    pub config: BacktestConfig,
    pub strategy: StrategyConfig,
    pub strategy_investment: f64,
    pub history: EquityHistory,
    pub trades: Vec<TradeRecord>,
    pub final_cash: f64,
    pub open_positions: LedgerState,
}

impl BacktestResult {
    pub fn final_value(&self) -> f64 {
        self.history
            .last()
            .map(|s| s.total_value)
            .unwrap_or(self.strategy_investment)
    }
}

/// Venue over in-memory series, positioned at one simulated day.
pub struct SimulatedVenue<'a> {
    series: &'a HashMap<String, Vec<OhlcvBar>>,
    date: NaiveDate,
}

impl<'a> SimulatedVenue<'a> {
    pub fn new(series: &'a HashMap<String, Vec<OhlcvBar>>, date: NaiveDate) -> Self {
        SimulatedVenue { series, date }
    }

    pub fn set_date(&mut self, date: NaiveDate) {
        self.date = date;
    }

    /// Close of the bar dated exactly on the current day.
    pub fn close_on_date(&self, asset: &str) -> Option<f64> {
        let bars = self.series.get(asset)?;
        let idx = bars.binary_search_by_key(&self.date, |b| b.date).ok()?;
        Some(bars[idx].close)
    }
}

impl VenuePort for SimulatedVenue<'_> {
    fn now(&self) -> NaiveDateTime {
        self.date.and_time(NaiveTime::MIN)
    }

    fn candles(&mut self, asset: &str, count: usize) -> Result<Vec<OhlcvBar>, TurtleError> {
        Ok(self
            .series
            .get(asset)
            .map(|bars| tail(window_until(bars, self.date), count).to_vec())
            .unwrap_or_default())
    }

    fn quote(&mut self, _asset: &str, reference: f64) -> Result<f64, TurtleError> {
        Ok(reference)
    }

    fn execute(&mut self, order: &OrderIntent) -> Result<Fill, TurtleError> {
        Ok(Fill {
            amount: order.amount,
            price: order.price,
        })
    }

    fn committed(
        &mut self,
        _ledger: &PositionLedger,
        _trade: &TradeRecord,
    ) -> Result<(), TurtleError> {
        Ok(())
    }

    fn mark(&mut self, asset: &str) -> Option<f64> {
        self.close_on_date(asset)
    }
}

/// Clamp the configured range to the span every series covers, after
/// leaving `warmup_days` of history in front of the first tick.
pub fn adjust_period(
    series: &HashMap<String, Vec<OhlcvBar>>,
    config: &BacktestConfig,
    warmup_days: usize,
) -> Result<(NaiveDate, NaiveDate), TurtleError> {
    let mut common_start: Option<NaiveDate> = None;
    let mut common_end: Option<NaiveDate> = None;

    for (asset, bars) in series {
        let (first, last) = match (bars.first(), bars.last()) {
            (Some(f), Some(l)) => (f.date, l.date),
            _ => {
                return Err(TurtleError::NoData {
                    asset: asset.clone(),
                });
            }
        };
        common_start = Some(common_start.map_or(first, |d| d.max(first)));
        common_end = Some(common_end.map_or(last, |d| d.min(last)));
    }

    let (common_start, common_end) = match (common_start, common_end) {
        (Some(s), Some(e)) => (s, e),
        _ => {
            return Err(TurtleError::NoData {
                asset: "all".to_string(),
            });
        }
    };

    let start = config
        .start_date
        .max(common_start + Duration::days(warmup_days as i64));
    let end = config.end_date.min(common_end);

    if start > end {
        return Err(TurtleError::Data {
            reason: format!(
                "no backtest window left: data covers {common_start}..{common_end}, \
                 needs {warmup_days} warm-up days, adjusted range {start}..{end}"
            ),
        });
    }
    Ok((start, end))
}

pub fn run_backtest(
    series: &HashMap<String, Vec<OhlcvBar>>,
    strategy: &StrategyConfig,
    config: &BacktestConfig,
) -> Result<BacktestResult, TurtleError> {
    let mut strategy = strategy.clone();
    let available: Vec<String> = strategy
        .asset_names()
        .into_iter()
        .filter(|a| series.contains_key(a))
        .collect();
    for asset in strategy.asset_names() {
        if !available.contains(&asset) {
            warn!(%asset, "no series loaded, asset excluded");
        }
    }
    strategy.retain_assets(&available);
    if strategy.assets.is_empty() {
        return Err(TurtleError::NoData {
            asset: "all".to_string(),
        });
    }

    let used: HashMap<String, Vec<OhlcvBar>> = series
        .iter()
        .filter(|(k, _)| available.contains(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let (start, end) = adjust_period(&used, config, strategy.warmup_days())?;
    if start != config.start_date || end != config.end_date {
        info!(%start, %end, "adjusted backtest period to available data");
    }

    let strategy_investment = config.initial_capital * strategy.usage_ratio;
    let ledger = PositionLedger::new(config.initial_capital, strategy.fee_rate);
    let mut ctx = StrategyContext::new(strategy, ledger, strategy_investment);

    let day_zero = start - Duration::days(1);
    let mut venue = SimulatedVenue::new(&used, day_zero);
    let marks: HashMap<String, f64> = ctx
        .config
        .asset_names()
        .into_iter()
        .filter_map(|a| venue.close_on_date(&a).map(|p| (a, p)))
        .collect();
    ctx.snapshot(day_zero, &marks)?;

    info!(
        %start,
        %end,
        assets = ctx.config.asset_count(),
        periods = ctx.config.periods.len(),
        strategy_investment,
        "backtest started"
    );

    let mut date = start;
    while date <= end {
        venue.set_date(date);
        run_tick(&mut ctx, &mut venue, strategy_investment)?;
        date += Duration::days(1);
    }

    info!(
        trades = ctx.ledger.trades().len(),
        open_positions = ctx.ledger.open_count(),
        "backtest finished"
    );

    Ok(BacktestResult {
        config: BacktestConfig {
            start_date: start,
            end_date: end,
            initial_capital: config.initial_capital,
        },
        strategy_investment,
        final_cash: ctx.ledger.cash,
        open_positions: ctx.ledger.to_state(),
        trades: ctx.ledger.trades().to_vec(),
        history: ctx.history,
        strategy: ctx.config,
    })
}
