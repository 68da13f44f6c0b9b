//! Performance metrics and statistics.

use super::equity::{EquityHistory, EquityPoint};
use super::position::{Side, TradeAction, TradeRecord};
use super::volatility::sample_std;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use std::fmt;

/// Crypto markets trade every calendar day.
const PERIODS_PER_YEAR: f64 = 365.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub final_value: f64,
    pub total_return: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: i64,
    pub total_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_holding_days: f64,
}

impl Metrics {
    /// Returns are measured against `strategy_investment`; trade statistics
    /// count CLOSE records only, all records count toward `total_trades`.
    pub fn compute(
        history: &EquityHistory,
        trades: &[TradeRecord],
        strategy_investment: f64,
    ) -> Self {
        let equity_curve = history.curve();

        let final_value = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(strategy_investment);

        let total_return = if strategy_investment > 0.0 {
            (final_value - strategy_investment) / strategy_investment
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(&equity_curve);
        let sharpe_ratio = compute_sharpe(&equity_curve);

        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut trades_breakeven = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut holding_days = 0i64;
        let mut open_times = BTreeMap::new();

        for trade in trades {
            let key = (trade.asset.as_str(), trade.period);
            if trade.action == TradeAction::Open {
                open_times.insert(key, trade.time);
                continue;
            }
            if let Some(opened) = open_times.remove(&key) {
                holding_days += (trade.time - opened).num_days();
            }

            let pnl = trade.pnl;
            if pnl > 0.0 {
                trades_won += 1;
                total_wins += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < 0.0 {
                trades_lost += 1;
                total_losses += pnl.abs();
                largest_loss = largest_loss.max(pnl.abs());
            } else {
                trades_breakeven += 1;
            }
        }

        let closed = trades_won + trades_lost + trades_breakeven;
        let win_rate = if closed > 0 {
            trades_won as f64 / closed as f64
        } else {
            0.0
        };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let avg_win = if trades_won > 0 {
            total_wins / trades_won as f64
        } else {
            0.0
        };

        let avg_loss = if trades_lost > 0 {
            total_losses / trades_lost as f64
        } else {
            0.0
        };

        let avg_holding_days = if closed > 0 {
            holding_days as f64 / closed as f64
        } else {
            0.0
        };

        Metrics {
            final_value,
            total_return,
            sharpe_ratio,
            max_drawdown,
            max_drawdown_duration,
            total_trades: trades.len(),
            trades_won,
            trades_lost,
            trades_breakeven,
            win_rate,
            profit_factor,
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
            avg_holding_days,
        }
    }
}

/// Largest peak-to-trough fall as a positive fraction of the peak, and the
/// longest run of snapshots spent below a peak.
pub fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, i64) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0i64;
    let mut current_dd_duration = 0i64;

    for point in equity_curve {
        if point.equity >= peak {
            peak = point.equity;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            let dd = (peak - point.equity) / peak;
            max_dd = max_dd.max(dd);
            current_dd_duration += 1;
            max_dd_duration = max_dd_duration.max(current_dd_duration);
        }
    }

    (max_dd, max_dd_duration)
}

/// Annualised Sharpe ratio of simple period returns, zero risk-free rate,
/// sample standard deviation.
pub fn compute_sharpe(equity_curve: &[EquityPoint]) -> f64 {
    let returns: Vec<f64> = equity_curve
        .windows(2)
        .filter(|w| w[0].equity > 0.0)
        .map(|w| w[1].equity / w[0].equity - 1.0)
        .collect();

    let Some(stddev) = sample_std(&returns) else {
        return 0.0;
    };
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;

    if stddev > 0.0 {
        mean / stddev * PERIODS_PER_YEAR.sqrt()
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetPerformance {
    pub asset: String,
    pub total_return: f64,
    pub max_drawdown: f64,
}

/// Return and drawdown of each per-asset equity series, measured from its
/// first point.
pub fn asset_performance(history: &EquityHistory) -> Vec<AssetPerformance> {
    history
        .per_asset
        .iter()
        .map(|(asset, curve)| {
            let first = curve.first().map(|p| p.equity).unwrap_or(0.0);
            let last = curve.last().map(|p| p.equity).unwrap_or(0.0);
            let total_return = if first > 0.0 { last / first - 1.0 } else { 0.0 };
            AssetPerformance {
                asset: asset.clone(),
                total_return,
                max_drawdown: compute_drawdown(curve).0,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl Month {
    pub fn of(date: NaiveDate) -> Self {
        Month {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyReturn {
    pub month: Month,
    pub value_return: f64,
}

/// Change between consecutive month-end values. The first month has no
/// prior month-end and is omitted.
pub fn monthly_returns(equity_curve: &[EquityPoint]) -> Vec<MonthlyReturn> {
    let mut month_ends: BTreeMap<Month, f64> = BTreeMap::new();
    for point in equity_curve {
        month_ends.insert(Month::of(point.date), point.equity);
    }

    let ends: Vec<(Month, f64)> = month_ends.into_iter().collect();
    ends.windows(2)
        .map(|w| {
            let (_, prev) = w[0];
            let (month, value) = w[1];
            let value_return = if prev != 0.0 { value / prev - 1.0 } else { 0.0 };
            MonthlyReturn {
                month,
                value_return,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BreakdownPeriod {
    Overall,
    Month(Month),
}

impl fmt::Display for BreakdownPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakdownPeriod::Overall => write!(f, "Overall"),
            BreakdownPeriod::Month(m) => write!(f, "{m}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LongShortRow {
    pub period: BreakdownPeriod,
    pub asset: String,
    pub long_pnl: f64,
    pub short_pnl: f64,
    /// PnL as a fraction of the per-asset base.
    pub long_return: f64,
    pub short_return: f64,
}

/// PnL of every trade record split by side, per asset, for the whole run
/// and for every month that saw a trade. Assets are sorted by name.
pub fn long_short_breakdown(
    trades: &[TradeRecord],
    assets: &[String],
    base_per_asset: f64,
) -> Vec<LongShortRow> {
    let mut sums: BTreeMap<(BreakdownPeriod, &str), (f64, f64)> = BTreeMap::new();
    let mut months = std::collections::BTreeSet::new();

    for trade in trades {
        let month = Month::of(trade.time.date());
        months.insert(month);
        for period in [BreakdownPeriod::Overall, BreakdownPeriod::Month(month)] {
            let entry = sums.entry((period, trade.asset.as_str())).or_insert((0.0, 0.0));
            match trade.side {
                Side::Long => entry.0 += trade.pnl,
                Side::Short => entry.1 += trade.pnl,
            }
        }
    }

    let mut sorted: Vec<&String> = assets.iter().collect();
    sorted.sort();

    let ratio = |pnl: f64| {
        if base_per_asset != 0.0 {
            pnl / base_per_asset
        } else {
            0.0
        }
    };

    let periods = std::iter::once(BreakdownPeriod::Overall)
        .chain(months.into_iter().map(BreakdownPeriod::Month));

    let mut rows = Vec::new();
    for period in periods {
        for asset in &sorted {
            let (long_pnl, short_pnl) = sums
                .get(&(period, asset.as_str()))
                .copied()
                .unwrap_or((0.0, 0.0));
            rows.push(LongShortRow {
                period,
                asset: (*asset).clone(),
                long_pnl,
                short_pnl,
                long_return: ratio(long_pnl),
                short_return: ratio(short_pnl),
            });
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::equity::{EquityAccountant, Valuation};
    use chrono::NaiveDateTime;
    use std::collections::HashMap;

    fn date(day: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(day)
    }

    fn make_equity_curve(values: &[f64]) -> Vec<EquityPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| EquityPoint {
                date: date(i as i64),
                equity: v,
            })
            .collect()
    }

    fn make_history(values: &[f64]) -> EquityHistory {
        let mut history = EquityHistory::new();
        for point in make_equity_curve(values) {
            let valuation = Valuation {
                total: point.equity,
                per_asset: [("A".to_string(), point.equity)].into_iter().collect(),
            };
            history.record(point.date, &valuation, 0.0, 0).unwrap();
        }
        history
    }

    fn time(day: i64) -> NaiveDateTime {
        date(day).and_hms_opt(0, 0, 0).unwrap()
    }

    fn make_trade(asset: &str, action: TradeAction, side: Side, pnl: f64, day: i64) -> TradeRecord {
        TradeRecord {
            time: time(day),
            asset: asset.to_string(),
            period: 20,
            action,
            side,
            amount: 1.0,
            price: 100.0,
            value: 100.0,
            leverage: 1,
            pnl,
        }
    }

    fn round_trip(asset: &str, pnl: f64, open_day: i64, close_day: i64) -> Vec<TradeRecord> {
        vec![
            make_trade(asset, TradeAction::Open, Side::Long, 0.0, open_day),
            make_trade(asset, TradeAction::Close, Side::Long, pnl, close_day),
        ]
    }

    #[test]
    fn metrics_empty_history() {
        let metrics = Metrics::compute(&EquityHistory::new(), &[], 5000.0);
        assert!((metrics.total_return - 0.0).abs() < f64::EPSILON);
        assert!((metrics.final_value - 5000.0).abs() < f64::EPSILON);
        assert_eq!(metrics.trades_won, 0);
        assert_eq!(metrics.total_trades, 0);
    }

    #[test]
    fn total_return_is_against_investment() {
        let metrics = Metrics::compute(&make_history(&[5000.0, 5500.0]), &[], 5000.0);
        assert!((metrics.total_return - 0.10).abs() < 1e-9);

        let metrics = Metrics::compute(&make_history(&[5000.0, 4500.0]), &[], 5000.0);
        assert!((metrics.total_return + 0.10).abs() < 1e-9);
    }

    #[test]
    fn trade_stats_count_closes_only() {
        let mut trades = Vec::new();
        trades.extend(round_trip("A", 100.0, 0, 5));
        trades.extend(round_trip("B", -50.0, 0, 3));
        trades.extend(round_trip("C", 200.0, 0, 10));
        trades.extend(round_trip("D", 0.0, 0, 1));

        let metrics = Metrics::compute(&make_history(&[5000.0, 5250.0]), &trades, 5000.0);
        assert_eq!(metrics.total_trades, 8);
        assert_eq!(metrics.trades_won, 2);
        assert_eq!(metrics.trades_lost, 1);
        assert_eq!(metrics.trades_breakeven, 1);
        assert!((metrics.win_rate - 0.5).abs() < f64::EPSILON);
        assert!((metrics.profit_factor - 6.0).abs() < 1e-9);
        assert!((metrics.avg_win - 150.0).abs() < 1e-9);
        assert!((metrics.avg_loss - 50.0).abs() < 1e-9);
        assert!((metrics.largest_win - 200.0).abs() < 1e-9);
        assert!((metrics.largest_loss - 50.0).abs() < 1e-9);
        assert!((metrics.avg_holding_days - 19.0 / 4.0).abs() < 1e-9);
    }

    #[test]
    fn profit_factor_without_losses_is_infinite() {
        let trades = round_trip("A", 10.0, 0, 1);
        let metrics = Metrics::compute(&make_history(&[1.0, 1.0]), &trades, 1.0);
        assert!(metrics.profit_factor.is_infinite());
    }

    #[test]
    fn max_drawdown_is_positive_fraction() {
        let curve = make_equity_curve(&[100.0, 110.0, 90.0, 95.0, 80.0, 100.0]);
        let (dd, duration) = compute_drawdown(&curve);
        assert!((dd - (110.0 - 80.0) / 110.0).abs() < 1e-9);
        assert_eq!(duration, 4);
    }

    #[test]
    fn sharpe_uses_sample_std_and_365_days() {
        let curve = make_equity_curve(&[100.0, 101.0, 100.0, 102.0]);
        let returns = [0.01, 100.0 / 101.0 - 1.0, 0.02];
        let mean = returns.iter().sum::<f64>() / 3.0;
        let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / 2.0;
        let expected = mean / var.sqrt() * 365.0_f64.sqrt();
        assert!((compute_sharpe(&curve) - expected).abs() < 1e-12);
    }

    #[test]
    fn sharpe_of_flat_curve_is_zero() {
        let curve = make_equity_curve(&[100.0; 10]);
        assert_eq!(compute_sharpe(&curve), 0.0);
    }

    #[test]
    fn monthly_returns_use_month_end_values() {
        let mut curve = make_equity_curve(&[100.0; 31]);
        // Jan 31 = 110
        curve[30].equity = 110.0;
        curve.push(EquityPoint {
            date: NaiveDate::from_ymd_opt(2024, 2, 15).unwrap(),
            equity: 121.0,
        });
        curve.push(EquityPoint {
            date: NaiveDate::from_ymd_opt(2024, 3, 3).unwrap(),
            equity: 108.9,
        });

        let monthly = monthly_returns(&curve);
        assert_eq!(monthly.len(), 2);
        assert_eq!(monthly[0].month.to_string(), "2024-02");
        assert!((monthly[0].value_return - 0.10).abs() < 1e-9);
        assert!((monthly[1].value_return + 0.10).abs() < 1e-9);
    }

    #[test]
    fn asset_performance_from_first_point() {
        let history = make_history(&[100.0, 120.0, 90.0, 110.0]);
        let perf = asset_performance(&history);
        assert_eq!(perf.len(), 1);
        assert!((perf[0].total_return - 0.10).abs() < 1e-9);
        assert!((perf[0].max_drawdown - 0.25).abs() < 1e-9);
    }

    #[test]
    fn long_short_breakdown_splits_by_side_and_month() {
        let trades = vec![
            make_trade("ETH", TradeAction::Close, Side::Long, 100.0, 3),
            make_trade("BTC", TradeAction::Close, Side::Short, -40.0, 40),
            make_trade("BTC", TradeAction::Close, Side::Long, 60.0, 41),
        ];
        let assets = vec!["ETH".to_string(), "BTC".to_string()];
        let rows = long_short_breakdown(&trades, &assets, 1000.0);

        // Overall + Jan + Feb, two assets each
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].period, BreakdownPeriod::Overall);
        assert_eq!(rows[0].asset, "BTC");
        assert!((rows[0].long_pnl - 60.0).abs() < 1e-9);
        assert!((rows[0].short_pnl + 40.0).abs() < 1e-9);
        assert!((rows[0].short_return + 0.04).abs() < 1e-9);
        assert_eq!(rows[2].period.to_string(), "2024-01");
        assert!((rows[3].long_pnl - 100.0).abs() < 1e-9);
        assert_eq!(rows[4].period.to_string(), "2024-02");
        assert_eq!(rows[5].long_pnl, 0.0);
    }

    #[test]
    fn metrics_follow_accountant_history() {
        let acct = EquityAccountant::new(1000.0, vec!["A".to_string()]);
        let ledger = crate::domain::ledger::PositionLedger::new(2000.0, 0.0);
        let mut history = EquityHistory::new();
        for day in 0..3 {
            let v = acct.value_at(&ledger, &HashMap::new());
            history.record(date(day), &v, ledger.cash, 0).unwrap();
        }
        let metrics = Metrics::compute(&history, ledger.trades(), acct.strategy_investment());
        assert!((metrics.final_value - 1000.0).abs() < 1e-9);
        assert_eq!(metrics.max_drawdown, 0.0);
    }
}
