//! Plain-text backtest summary (`summary.txt`).

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::TurtleError;
use crate::domain::metrics::{asset_performance, monthly_returns, Metrics};
use crate::ports::report_port::ReportPort;

pub struct TextReportAdapter;

pub fn render_summary(result: &BacktestResult) -> String {
    let metrics = Metrics::compute(&result.history, &result.trades, result.strategy_investment);
    let mut out = String::new();

    let _ = writeln!(out, "--- Turtle Strategy Backtest Summary ---");
    let _ = writeln!(
        out,
        "Period: {} to {}",
        result.config.start_date, result.config.end_date
    );
    let periods: Vec<String> = result.strategy.periods.iter().map(|p| p.to_string()).collect();
    let _ = writeln!(out, "Donchian periods: {}", periods.join(", "));
    let _ = writeln!(out);
    let _ = writeln!(out, "Initial Capital: ${:.2}", result.config.initial_capital);
    let _ = writeln!(out, "Strategy Investment: ${:.2}", result.strategy_investment);
    let _ = writeln!(out, "Final Portfolio Value: ${:.2}", metrics.final_value);
    let _ = writeln!(out, "Final Cash: ${:.2}", result.final_cash);
    let _ = writeln!(out);
    let _ = writeln!(out, "Total Return: {:.2}%", metrics.total_return * 100.0);
    let _ = writeln!(out, "Max Drawdown: {:.2}%", metrics.max_drawdown * 100.0);
    let _ = writeln!(out, "Sharpe Ratio: {:.2}", metrics.sharpe_ratio);
    let _ = writeln!(out, "Total Trades: {}", metrics.total_trades);
    let _ = writeln!(
        out,
        "Closed Trades: {} (won {}, lost {}, win rate {:.1}%)",
        metrics.trades_won + metrics.trades_lost + metrics.trades_breakeven,
        metrics.trades_won,
        metrics.trades_lost,
        metrics.win_rate * 100.0
    );
    let _ = writeln!(out, "Profit Factor: {:.2}", metrics.profit_factor);
    let _ = writeln!(out, "Open Positions: {}", result.open_positions.len());

    let _ = writeln!(out, "\n\n--- Performance by Coin ---");
    for perf in asset_performance(&result.history) {
        let _ = writeln!(out, "\n[{}]", perf.asset);
        let _ = writeln!(out, "  Total Return: {:.2}%", perf.total_return * 100.0);
        let _ = writeln!(out, "  Max Drawdown: {:.2}%", perf.max_drawdown * 100.0);
    }

    let _ = writeln!(out, "\n\n--- Monthly Returns ---");
    let _ = writeln!(out, "\n** Total Portfolio **");
    write_monthly(&mut out, &monthly_returns(&result.history.curve()));
    for (asset, curve) in &result.history.per_asset {
        let _ = writeln!(out, "\n** {asset} **");
        write_monthly(&mut out, &monthly_returns(curve));
    }

    out
}

fn write_monthly(out: &mut String, rows: &[crate::domain::metrics::MonthlyReturn]) {
    if rows.is_empty() {
        let _ = writeln!(out, "  Not enough data to calculate monthly returns.");
        return;
    }
    for row in rows {
        let _ = writeln!(out, "  {}: {:.2}%", row.month, row.value_return * 100.0);
    }
}

impl ReportPort for TextReportAdapter {
    fn write(&self, result: &BacktestResult, output_dir: &Path) -> Result<(), TurtleError> {
        fs::create_dir_all(output_dir)?;
        fs::write(output_dir.join("summary.txt"), render_summary(result))?;
        Ok(())
    }
}
