//! CSV outputs: the append-only trade log and the backtest CSV reports.
//!
//! Reports written into the output directory:
//! - `trades.csv`      every trade record
//! - `portfolio.csv`   one row per equity snapshot
//! - `long_short.csv`  PnL by side per asset, overall and per month

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use crate::domain::backtest::BacktestResult;
use crate::domain::error::TurtleError;
use crate::domain::metrics::long_short_breakdown;
use crate::domain::position::TradeRecord;
use crate::ports::report_port::ReportPort;
use crate::ports::trade_log_port::TradeLogPort;

pub const TRADE_LOG_HEADER: [&str; 10] = [
    "Timestamp",
    "Ticker",
    "Donchian Period",
    "Action",
    "Side",
    "Amount",
    "Price",
    "Value",
    "Leverage",
    "PNL",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn csv_error(path: &Path, e: impl std::fmt::Display) -> TurtleError {
    TurtleError::Data {
        reason: format!("failed to write {}: {e}", path.display()),
    }
}

fn trade_row(trade: &TradeRecord) -> Vec<String> {
    vec![
        trade.time.format(TIMESTAMP_FORMAT).to_string(),
        trade.asset.clone(),
        trade.period.to_string(),
        trade.action.to_string(),
        trade.side.to_string(),
        trade.amount.to_string(),
        trade.price.to_string(),
        trade.value.to_string(),
        trade.leverage.to_string(),
        trade.pnl.to_string(),
    ]
}

/// Appends trade rows to a CSV file, writing the header when the file is
/// new or empty.
pub struct CsvTradeLog {
    path: PathBuf,
}

impl CsvTradeLog {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, TurtleError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let needs_header = fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);
        if needs_header {
            let mut wtr = csv::Writer::from_path(&path).map_err(|e| csv_error(&path, e))?;
            wtr.write_record(TRADE_LOG_HEADER)
                .map_err(|e| csv_error(&path, e))?;
            wtr.flush()?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TradeLogPort for CsvTradeLog {
    fn append(&mut self, trade: &TradeRecord) -> Result<(), TurtleError> {
        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        wtr.write_record(trade_row(trade))
            .map_err(|e| csv_error(&self.path, e))?;
        wtr.flush()?;
        Ok(())
    }
}

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    fn write_trades(result: &BacktestResult, path: &Path) -> Result<(), TurtleError> {
        let mut wtr = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
        wtr.write_record(TRADE_LOG_HEADER)
            .map_err(|e| csv_error(path, e))?;
        for trade in &result.trades {
            wtr.write_record(trade_row(trade))
                .map_err(|e| csv_error(path, e))?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_portfolio(result: &BacktestResult, path: &Path) -> Result<(), TurtleError> {
        let mut wtr = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
        wtr.write_record(["date", "value", "cash", "positions_count"])
            .map_err(|e| csv_error(path, e))?;
        for snap in &result.history.snapshots {
            wtr.write_record([
                snap.date.to_string(),
                format!("{:.2}", snap.total_value),
                format!("{:.2}", snap.cash),
                snap.open_positions.to_string(),
            ])
            .map_err(|e| csv_error(path, e))?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_long_short(result: &BacktestResult, path: &Path) -> Result<(), TurtleError> {
        let assets = result.strategy.asset_names();
        let base = if assets.is_empty() {
            0.0
        } else {
            result.strategy_investment / assets.len() as f64
        };
        let rows = long_short_breakdown(&result.trades, &assets, base);

        let mut wtr = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
        wtr.write_record([
            "period",
            "coin",
            "long_pnl",
            "short_pnl",
            "long_return_%",
            "short_return_%",
        ])
        .map_err(|e| csv_error(path, e))?;
        for row in rows {
            wtr.write_record([
                row.period.to_string(),
                row.asset,
                format!("{:.2}", row.long_pnl),
                format!("{:.2}", row.short_pnl),
                format!("{:.2}", row.long_return * 100.0),
                format!("{:.2}", row.short_return * 100.0),
            ])
            .map_err(|e| csv_error(path, e))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &BacktestResult, output_dir: &Path) -> Result<(), TurtleError> {
        fs::create_dir_all(output_dir)?;
        Self::write_trades(result, &output_dir.join("trades.csv"))?;
        Self::write_portfolio(result, &output_dir.join("portfolio.csv"))?;
        Self::write_long_short(result, &output_dir.join("long_short.csv"))?;
        Ok(())
    }
}
