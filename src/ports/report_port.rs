//! Backtest report generation port.

use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::TurtleError;

/// Port for writing backtest reports into an output directory.
pub trait ReportPort {
    fn write(&self, result: &BacktestResult, output_dir: &Path) -> Result<(), TurtleError>;
}
