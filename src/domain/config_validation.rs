//! Configuration validation.
//!
//! Validates all config fields before a backtest or live run.

use crate::domain::error::TurtleError;
use crate::domain::universe::{parse_assets, parse_periods};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

/// Section holding per-asset overrides for `asset`.
pub fn asset_section(asset: &str) -> String {
    format!("asset {asset}")
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    validate_periods(config)?;
    validate_volatility(config)?;
    validate_usage_ratio(config)?;
    validate_fee_rate(config)?;
    validate_assets(config)?;
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    validate_initial_capital(config)?;
    validate_dates(config)?;
    Ok(())
}

pub fn validate_live_config(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    let balance = config.get_double("live", "paper_balance", 0.0);
    if balance < 0.0 {
        return Err(TurtleError::config_invalid(
            "live",
            "paper_balance",
            "paper_balance must be non-negative",
        ));
    }
    if let Some(url) = config.get_string("live", "webhook_url") {
        let url = url.trim();
        if !url.is_empty() && !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(TurtleError::config_invalid(
                "live",
                "webhook_url",
                "webhook_url must be an http(s) URL",
            ));
        }
    }
    Ok(())
}

fn validate_periods(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    if let Some(raw) = config.get_string("strategy", "donchian_periods") {
        parse_periods(&raw)
            .map_err(|e| TurtleError::config_invalid("strategy", "donchian_periods", e.to_string()))?;
    }
    Ok(())
}

/// A present key that does not parse reads as `i64::MIN` so range checks
/// reject it instead of falling back to the default.
fn strategy_int(config: &dyn ConfigPort, key: &str, default: i64) -> i64 {
    if config.has_key("strategy", key) {
        config.get_int("strategy", key, i64::MIN)
    } else {
        default
    }
}

/// A present key that does not parse reads as NaN.
fn strategy_double(config: &dyn ConfigPort, key: &str, default: f64) -> f64 {
    if config.has_key("strategy", key) {
        config.get_double("strategy", key, f64::NAN)
    } else {
        default
    }
}

fn validate_volatility(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    let period = strategy_int(config, "volatility_period", 90);
    if period < 2 {
        return Err(TurtleError::config_invalid(
            "strategy",
            "volatility_period",
            "volatility_period must be an integer of at least 2",
        ));
    }
    let target = strategy_double(config, "volatility_target", 0.25);
    if !target.is_finite() || target <= 0.0 {
        return Err(TurtleError::config_invalid(
            "strategy",
            "volatility_target",
            "volatility_target must be positive",
        ));
    }
    Ok(())
}

fn validate_usage_ratio(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    let value = strategy_double(config, "total_account_usage_ratio", 0.5);
    if !value.is_finite() || value <= 0.0 || value > 1.0 {
        return Err(TurtleError::config_invalid(
            "strategy",
            "total_account_usage_ratio",
            "total_account_usage_ratio must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_fee_rate(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    let value = strategy_double(config, "fee_rate", 0.0);
    if !(0.0..1.0).contains(&value) {
        return Err(TurtleError::config_invalid(
            "strategy",
            "fee_rate",
            "fee_rate must be in [0, 1)",
        ));
    }
    Ok(())
}

fn validate_assets(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    let assets = match config.get_string("assets", "coins") {
        Some(s) if !s.trim().is_empty() => {
            parse_assets(&s).map_err(|e| TurtleError::config_invalid("assets", "coins", e.to_string()))?
        }
        _ => return Err(TurtleError::config_missing("assets", "coins")),
    };

    validate_leverage(config, "assets")?;
    for asset in &assets {
        let section = asset_section(asset);
        validate_leverage(config, &section)?;
    }
    Ok(())
}

fn validate_leverage(config: &dyn ConfigPort, section: &str) -> Result<(), TurtleError> {
    for key in ["long_leverage", "short_leverage"] {
        if config.has_key(section, key) && config.get_int(section, key, 0) < 1 {
            return Err(TurtleError::config_invalid(
                section,
                key,
                format!("{key} must be an integer of at least 1"),
            ));
        }
    }
    Ok(())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    let value = config.get_double("backtest", "initial_capital", 0.0);
    if value <= 0.0 {
        return Err(TurtleError::config_invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    let start_date = parse_date(config, "start_date")?;
    let end_date = parse_date(config, "end_date")?;

    if start_date >= end_date {
        return Err(TurtleError::config_invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok(())
}

pub fn parse_date(config: &dyn ConfigPort, field: &str) -> Result<NaiveDate, TurtleError> {
    match config.get_string("backtest", field) {
        None => Err(TurtleError::config_missing("backtest", field)),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            TurtleError::config_invalid(
                "backtest",
                field,
                format!("invalid {field} format, expected YYYY-MM-DD"),
            )
        }),
    }
}
