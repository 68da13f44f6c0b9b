//! CLI definition and dispatch.

use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::{CsvReportAdapter, CsvTradeLog};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::file_lock::FileLock;
use crate::adapters::json_state_adapter::JsonStateAdapter;
use crate::adapters::log_notifier::LogNotifier;
use crate::adapters::paper_exchange::PaperExchange;
use crate::adapters::text_report_adapter::TextReportAdapter;
#[cfg(feature = "webhook")]
use crate::adapters::webhook_notifier::WebhookNotifier;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, BacktestResult};
use crate::domain::config_validation::{
    asset_section, parse_date, validate_backtest_config, validate_live_config,
    validate_strategy_config,
};
use crate::domain::error::TurtleError;
use crate::domain::live::{
    format_error_alert, format_tick_summary, run_live_tick, LiveConfig, LiveVenue,
};
use crate::domain::metrics::Metrics;
use crate::domain::strategy::{AssetConfig, AssetSettings, StrategyConfig, DEFAULT_PERIODS};
use crate::domain::universe::{load_universe, parse_assets, parse_periods};
use crate::ports::config_port::ConfigPort;
use crate::ports::notify_port::NotifierPort;
use crate::ports::report_port::ReportPort;
use crate::ports::state_port::StatePort;

#[derive(Parser, Debug)]
#[command(name = "turtletrader", about = "Donchian breakout trading engine")]
pub struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay the strategy over historical candles
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Run one live tick against the paper exchange
    Live {
        #[arg(short, long)]
        config: PathBuf,
        /// Treat this date as today (YYYY-MM-DD)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show persisted live positions
    Positions {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest { config, output_dir } => run_backtest(&config, output_dir.as_ref()),
        Command::Live { config, as_of } => run_live(&config, as_of),
        Command::Validate { config } => run_validate(&config),
        Command::Positions { config } => run_positions(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = TurtleError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn fail(err: &TurtleError) -> ExitCode {
    error!(error = %err, "run failed");
    eprintln!("error: {err}");
    err.into()
}

/// Strategy parameters plus the active asset list with per-asset overrides.
pub fn build_strategy_config(adapter: &dyn ConfigPort) -> Result<StrategyConfig, TurtleError> {
    let defaults = StrategyConfig::default();

    let periods = match adapter.get_string("strategy", "donchian_periods") {
        Some(raw) if !raw.trim().is_empty() => parse_periods(&raw).map_err(|e| {
            TurtleError::config_invalid("strategy", "donchian_periods", e.to_string())
        })?,
        _ => DEFAULT_PERIODS.to_vec(),
    };

    let coins = match adapter.get_string("assets", "coins") {
        Some(raw) if !raw.trim().is_empty() => parse_assets(&raw)
            .map_err(|e| TurtleError::config_invalid("assets", "coins", e.to_string()))?,
        _ => return Err(TurtleError::config_missing("assets", "coins")),
    };

    let base = read_asset_settings(adapter, "assets", AssetSettings::default());
    let mut assets = Vec::with_capacity(coins.len());
    for asset in coins {
        let section = asset_section(&asset);
        if !adapter.get_bool(&section, "active", true) {
            info!(%asset, "asset disabled in config");
            continue;
        }
        let settings = read_asset_settings(adapter, &section, base);
        assets.push(AssetConfig { asset, settings });
    }
    if assets.is_empty() {
        return Err(TurtleError::config_invalid(
            "assets",
            "coins",
            "every configured asset is inactive",
        ));
    }

    Ok(StrategyConfig {
        periods,
        volatility_period: adapter.get_int(
            "strategy",
            "volatility_period",
            defaults.volatility_period as i64,
        ) as usize,
        volatility_target: adapter.get_double(
            "strategy",
            "volatility_target",
            defaults.volatility_target,
        ),
        usage_ratio: adapter.get_double(
            "strategy",
            "total_account_usage_ratio",
            defaults.usage_ratio,
        ),
        fee_rate: adapter.get_double("strategy", "fee_rate", defaults.fee_rate),
        assets,
    })
}

fn read_asset_settings(
    adapter: &dyn ConfigPort,
    section: &str,
    base: AssetSettings,
) -> AssetSettings {
    let leverage = |key: &str, fallback: u32| -> u32 {
        let value = adapter.get_int(section, key, fallback as i64);
        u32::try_from(value.max(1)).unwrap_or(fallback)
    };
    AssetSettings {
        long_only: adapter.get_bool(section, "long_only", base.long_only),
        long_leverage: leverage("long_leverage", base.long_leverage),
        short_leverage: leverage("short_leverage", base.short_leverage),
    }
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, TurtleError> {
    let start_date = parse_date(adapter, "start_date")?;
    let end_date = parse_date(adapter, "end_date")?;
    let initial_capital = adapter.get_double("backtest", "initial_capital", 0.0);
    Ok(BacktestConfig {
        start_date,
        end_date,
        initial_capital,
    })
}

pub fn build_live_config(adapter: &dyn ConfigPort) -> LiveConfig {
    let path = |key: &str, default: &str| {
        PathBuf::from(
            adapter
                .get_string("live", key)
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| default.to_string()),
        )
    };
    LiveConfig {
        state_path: path("state_path", "turtle_positions.json"),
        trade_log_path: path("trade_log_path", "turtle_trades.csv"),
        lock_path: path("lock_path", "turtle.lock"),
        webhook_url: adapter
            .get_string("live", "webhook_url")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        paper_balance: adapter.get_double("live", "paper_balance", 0.0),
        data_dir: path("data_dir", "data"),
    }
}

fn backtest_dir(adapter: &dyn ConfigPort, key: &str, default: &str) -> PathBuf {
    PathBuf::from(
        adapter
            .get_string("backtest", key)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| default.to_string()),
    )
}

fn run_backtest(config_path: &PathBuf, output_override: Option<&PathBuf>) -> ExitCode {
    // Stage 1: Load config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    // Stage 2: Validate
    if let Err(e) = validate_strategy_config(&adapter).and_then(|()| validate_backtest_config(&adapter))
    {
        return fail(&e);
    }

    // Stage 3: Build configs
    let mut strategy = match build_strategy_config(&adapter) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let data_dir = backtest_dir(&adapter, "data_dir", "data");
    let output_dir = output_override
        .cloned()
        .unwrap_or_else(|| backtest_dir(&adapter, "output_dir", "results"));

    // Stage 4: Load candles; warm-up needs history before start_date
    let data = CsvAdapter::new(data_dir);
    let universe = match load_universe(
        &data,
        &strategy.asset_names(),
        NaiveDate::MIN,
        bt_config.end_date,
    ) {
        Ok(u) => u,
        Err(e) => return fail(&e),
    };
    for skipped in &universe.skipped {
        eprintln!("warning: skipping {} ({:?})", skipped.asset, skipped.reason);
    }
    let loaded = universe.loaded_assets(&strategy.asset_names());
    strategy.retain_assets(&loaded);

    // Stage 5: Run
    eprintln!(
        "Running backtest: {} assets x {} periods, {} to {}",
        strategy.asset_count(),
        strategy.periods.len(),
        bt_config.start_date,
        bt_config.end_date,
    );
    let result = match backtest_engine::run_backtest(&universe.series, &strategy, &bt_config) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    // Stage 6: Console summary
    print_backtest_summary(&result);

    // Stage 7: Reports
    let reporters: [&dyn ReportPort; 2] = [&CsvReportAdapter, &TextReportAdapter];
    for reporter in reporters {
        if let Err(e) = reporter.write(&result, &output_dir) {
            return fail(&e);
        }
    }
    eprintln!("\nReports written to: {}", output_dir.display());
    ExitCode::SUCCESS
}

fn print_backtest_summary(result: &BacktestResult) {
    let metrics = Metrics::compute(&result.history, &result.trades, result.strategy_investment);
    eprintln!(
        "\n=== Results ({} to {}) ===",
        result.config.start_date, result.config.end_date
    );
    eprintln!("Strategy Investment: ${:.2}", result.strategy_investment);
    eprintln!("Final Value:         ${:.2}", metrics.final_value);
    eprintln!("Total Return:        {:.2}%", metrics.total_return * 100.0);
    eprintln!("Sharpe Ratio:        {:.2}", metrics.sharpe_ratio);
    eprintln!("Max Drawdown:        -{:.1}%", metrics.max_drawdown * 100.0);
    eprintln!("Total Trades:        {}", metrics.total_trades);
    eprintln!("Win Rate:            {:.1}%", metrics.win_rate * 100.0);
    eprintln!("Profit Factor:       {:.2}", metrics.profit_factor);
    eprintln!("Open Positions:      {}", result.open_positions.len());
}

#[cfg(feature = "webhook")]
fn build_notifier(config: &LiveConfig) -> Box<dyn NotifierPort> {
    match config.webhook_url.as_deref().and_then(WebhookNotifier::new) {
        Some(notifier) => Box::new(notifier),
        None => Box::new(LogNotifier),
    }
}

#[cfg(not(feature = "webhook"))]
fn build_notifier(config: &LiveConfig) -> Box<dyn NotifierPort> {
    if config.webhook_url.is_some() {
        warn!("webhook_url is set but webhook support is not compiled in; alerts go to the log");
    }
    Box::new(LogNotifier)
}

fn run_live(config_path: &PathBuf, as_of: Option<NaiveDate>) -> ExitCode {
    // Stage 1: Load and validate config
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_strategy_config(&adapter).and_then(|()| validate_live_config(&adapter))
    {
        return fail(&e);
    }
    let strategy = match build_strategy_config(&adapter) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let live = build_live_config(&adapter);

    // Stage 2: One run at a time
    let _lock = match FileLock::acquire(&live.lock_path) {
        Ok(lock) => lock,
        Err(e) => return fail(&e),
    };

    // Stage 3: Wire collaborators
    let now: NaiveDateTime = match as_of {
        Some(date) => date.and_time(chrono::NaiveTime::MIN),
        None => Local::now().naive_local(),
    };
    let notifier = build_notifier(&live);
    let mut exchange = PaperExchange::new(
        CsvAdapter::new(live.data_dir.clone()),
        live.paper_balance,
        now.date(),
    );
    let state = JsonStateAdapter::new(live.state_path.clone());
    let mut trade_log = match CsvTradeLog::open(live.trade_log_path.clone()) {
        Ok(log) => log,
        Err(e) => return alert_and_fail(notifier.as_ref(), &e),
    };

    // Stage 4: Tick
    let mut venue = LiveVenue::new(
        &mut exchange,
        &state,
        &mut trade_log,
        notifier.as_ref(),
        now,
    );
    match run_live_tick(&strategy, &mut venue) {
        Ok(outcome) => {
            let summary = format_tick_summary(&outcome);
            info!("{summary}");
            eprintln!("{summary}");
            for skipped in &outcome.report.skipped {
                eprintln!(
                    "  skipped {}{}: {}",
                    skipped.asset,
                    skipped.period.map(|p| format!(" ({p}d)")).unwrap_or_default(),
                    skipped.reason
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => alert_and_fail(notifier.as_ref(), &e),
    }
}

fn alert_and_fail(notifier: &dyn NotifierPort, err: &TurtleError) -> ExitCode {
    if let Err(send_err) = notifier.send(&format_error_alert(err)) {
        warn!(error = %send_err, "failed to send error alert");
    }
    fail(err)
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_strategy_config(&adapter) {
        return fail(&e);
    }
    let strategy = match build_strategy_config(&adapter) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    eprintln!("\nStrategy:");
    let periods: Vec<String> = strategy.periods.iter().map(|p| p.to_string()).collect();
    eprintln!("  Donchian periods:  {}", periods.join(", "));
    eprintln!(
        "  Volatility:        {} days, target {:.2}",
        strategy.volatility_period, strategy.volatility_target
    );
    eprintln!("  Usage ratio:       {:.2}", strategy.usage_ratio);
    eprintln!("  Fee rate:          {}", strategy.fee_rate);
    eprintln!("\nAssets:");
    for asset in &strategy.assets {
        eprintln!(
            "  {}: long {}x, short {}{}",
            asset.asset,
            asset.settings.long_leverage,
            asset.settings.short_leverage,
            if asset.settings.long_only {
                "x (long only)"
            } else {
                "x"
            }
        );
    }

    if adapter.has_key("backtest", "start_date") || adapter.has_key("backtest", "end_date") {
        if let Err(e) = validate_backtest_config(&adapter) {
            return fail(&e);
        }
        eprintln!("\nBacktest section is valid.");
    }
    if let Err(e) = validate_live_config(&adapter) {
        return fail(&e);
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_positions(config_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let live = build_live_config(&adapter);
    print_positions(&live.state_path)
}

fn print_positions(state_path: &Path) -> ExitCode {
    let state = match JsonStateAdapter::new(state_path).load() {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    if state.is_empty() {
        println!("No open positions ({})", state_path.display());
        return ExitCode::SUCCESS;
    }
    println!(
        "{:<20} {:<6} {:>14} {:>14} {:>4}  Entry time",
        "Slot", "Side", "Amount", "Entry price", "Lev"
    );
    for (key, position) in &state {
        println!(
            "{:<20} {:<6} {:>14.6} {:>14.4} {:>3}x  {}",
            key,
            position.side.to_string(),
            position.amount,
            position.entry_price,
            position.leverage,
            position.entry_time.format("%Y-%m-%d %H:%M:%S")
        );
    }
    ExitCode::SUCCESS
}
