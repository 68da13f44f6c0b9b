//! Live runner: one strategy tick per invocation against an exchange.
//!
//! Positions are restored from the state store, strategy capital is the
//! current account balance times the usage ratio, and every committed
//! transition is persisted before the next order is placed. The exchange's
//! most recent candle is still forming and is dropped before evaluation.

use chrono::NaiveDateTime;
use std::path::PathBuf;
use tracing::{info, warn};

use super::driver::{run_tick, StrategyContext, TickReport};
use super::error::TurtleError;
use super::ledger::PositionLedger;
use super::ohlcv::OhlcvBar;
use super::position::{Fill, OrderIntent, TradeAction, TradeRecord};
use super::strategy::StrategyConfig;
use crate::ports::exchange_port::ExchangePort;
use crate::ports::notify_port::NotifierPort;
use crate::ports::state_port::StatePort;
use crate::ports::trade_log_port::TradeLogPort;
use crate::ports::venue_port::VenuePort;

pub const DAILY_TIMEFRAME: &str = "1d";

/// Message size limit of chat webhooks.
pub const MAX_ALERT_CHARS: usize = 2000;

#[derive(Debug, Clone, PartialEq)]
pub struct LiveConfig {
    pub state_path: PathBuf,
    pub trade_log_path: PathBuf,
    pub lock_path: PathBuf,
    pub webhook_url: Option<String>,
    /// Account balance reported by the paper exchange.
    pub paper_balance: f64,
    /// Candle directory backing the paper exchange.
    pub data_dir: PathBuf,
}

pub struct LiveVenue<'a> {
    exchange: &'a mut dyn ExchangePort,
    state: &'a dyn StatePort,
    trade_log: &'a mut dyn TradeLogPort,
    notifier: &'a dyn NotifierPort,
    now: NaiveDateTime,
}

impl<'a> LiveVenue<'a> {
    pub fn new(
        exchange: &'a mut dyn ExchangePort,
        state: &'a dyn StatePort,
        trade_log: &'a mut dyn TradeLogPort,
        notifier: &'a dyn NotifierPort,
        now: NaiveDateTime,
    ) -> Self {
        LiveVenue {
            exchange,
            state,
            trade_log,
            notifier,
            now,
        }
    }

    pub fn notify(&self, message: &str) {
        if let Err(e) = self.notifier.send(&truncate_alert(message)) {
            warn!(error = %e, "notification failed");
        }
    }
}

impl VenuePort for LiveVenue<'_> {
    fn now(&self) -> NaiveDateTime {
        self.now
    }

    fn candles(&mut self, asset: &str, count: usize) -> Result<Vec<OhlcvBar>, TurtleError> {
        let mut bars = self
            .exchange
            .get_candles(asset, DAILY_TIMEFRAME, count + 1)?;
        bars.pop();
        Ok(bars)
    }

    fn quote(&mut self, asset: &str, _reference: f64) -> Result<f64, TurtleError> {
        self.exchange.get_current_price(asset)
    }

    fn execute(&mut self, order: &OrderIntent) -> Result<Fill, TurtleError> {
        if order.action == TradeAction::Open {
            if let Err(e) = self.exchange.set_leverage(&order.key.asset, order.leverage) {
                warn!(
                    asset = %order.key.asset,
                    leverage = order.leverage,
                    error = %e,
                    "could not set leverage"
                );
            }
        }
        info!(
            key = %order.key,
            action = %order.action,
            side = %order.side,
            amount = order.amount,
            buy = order.is_buy(),
            "placing market order"
        );
        self.exchange.place_market_order(order)
    }

    fn committed(&mut self, ledger: &PositionLedger, trade: &TradeRecord) -> Result<(), TurtleError> {
        self.state.save(&ledger.to_state())?;
        if let Err(e) = self.trade_log.append(trade) {
            warn!(error = %e, "could not append trade log");
        }
        self.notify(&format_trade_alert(trade));
        Ok(())
    }

    fn mark(&mut self, asset: &str) -> Option<f64> {
        match self.exchange.get_current_price(asset) {
            Ok(price) if price > 0.0 => Some(price),
            Ok(_) => None,
            Err(e) => {
                warn!(%asset, error = %e, "no mark price");
                None
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct LiveTickOutcome {
    pub balance: f64,
    pub strategy_capital: f64,
    pub report: TickReport,
    pub ledger: PositionLedger,
}

/// Restore state, size from the live balance and run one tick.
pub fn run_live_tick(
    config: &StrategyConfig,
    venue: &mut LiveVenue<'_>,
) -> Result<LiveTickOutcome, TurtleError> {
    let balance = venue.exchange.get_account_balance()?;
    if balance <= 0.0 || !balance.is_finite() {
        return Err(TurtleError::Exchange {
            reason: format!("cannot trade with account balance {balance}"),
        });
    }
    let strategy_capital = balance * config.usage_ratio;

    let mut ledger = PositionLedger::new(balance, config.fee_rate);
    ledger.restore(venue.state.load()?)?;
    info!(
        balance,
        strategy_capital,
        open_positions = ledger.open_count(),
        "live tick started"
    );

    let mut ctx = StrategyContext::new(config.clone(), ledger, strategy_capital);
    let report = run_tick(&mut ctx, venue, strategy_capital)?;

    info!(
        trades = report.trades.len(),
        skipped = report.skipped.len(),
        equity = report.valuation.total,
        "live tick finished"
    );

    Ok(LiveTickOutcome {
        balance,
        strategy_capital,
        report,
        ledger: ctx.ledger,
    })
}

pub fn format_trade_alert(trade: &TradeRecord) -> String {
    match trade.action {
        TradeAction::Open => format!(
            "OPEN {} | {} ({}d) | Size: {:.4} | Price: ${:.2} | Leverage: {}x",
            trade.side, trade.asset, trade.period, trade.amount, trade.price, trade.leverage
        ),
        TradeAction::Close => format!(
            "CLOSE {} | {} ({}d) | Price: ${:.2} | PNL: {}${:.2}",
            trade.side,
            trade.asset,
            trade.period,
            trade.price,
            if trade.pnl < 0.0 { "-" } else { "" },
            trade.pnl.abs()
        ),
    }
}

pub fn format_error_alert(err: &TurtleError) -> String {
    format!("turtletrader live run failed: {err}")
}

pub fn format_tick_summary(outcome: &LiveTickOutcome) -> String {
    format!(
        "Tick {} | Balance: ${:.2} | Strategy capital: ${:.2} | Trades: {} | Open positions: {}",
        outcome.report.date,
        outcome.balance,
        outcome.strategy_capital,
        outcome.report.trades.len(),
        outcome.ledger.open_count()
    )
}

/// Cut `message` to the webhook limit on a char boundary.
pub fn truncate_alert(message: &str) -> String {
    if message.chars().count() <= MAX_ALERT_CHARS {
        return message.to_string();
    }
    let mut out: String = message.chars().take(MAX_ALERT_CHARS - 3).collect();
    out.push_str("...");
    out
}
