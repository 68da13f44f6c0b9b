#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use turtletrader::domain::error::TurtleError;
use turtletrader::domain::ledger::LedgerState;
pub use turtletrader::domain::ohlcv::OhlcvBar;
use turtletrader::domain::position::{Fill, OrderIntent, TradeRecord};
use turtletrader::domain::strategy::{AssetConfig, AssetSettings, StrategyConfig};
use turtletrader::ports::data_port::DataPort;
use turtletrader::ports::exchange_port::ExchangePort;
use turtletrader::ports::notify_port::NotifierPort;
use turtletrader::ports::state_port::StatePort;
use turtletrader::ports::trade_log_port::TradeLogPort;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn midnight(d: NaiveDate) -> NaiveDateTime {
    d.and_hms_opt(0, 0, 0).unwrap()
}

/// Bar whose high, low and close all equal `close`.
pub fn flat_bar(d: NaiveDate, close: f64) -> OhlcvBar {
    OhlcvBar {
        date: d,
        open: close,
        high: close,
        low: close,
        close,
        volume: 1.0,
    }
}

/// Consecutive daily flat bars starting at `start`.
pub fn series(start: NaiveDate, closes: &[f64]) -> Vec<OhlcvBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| flat_bar(start + Duration::days(i as i64), c))
        .collect()
}

/// Deterministic zig-zag: a drift per day plus an alternating wiggle so
/// volatility never collapses to zero.
pub fn zigzag(start_price: f64, days: usize, drift: f64, wiggle: f64) -> Vec<f64> {
    (0..days)
        .map(|i| {
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            start_price * (1.0 + drift * i as f64) + sign * wiggle
        })
        .collect()
}

/// Rise, then fall: enough movement to trigger entries and exits.
pub fn rise_and_fall(start_price: f64, half: usize) -> Vec<f64> {
    let mut closes = zigzag(start_price, half, 0.01, start_price * 0.004);
    let peak = *closes.last().unwrap();
    closes.extend(zigzag(peak, half, -0.008, start_price * 0.004).into_iter().skip(1));
    closes
}

pub fn strategy(assets: &[&str], periods: &[usize], volatility_period: usize) -> StrategyConfig {
    StrategyConfig {
        periods: periods.to_vec(),
        volatility_period,
        volatility_target: 0.25,
        usage_ratio: 0.5,
        fee_rate: 0.0,
        assets: assets
            .iter()
            .map(|a| AssetConfig {
                asset: a.to_string(),
                settings: AssetSettings::default(),
            })
            .collect(),
    }
}

pub fn with_leverage(mut config: StrategyConfig, long: u32, short: u32) -> StrategyConfig {
    for asset in &mut config.assets {
        asset.settings.long_leverage = long;
        asset.settings.short_leverage = short;
    }
    config
}

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, asset: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(asset.to_string(), bars);
        self
    }

    pub fn with_error(mut self, asset: &str, reason: &str) -> Self {
        self.errors.insert(asset.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        asset: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, TurtleError> {
        if let Some(reason) = self.errors.get(asset) {
            return Err(TurtleError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(asset)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Scriptable exchange. The last candle of each series plays the part of
/// the in-progress bar.
pub struct MockExchange {
    pub candles: HashMap<String, Vec<OhlcvBar>>,
    pub prices: HashMap<String, f64>,
    pub balance: f64,
    pub fail_orders: bool,
    pub fail_leverage: bool,
    pub fail_candles: bool,
    pub orders: Vec<OrderIntent>,
    pub leverage_calls: Vec<(String, u32)>,
    pub candle_requests: RefCell<Vec<(String, String, usize)>>,
}

impl MockExchange {
    pub fn new(balance: f64) -> Self {
        Self {
            candles: HashMap::new(),
            prices: HashMap::new(),
            balance,
            fail_orders: false,
            fail_leverage: false,
            fail_candles: false,
            orders: Vec::new(),
            leverage_calls: Vec::new(),
            candle_requests: RefCell::new(Vec::new()),
        }
    }

    pub fn with_candles(mut self, asset: &str, bars: Vec<OhlcvBar>) -> Self {
        self.candles.insert(asset.to_string(), bars);
        self
    }

    pub fn with_price(mut self, asset: &str, price: f64) -> Self {
        self.prices.insert(asset.to_string(), price);
        self
    }
}

impl ExchangePort for MockExchange {
    fn get_candles(
        &self,
        asset: &str,
        timeframe: &str,
        count: usize,
    ) -> Result<Vec<OhlcvBar>, TurtleError> {
        self.candle_requests
            .borrow_mut()
            .push((asset.to_string(), timeframe.to_string(), count));
        if self.fail_candles {
            return Err(TurtleError::Exchange {
                reason: "candles unavailable".to_string(),
            });
        }
        let bars = self.candles.get(asset).cloned().unwrap_or_default();
        let start = bars.len().saturating_sub(count);
        Ok(bars[start..].to_vec())
    }

    fn get_current_price(&self, asset: &str) -> Result<f64, TurtleError> {
        Ok(self.prices.get(asset).copied().unwrap_or(0.0))
    }

    fn get_account_balance(&self) -> Result<f64, TurtleError> {
        Ok(self.balance)
    }

    fn set_leverage(&mut self, asset: &str, leverage: u32) -> Result<(), TurtleError> {
        if self.fail_leverage {
            return Err(TurtleError::Exchange {
                reason: "leverage rejected".to_string(),
            });
        }
        self.leverage_calls.push((asset.to_string(), leverage));
        Ok(())
    }

    fn place_market_order(&mut self, order: &OrderIntent) -> Result<Fill, TurtleError> {
        if self.fail_orders {
            return Err(TurtleError::Exchange {
                reason: "order rejected".to_string(),
            });
        }
        let price = self.get_current_price(&order.key.asset)?;
        self.orders.push(order.clone());
        Ok(Fill {
            amount: order.amount,
            price,
        })
    }
}

#[derive(Default)]
pub struct MemoryState {
    pub state: RefCell<LedgerState>,
    pub saves: Cell<usize>,
    pub fail_save: bool,
}

impl MemoryState {
    pub fn with_state(state: LedgerState) -> Self {
        Self {
            state: RefCell::new(state),
            ..Self::default()
        }
    }
}

impl StatePort for MemoryState {
    fn load(&self) -> Result<LedgerState, TurtleError> {
        Ok(self.state.borrow().clone())
    }

    fn save(&self, state: &LedgerState) -> Result<(), TurtleError> {
        if self.fail_save {
            return Err(TurtleError::State {
                reason: "disk full".to_string(),
            });
        }
        *self.state.borrow_mut() = state.clone();
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryTradeLog {
    pub rows: Vec<TradeRecord>,
    pub fail: bool,
}

impl TradeLogPort for MemoryTradeLog {
    fn append(&mut self, trade: &TradeRecord) -> Result<(), TurtleError> {
        if self.fail {
            return Err(TurtleError::Io(std::io::Error::other("read-only")));
        }
        self.rows.push(trade.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: RefCell<Vec<String>>,
    pub fail: bool,
}

impl NotifierPort for RecordingNotifier {
    fn send(&self, message: &str) -> Result<(), TurtleError> {
        if self.fail {
            return Err(TurtleError::Notify {
                reason: "webhook down".to_string(),
            });
        }
        self.messages.borrow_mut().push(message.to_string());
        Ok(())
    }
}
