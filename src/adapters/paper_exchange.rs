//! Paper-trading exchange over CSV candles.
//!
//! Candles are served up to and including `as_of`, the bar dated `as_of`
//! playing the part of the still-forming candle. Market orders fill in full
//! at that bar's close. The account balance is a fixed configured amount.

use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::debug;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::domain::error::TurtleError;
use crate::domain::ohlcv::{tail, window_until, OhlcvBar};
use crate::domain::position::{Fill, OrderIntent};
use crate::ports::data_port::DataPort;
use crate::ports::exchange_port::ExchangePort;

pub struct PaperExchange {
    data: CsvAdapter,
    balance: f64,
    as_of: NaiveDate,
    leverage: HashMap<String, u32>,
    orders: Vec<OrderIntent>,
}

impl PaperExchange {
    pub fn new(data: CsvAdapter, balance: f64, as_of: NaiveDate) -> Self {
        Self {
            data,
            balance,
            as_of,
            leverage: HashMap::new(),
            orders: Vec::new(),
        }
    }

    pub fn leverage_for(&self, asset: &str) -> Option<u32> {
        self.leverage.get(asset).copied()
    }

    pub fn orders(&self) -> &[OrderIntent] {
        &self.orders
    }

    fn bars(&self, asset: &str) -> Result<Vec<OhlcvBar>, TurtleError> {
        let all = self.data.fetch_ohlcv(asset, NaiveDate::MIN, self.as_of)?;
        Ok(window_until(&all, self.as_of).to_vec())
    }
}

impl ExchangePort for PaperExchange {
    fn get_candles(
        &self,
        asset: &str,
        timeframe: &str,
        count: usize,
    ) -> Result<Vec<OhlcvBar>, TurtleError> {
        if timeframe != "1d" {
            return Err(TurtleError::Exchange {
                reason: format!("paper exchange only serves daily candles, not {timeframe}"),
            });
        }
        let bars = self.bars(asset)?;
        Ok(tail(&bars, count).to_vec())
    }

    fn get_current_price(&self, asset: &str) -> Result<f64, TurtleError> {
        Ok(self.bars(asset)?.last().map(|b| b.close).unwrap_or(0.0))
    }

    fn get_account_balance(&self) -> Result<f64, TurtleError> {
        Ok(self.balance)
    }

    fn set_leverage(&mut self, asset: &str, leverage: u32) -> Result<(), TurtleError> {
        self.leverage.insert(asset.to_string(), leverage);
        Ok(())
    }

    fn place_market_order(&mut self, order: &OrderIntent) -> Result<Fill, TurtleError> {
        let price = self.get_current_price(&order.key.asset)?;
        if price <= 0.0 {
            return Err(TurtleError::Exchange {
                reason: format!("no price for {}", order.key.asset),
            });
        }
        debug!(key = %order.key, price, amount = order.amount, "paper fill");
        self.orders.push(order.clone());
        Ok(Fill {
            amount: order.amount,
            price,
        })
    }
}
