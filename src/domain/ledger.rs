//! Position ledger: one slot per (asset, period), two states per slot.
//!
//! FLAT -> OPEN on open, OPEN -> FLAT on close. Each transition appends
//! exactly one trade record and settles cash synchronously. Opening an open
//! slot or closing a flat one is rejected without touching state.
//!
//! Transitions can also be split into `plan_*` (pure, produces the order to
//! place) and `commit_*` (applies what the venue filled), so a failed order
//! never reaches the ledger.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;

use super::error::TurtleError;
use super::position::{Fill, OrderIntent, Position, Side, SlotKey, TradeAction, TradeRecord};

/// Persisted form of the open positions: `"{asset}-{period}" -> Position`.
pub type LedgerState = BTreeMap<String, Position>;

#[derive(Debug, Clone, PartialEq)]
pub struct PositionLedger {
    pub cash: f64,
    fee_rate: f64,
    positions: BTreeMap<SlotKey, Position>,
    trades: Vec<TradeRecord>,
}

impl PositionLedger {
    pub fn new(cash: f64, fee_rate: f64) -> Self {
        PositionLedger {
            cash,
            fee_rate,
            positions: BTreeMap::new(),
            trades: Vec::new(),
        }
    }

    pub fn fee_rate(&self) -> f64 {
        self.fee_rate
    }

    pub fn get(&self, key: &SlotKey) -> Option<&Position> {
        self.positions.get(key)
    }

    pub fn is_open(&self, key: &SlotKey) -> bool {
        self.positions.contains_key(key)
    }

    pub fn open_count(&self) -> usize {
        self.positions.len()
    }

    pub fn positions(&self) -> impl Iterator<Item = (&SlotKey, &Position)> {
        self.positions.iter()
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    /// Sum of `pnl` over every trade record (open fees included).
    pub fn realized_pnl(&self) -> f64 {
        self.trades.iter().map(|t| t.pnl).sum()
    }

    pub fn realized_pnl_for(&self, asset: &str) -> f64 {
        self.trades
            .iter()
            .filter(|t| t.asset == asset)
            .map(|t| t.pnl)
            .sum()
    }

    pub fn plan_open(
        &self,
        key: &SlotKey,
        side: Side,
        capital: f64,
        leverage: u32,
        price: f64,
    ) -> Result<OrderIntent, TurtleError> {
        if self.is_open(key) {
            return Err(TurtleError::SlotAlreadyOpen { key: key.clone() });
        }
        if price <= 0.0 || !price.is_finite() {
            return Err(TurtleError::Data {
                reason: format!("cannot size {key} at price {price}"),
            });
        }
        let notional = capital * leverage as f64;
        Ok(OrderIntent {
            key: key.clone(),
            action: TradeAction::Open,
            side,
            amount: notional / price,
            price,
            leverage,
        })
    }

    pub fn plan_close(&self, key: &SlotKey, price: f64) -> Result<OrderIntent, TurtleError> {
        let pos = self
            .positions
            .get(key)
            .ok_or_else(|| TurtleError::SlotFlat { key: key.clone() })?;
        Ok(OrderIntent {
            key: key.clone(),
            action: TradeAction::Close,
            side: pos.side,
            amount: pos.amount,
            price,
            leverage: pos.leverage,
        })
    }

    /// Open at `price` with `capital * leverage` notional.
    pub fn open(
        &mut self,
        key: &SlotKey,
        side: Side,
        capital: f64,
        leverage: u32,
        price: f64,
        time: NaiveDateTime,
    ) -> Result<TradeRecord, TurtleError> {
        let intent = self.plan_open(key, side, capital, leverage, price)?;
        let notional = capital * leverage as f64;
        Ok(self.record_open(&intent, intent.amount, price, notional, time))
    }

    /// Record an executed open order. Notional is taken from the fill.
    pub fn commit_open(
        &mut self,
        intent: &OrderIntent,
        fill: Fill,
        time: NaiveDateTime,
    ) -> Result<TradeRecord, TurtleError> {
        if intent.action != TradeAction::Open {
            return Err(TurtleError::Data {
                reason: format!("commit_open given a {} intent for {}", intent.action, intent.key),
            });
        }
        if self.is_open(&intent.key) {
            return Err(TurtleError::SlotAlreadyOpen {
                key: intent.key.clone(),
            });
        }
        check_fill(intent, &fill)?;
        let notional = fill.amount * fill.price;
        Ok(self.record_open(intent, fill.amount, fill.price, notional, time))
    }

    fn record_open(
        &mut self,
        intent: &OrderIntent,
        amount: f64,
        price: f64,
        notional: f64,
        time: NaiveDateTime,
    ) -> TradeRecord {
        let fee = notional * self.fee_rate;
        self.cash -= fee;

        self.positions.insert(
            intent.key.clone(),
            Position {
                side: intent.side,
                amount,
                entry_price: price,
                leverage: intent.leverage,
                entry_time: time,
            },
        );

        let record = TradeRecord {
            time,
            asset: intent.key.asset.clone(),
            period: intent.key.period,
            action: TradeAction::Open,
            side: intent.side,
            amount,
            price,
            value: notional,
            leverage: intent.leverage,
            pnl: -fee,
        };
        self.trades.push(record.clone());
        record
    }

    /// Close the slot at `price`.
    pub fn close(
        &mut self,
        key: &SlotKey,
        price: f64,
        time: NaiveDateTime,
    ) -> Result<TradeRecord, TurtleError> {
        let pos = self
            .positions
            .remove(key)
            .ok_or_else(|| TurtleError::SlotFlat { key: key.clone() })?;

        let notional = pos.notional_at(price);
        let fee = notional * self.fee_rate;
        let realized = pos.pnl_at(price);
        self.cash += realized - fee;

        let record = TradeRecord {
            time,
            asset: key.asset.clone(),
            period: key.period,
            action: TradeAction::Close,
            side: pos.side,
            amount: pos.amount,
            price,
            value: notional,
            leverage: pos.leverage,
            pnl: realized - fee,
        };
        self.trades.push(record.clone());
        Ok(record)
    }

    /// Record an executed close order at the filled price.
    pub fn commit_close(
        &mut self,
        intent: &OrderIntent,
        fill: Fill,
        time: NaiveDateTime,
    ) -> Result<TradeRecord, TurtleError> {
        if intent.action != TradeAction::Close {
            return Err(TurtleError::Data {
                reason: format!("commit_close given a {} intent for {}", intent.action, intent.key),
            });
        }
        if !self.is_open(&intent.key) {
            return Err(TurtleError::SlotFlat {
                key: intent.key.clone(),
            });
        }
        check_fill(intent, &fill)?;
        self.close(&intent.key, fill.price, time)
    }

    pub fn to_state(&self) -> LedgerState {
        self.positions
            .iter()
            .map(|(k, p)| (k.to_string(), p.clone()))
            .collect()
    }

    /// Replace the open positions with a persisted state.
    pub fn restore(&mut self, state: LedgerState) -> Result<(), TurtleError> {
        let mut positions = BTreeMap::new();
        for (raw, pos) in state {
            let key: SlotKey = raw.parse().map_err(|e| TurtleError::State {
                reason: format!("{e}"),
            })?;
            if !is_positive(pos.amount) || !is_positive(pos.entry_price) || pos.leverage < 1 {
                return Err(TurtleError::State {
                    reason: format!("position {key} has invalid amount, price or leverage"),
                });
            }
            positions.insert(key, pos);
        }
        self.positions = positions;
        Ok(())
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// A venue fill must carry a positive, finite amount and price.
fn check_fill(intent: &OrderIntent, fill: &Fill) -> Result<(), TurtleError> {
    if is_positive(fill.amount) && is_positive(fill.price) {
        return Ok(());
    }
    Err(TurtleError::Exchange {
        reason: format!(
            "rejected {} fill for {}: amount {} at price {}",
            intent.action, intent.key, fill.amount, fill.price
        ),
    })
}
