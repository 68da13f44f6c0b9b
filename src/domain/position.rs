//! Positions, slot keys and trade records.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
        }
    }
}

/// One (asset, lookback period) sub-strategy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    pub asset: String,
    pub period: usize,
}

impl SlotKey {
    pub fn new(asset: &str, period: usize) -> Self {
        SlotKey {
            asset: asset.to_string(),
            period,
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.asset, self.period)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid slot key {0:?}, expected ASSET-PERIOD")]
pub struct SlotKeyParseError(pub String);

impl FromStr for SlotKey {
    type Err = SlotKeyParseError;

    // Split at the last '-' so asset names containing '-' survive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (asset, period) = s
            .rsplit_once('-')
            .ok_or_else(|| SlotKeyParseError(s.to_string()))?;
        if asset.is_empty() {
            return Err(SlotKeyParseError(s.to_string()));
        }
        let period = period
            .parse::<usize>()
            .map_err(|_| SlotKeyParseError(s.to_string()))?;
        Ok(SlotKey::new(asset, period))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub side: Side,
    pub amount: f64,
    pub entry_price: f64,
    pub leverage: u32,
    pub entry_time: NaiveDateTime,
}

impl Position {
    /// Directional PnL if the position were valued at `price`.
    pub fn pnl_at(&self, price: f64) -> f64 {
        self.side.sign() * (price - self.entry_price) * self.amount * self.leverage as f64
    }

    pub fn notional_at(&self, price: f64) -> f64 {
        self.amount * price * self.leverage as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Open,
    Close,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Open => write!(f, "OPEN"),
            TradeAction::Close => write!(f, "CLOSE"),
        }
    }
}

/// Immutable audit-trail entry. `pnl` is `-fee` for opens and
/// `realized - fee` for closes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub time: NaiveDateTime,
    pub asset: String,
    pub period: usize,
    pub action: TradeAction,
    pub side: Side,
    pub amount: f64,
    pub price: f64,
    pub value: f64,
    pub leverage: u32,
    pub pnl: f64,
}

/// An order the driver wants placed for a slot.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderIntent {
    pub key: SlotKey,
    pub action: TradeAction,
    pub side: Side,
    pub amount: f64,
    pub price: f64,
    pub leverage: u32,
}

impl OrderIntent {
    /// Direction of the market order: opening a long or closing a short buys.
    pub fn is_buy(&self) -> bool {
        matches!(
            (self.action, self.side),
            (TradeAction::Open, Side::Long) | (TradeAction::Close, Side::Short)
        )
    }
}

/// What the venue actually executed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub amount: f64,
    pub price: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn position(side: Side) -> Position {
        Position {
            side,
            amount: 100.0,
            entry_price: 50.0,
            leverage: 5,
            entry_time: entry_time(),
        }
    }

    #[test]
    fn long_pnl_is_leveraged_price_move() {
        let pos = position(Side::Long);
        assert!((pos.pnl_at(55.0) - 2500.0).abs() < 1e-9);
        assert!((pos.pnl_at(45.0) + 2500.0).abs() < 1e-9);
    }

    #[test]
    fn short_pnl_is_inverted() {
        let pos = position(Side::Short);
        assert!((pos.pnl_at(45.0) - 2500.0).abs() < 1e-9);
        assert!((pos.pnl_at(55.0) + 2500.0).abs() < 1e-9);
    }

    #[test]
    fn notional_includes_leverage() {
        let pos = position(Side::Long);
        assert!((pos.notional_at(50.0) - 25000.0).abs() < 1e-9);
    }

    #[test]
    fn slot_key_display_and_parse() {
        let key = SlotKey::new("BTC/USDT", 20);
        assert_eq!(key.to_string(), "BTC/USDT-20");
        assert_eq!("BTC/USDT-20".parse::<SlotKey>().unwrap(), key);
    }

    #[test]
    fn slot_key_parse_uses_last_dash() {
        let key: SlotKey = "1000-PEPE-30".parse().unwrap();
        assert_eq!(key.asset, "1000-PEPE");
        assert_eq!(key.period, 30);
    }

    #[test]
    fn slot_key_parse_rejects_garbage() {
        assert!("BTC".parse::<SlotKey>().is_err());
        assert!("BTC-x".parse::<SlotKey>().is_err());
        assert!("-20".parse::<SlotKey>().is_err());
    }

    #[test]
    fn side_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Side::Long).unwrap(), "\"LONG\"");
        assert_eq!(
            serde_json::from_str::<Side>("\"SHORT\"").unwrap(),
            Side::Short
        );
    }

    #[test]
    fn order_direction() {
        let mut intent = OrderIntent {
            key: SlotKey::new("ETH/USDT", 10),
            action: TradeAction::Open,
            side: Side::Long,
            amount: 1.0,
            price: 100.0,
            leverage: 1,
        };
        assert!(intent.is_buy());
        intent.action = TradeAction::Close;
        assert!(!intent.is_buy());
        intent.side = Side::Short;
        assert!(intent.is_buy());
    }
}
