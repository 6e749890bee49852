//! Exchange API wire types
//!
//! The API wraps every payload in a `{code, msg, data}` envelope and
//! encodes most numbers as strings; parsing to `f64` happens at the
//! edges here so the rest of the system only ever sees [`Candle`] and
//! plain floats.

use chrono::DateTime;
use serde::Deserialize;

use crate::types::{Candle, TradeDirection};

/// Response envelope shared by all endpoints
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

/// Kline payload: string-encoded OHLCV plus a millisecond timestamp
#[derive(Debug, Clone, Deserialize)]
pub struct RawKline {
    pub open: String,
    pub close: String,
    pub high: String,
    pub low: String,
    pub volume: String,
    pub time: i64,
}

impl RawKline {
    /// Parse into a [`Candle`]; malformed rows are dropped, not fatal
    pub fn to_candle(&self) -> Option<Candle> {
        Some(Candle {
            datetime: DateTime::from_timestamp_millis(self.time)?,
            open: self.open.parse().ok()?,
            high: self.high.parse().ok()?,
            low: self.low.parse().ok()?,
            close: self.close.parse().ok()?,
            volume: self.volume.parse().ok()?,
        })
    }
}

/// Futures account balance
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalance {
    pub asset: String,
    pub balance: String,
    pub available_margin: String,
}

impl AccountBalance {
    pub fn balance_value(&self) -> f64 {
        self.balance.parse().unwrap_or(0.0)
    }

    pub fn available_margin_value(&self) -> f64 {
        self.available_margin.parse().unwrap_or(0.0)
    }
}

/// Envelope payload for the balance endpoint
#[derive(Debug, Deserialize)]
pub struct BalanceData {
    pub balance: AccountBalance,
}

/// An open futures position as reported by the exchange
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangePosition {
    pub symbol: String,
    pub position_side: String,
    pub position_amt: String,
    #[serde(default)]
    pub avg_price: String,
}

impl ExchangePosition {
    pub fn quantity(&self) -> f64 {
        self.position_amt.parse().unwrap_or(0.0)
    }

    pub fn entry_price(&self) -> f64 {
        self.avg_price.parse().unwrap_or(0.0)
    }

    pub fn is_open(&self) -> bool {
        self.quantity() != 0.0
    }
}

/// Envelope payload for order placement
#[derive(Debug, Deserialize)]
pub struct OrderData {
    pub order: PlacedOrder,
}

/// Acknowledged order
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    pub order_id: i64,
}

/// Position side string the futures API expects
pub fn position_side(direction: TradeDirection) -> &'static str {
    match direction {
        TradeDirection::Bullish => "LONG",
        TradeDirection::Bearish => "SHORT",
    }
}

/// Kline intervals the API accepts
pub const SUPPORTED_INTERVALS: &[&str] = &[
    "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "8h", "12h", "1d", "3d", "1w", "1M",
];

pub fn is_valid_interval(interval: &str) -> bool {
    SUPPORTED_INTERVALS.contains(&interval)
}
