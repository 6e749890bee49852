//! Core data types used across the trading system

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV candlestick data, ordered oldest-to-newest in every sequence
/// handed to the indicator engine or the structure tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub datetime: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Trading pair symbol
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol(pub String);

impl Symbol {
    pub fn new(s: impl Into<String>) -> Self {
        Symbol(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order direction on the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

/// Direction of a structural setup or trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeDirection {
    Bullish,
    Bearish,
}

impl TradeDirection {
    /// The order side that opens a position in this direction
    pub fn entry_side(&self) -> Side {
        match self {
            TradeDirection::Bullish => Side::Buy,
            TradeDirection::Bearish => Side::Sell,
        }
    }

    pub fn opposite(&self) -> TradeDirection {
        match self {
            TradeDirection::Bullish => TradeDirection::Bearish,
            TradeDirection::Bearish => TradeDirection::Bullish,
        }
    }
}

impl std::fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeDirection::Bullish => write!(f, "bullish"),
            TradeDirection::Bearish => write!(f, "bearish"),
        }
    }
}

/// A fully derived trade proposal: where to get in, where to bail, where
/// to take profit. Produced by a strategy, consumed by the bot loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradePlan {
    pub direction: TradeDirection,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl TradePlan {
    /// Distance between entry and stop, the unit the risk manager sizes by
    pub fn risk_distance(&self) -> f64 {
        (self.entry_price - self.stop_loss).abs()
    }
}
