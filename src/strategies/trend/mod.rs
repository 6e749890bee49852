//! Plain single-timeframe trend strategy
//!
//! Independent threshold checks, no carried state: EMA trend, MACD
//! momentum, an RSI sanity bound, a range break, and optionally a
//! volume spike. The counterpart to the structure tracker for markets
//! where one timeframe is enough.

mod config;
mod strategy;

pub use config::TrendConfig;
pub use strategy::{TrendAssessment, TrendStrategy};
