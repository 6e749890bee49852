//! Break-of-Structure Trading Bot
//!
//! An automated futures trading bot built around a multi-timeframe
//! break-of-structure setup: a trend read on the higher timeframe, a
//! structural break, a Fibonacci retracement zone, a lower-timeframe
//! confirmation break, and a derived entry/stop/target triple. A plain
//! single-timeframe trend strategy ships alongside it.
//!
//! The core ([`strategies::bos::StructureTracker`] and the
//! [`indicators`] engine it feeds on) is pure computation over
//! in-memory candle arrays: no I/O, no clock, no panics on short data.
//! Networking lives in [`exchange`], orchestration in the binary's
//! command modules.
//!
//! # Example
//! ```no_run
//! use bos_trader::exchange::{ClientConfig, ExchangeClient};
//! use bos_trader::strategies::{BosConfig, StructureTracker};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ExchangeClient::public(ClientConfig::default());
//!     let higher = client.get_klines("BTC-USDT", "4h", 400).await?;
//!     let lower = client.get_klines("BTC-USDT", "15m", 400).await?;
//!
//!     let mut tracker = StructureTracker::new(BosConfig::default());
//!     let analysis = tracker.analyze(&higher, &lower);
//!     println!("long: {:?}", analysis.long_signal);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod exchange;
pub mod indicators;
pub mod journal;
pub mod risk;
pub mod strategies;
pub mod types;

pub use config::Config;
pub use indicators::{IndicatorConfig, IndicatorSnapshot};
pub use strategies::{BosConfig, StructureTracker, TrendConfig, TrendStrategy};
pub use types::*;

// Re-export the exchange client for convenience
pub use exchange::ExchangeClient;
