//! Exchange REST API integration
//!
//! - [`auth`]: HMAC-SHA256 signing of sorted query strings
//! - [`types`]: wire types and their parsing into core types
//! - [`client`]: the signed HTTP client with retry and pacing

pub mod auth;
pub mod client;
pub mod types;

pub use auth::Credentials;
pub use client::{ClientConfig, ExchangeClient, ExchangeError, DEFAULT_BASE_URL};
pub use types::{AccountBalance, ExchangePosition, PlacedOrder, SUPPORTED_INTERVALS};
