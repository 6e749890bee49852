//! Configuration management
//!
//! JSON config file with serde field defaults, API credentials
//! overridable from the environment, and fail-fast validation: a config
//! that would produce silently wrong zones or an impossible loop is
//! rejected at startup, before the first tick.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::exchange::types::is_valid_interval;
use crate::exchange::{ClientConfig, Credentials};
use crate::risk::RiskConfig;
use crate::strategies::{BosConfig, StrategyKind, TrendConfig};

/// Configuration loading / validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub exchange: ExchangeSettings,

    pub trading: TradingConfig,

    /// Which strategy drives the bot
    #[serde(default = "default_strategy")]
    pub strategy: StrategyKind,

    #[serde(default)]
    pub bos: BosConfig,

    #[serde(default)]
    pub trend: TrendConfig,

    #[serde(default)]
    pub risk: RiskConfig,
}

fn default_strategy() -> StrategyKind {
    StrategyKind::Bos
}

impl Config {
    /// Load from a JSON file, then let `BINGX_API_KEY` /
    /// `BINGX_API_SECRET` override any file-borne credentials
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let mut config: Config = serde_json::from_str(&contents)?;

        if let Ok(api_key) = std::env::var("BINGX_API_KEY") {
            config.exchange.api_key = Some(api_key);
        }
        if let Ok(api_secret) = std::env::var("BINGX_API_SECRET") {
            config.exchange.api_secret = Some(api_secret);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the pipeline cannot run on
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.trading.validate()?;
        self.bos.validate()?;
        self.trend.validate()?;
        self.risk.validate()?;

        if (self.trading.kline_limit as usize) < self.bos.min_higher_candles() {
            return Err(ConfigError::Invalid(format!(
                "kline_limit {} cannot cover the {} higher-timeframe candles the strategy needs",
                self.trading.kline_limit,
                self.bos.min_higher_candles()
            )));
        }

        Ok(())
    }
}

/// Exchange connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_request_pause_ms")]
    pub request_pause_ms: u64,
}

fn default_base_url() -> String {
    crate::exchange::DEFAULT_BASE_URL.to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_request_pause_ms() -> u64 {
    200
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_secret: None,
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            request_pause_ms: default_request_pause_ms(),
        }
    }
}

impl ExchangeSettings {
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::default()
            .with_base_url(self.base_url.clone())
            .with_max_retries(self.max_retries)
            .with_request_pause(Duration::from_millis(self.request_pause_ms));
        config.timeout = Duration::from_secs(self.timeout_secs);
        config
    }

    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.api_key, &self.api_secret) {
            (Some(key), Some(secret)) => Some(Credentials::new(key, secret)),
            _ => None,
        }
    }
}

/// What and how often to trade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Trading pair, e.g. "BTC-USDT"
    pub symbol: String,

    /// Structure timeframe (default: "4h")
    #[serde(default = "default_higher_interval")]
    pub higher_interval: String,

    /// Confirmation timeframe (default: "15m")
    #[serde(default = "default_lower_interval")]
    pub lower_interval: String,

    /// Seconds between polling ticks (default: 60)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Candles fetched per timeframe per tick (default: 400)
    #[serde(default = "default_kline_limit")]
    pub kline_limit: u32,

    /// Simulated balance for paper trading (default: 10,000)
    #[serde(default = "default_paper_capital")]
    pub paper_capital: f64,

    /// Path of the newline-delimited JSON trade journal
    #[serde(default = "default_journal_path")]
    pub journal_path: String,
}

fn default_higher_interval() -> String {
    "4h".to_string()
}
fn default_lower_interval() -> String {
    "15m".to_string()
}
fn default_poll_interval_secs() -> u64 {
    60
}
fn default_kline_limit() -> u32 {
    400
}
fn default_paper_capital() -> f64 {
    10_000.0
}
fn default_journal_path() -> String {
    "trades.ndjson".to_string()
}

impl TradingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("symbol must not be empty".into()));
        }
        for interval in [&self.higher_interval, &self.lower_interval] {
            if !is_valid_interval(interval) {
                return Err(ConfigError::Invalid(format!(
                    "unsupported kline interval '{}'",
                    interval
                )));
            }
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_secs must be greater than zero".into(),
            ));
        }
        if self.paper_capital <= 0.0 {
            return Err(ConfigError::Invalid(
                "paper_capital must be positive".into(),
            ));
        }
        Ok(())
    }
}
