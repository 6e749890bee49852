//! Exchange REST client
//!
//! A thin signed wrapper over the futures REST API: klines, balance,
//! positions, order placement. Requests retry with exponential backoff
//! on transport errors and are paced by a minimum inter-request delay;
//! API-level rejections (non-zero `code`) are returned to the caller
//! unretried since they are deterministic.

use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use super::auth::{signed_query, Credentials};
use super::types::{
    position_side, ApiResponse, BalanceData, ExchangePosition, OrderData, PlacedOrder, RawKline,
};
use crate::types::{Candle, Side, TradeDirection};

/// Base URL for the futures REST API
pub const DEFAULT_BASE_URL: &str = "https://open-api.bingx.com";

/// Maximum klines per request (API limit)
const MAX_KLINES_PER_REQUEST: u32 = 1440;

const KLINES_PATH: &str = "/openApi/swap/v3/quote/klines";
const BALANCE_PATH: &str = "/openApi/swap/v2/user/balance";
const POSITIONS_PATH: &str = "/openApi/swap/v2/user/positions";
const ORDER_PATH: &str = "/openApi/swap/v2/trade/order";

/// Errors surfaced by the exchange client
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("exchange API error {code}: {msg}")]
    Api { code: i64, msg: String },

    #[error("failed to parse exchange response: {0}")]
    Parse(String),

    #[error("API credentials are not configured")]
    MissingCredentials,
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    /// Minimum delay between consecutive requests
    pub request_pause: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            request_pause: Duration::from_millis(200),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_request_pause(mut self, pause: Duration) -> Self {
        self.request_pause = pause;
        self
    }
}

/// Futures exchange API client
#[derive(Debug)]
pub struct ExchangeClient {
    http: Client,
    credentials: Option<Credentials>,
    config: ClientConfig,
    last_request: Mutex<Option<Instant>>,
}

impl ExchangeClient {
    /// Market-data-only client; authenticated calls will fail with
    /// [`ExchangeError::MissingCredentials`]
    pub fn public(config: ClientConfig) -> Self {
        Self::build(config, None)
    }

    pub fn new(config: ClientConfig, credentials: Credentials) -> Self {
        Self::build(config, Some(credentials))
    }

    fn build(config: ClientConfig, credentials: Option<Credentials>) -> Self {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            credentials,
            config,
            last_request: Mutex::new(None),
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Fetch klines, oldest first
    pub async fn get_klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<Candle>, ExchangeError> {
        let limit = limit.min(MAX_KLINES_PER_REQUEST);
        let url = format!(
            "{}{}?symbol={}&interval={}&limit={}",
            self.config.base_url, KLINES_PATH, symbol, interval, limit
        );

        debug!(symbol, interval, limit, "fetching klines");

        let raw: Vec<RawKline> = self
            .fetch(Method::GET, &url)
            .await?
            .ok_or_else(|| ExchangeError::Parse("empty klines payload".into()))?;

        let mut candles: Vec<Candle> = raw.iter().filter_map(RawKline::to_candle).collect();
        candles.sort_by_key(|c| c.datetime);
        candles.dedup_by_key(|c| c.datetime);

        Ok(candles)
    }

    /// Fetch the futures account balance
    pub async fn get_balance(&self) -> Result<super::types::AccountBalance, ExchangeError> {
        let url = self.signed_url(BALANCE_PATH, vec![])?;
        let data: BalanceData = self
            .fetch(Method::GET, &url)
            .await?
            .ok_or_else(|| ExchangeError::Parse("empty balance payload".into()))?;
        Ok(data.balance)
    }

    /// Open positions for a symbol (empty when flat)
    pub async fn get_positions(
        &self,
        symbol: &str,
    ) -> Result<Vec<ExchangePosition>, ExchangeError> {
        let url = self.signed_url(
            POSITIONS_PATH,
            vec![("symbol".to_string(), symbol.to_string())],
        )?;
        let positions: Option<Vec<ExchangePosition>> = self.fetch(Method::GET, &url).await?;
        Ok(positions
            .unwrap_or_default()
            .into_iter()
            .filter(ExchangePosition::is_open)
            .collect())
    }

    /// Place a market order, optionally with attached stop loss and
    /// take profit prices
    pub async fn place_order(
        &self,
        symbol: &str,
        direction: TradeDirection,
        quantity: f64,
        stop_loss: Option<f64>,
        take_profit: Option<f64>,
    ) -> Result<PlacedOrder, ExchangeError> {
        self.submit_order(
            symbol,
            direction.entry_side(),
            direction,
            quantity,
            stop_loss,
            take_profit,
        )
        .await
    }

    /// Close an open position with an opposite-side market order
    pub async fn close_position(
        &self,
        symbol: &str,
        direction: TradeDirection,
        quantity: f64,
    ) -> Result<PlacedOrder, ExchangeError> {
        self.submit_order(
            symbol,
            direction.opposite().entry_side(),
            direction,
            quantity,
            None,
            None,
        )
        .await
    }

    async fn submit_order(
        &self,
        symbol: &str,
        side: Side,
        direction: TradeDirection,
        quantity: f64,
        stop_loss: Option<f64>,
        take_profit: Option<f64>,
    ) -> Result<PlacedOrder, ExchangeError> {
        let mut params = vec![
            ("symbol".to_string(), symbol.to_string()),
            ("side".to_string(), side.as_str().to_string()),
            (
                "positionSide".to_string(),
                position_side(direction).to_string(),
            ),
            ("type".to_string(), "MARKET".to_string()),
            ("quantity".to_string(), quantity.to_string()),
        ];
        if let Some(stop) = stop_loss {
            params.push(("stopLoss".to_string(), stop.to_string()));
        }
        if let Some(target) = take_profit {
            params.push(("takeProfit".to_string(), target.to_string()));
        }

        let url = self.signed_url(ORDER_PATH, params)?;
        let data: OrderData = self
            .fetch(Method::POST, &url)
            .await?
            .ok_or_else(|| ExchangeError::Parse("empty order payload".into()))?;
        Ok(data.order)
    }

    fn signed_url(
        &self,
        path: &str,
        params: Vec<(String, String)>,
    ) -> Result<String, ExchangeError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(ExchangeError::MissingCredentials)?;
        let timestamp = Utc::now().timestamp_millis();
        let query = signed_query(params, timestamp, credentials.api_secret());
        Ok(format!("{}{}?{}", self.config.base_url, path, query))
    }

    /// One logical request: paced, retried on transport errors, and
    /// unwrapped from the `{code, msg, data}` envelope
    async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
    ) -> Result<Option<T>, ExchangeError> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(2u64.pow(attempt - 1));
                debug!("retrying after {}ms", delay.as_millis());
                sleep(delay).await;
            }

            self.pace().await;

            match self.try_fetch::<T>(method.clone(), url).await {
                Ok(data) => return Ok(data),
                Err(e @ ExchangeError::Http(_)) => {
                    warn!(
                        "request failed (attempt {}/{}): {}",
                        attempt + 1,
                        self.config.max_retries + 1,
                        e
                    );
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| ExchangeError::Parse("retry loop ended without a result".into())))
    }

    async fn try_fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
    ) -> Result<Option<T>, ExchangeError> {
        let mut request = self.http.request(method, url);
        if let Some(credentials) = &self.credentials {
            request = request.header("X-BX-APIKEY", credentials.api_key());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExchangeError::Api {
                code: status.as_u16() as i64,
                msg: body,
            });
        }

        let envelope: ApiResponse<T> = response.json().await?;
        if envelope.code != 0 {
            return Err(ExchangeError::Api {
                code: envelope.code,
                msg: envelope.msg,
            });
        }

        Ok(envelope.data)
    }

    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.config.request_pause {
                sleep(self.config.request_pause - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_client_has_no_credentials() {
        let client = ExchangeClient::public(ClientConfig::default());
        assert!(!client.has_credentials());
        assert!(matches!(
            client.signed_url(BALANCE_PATH, vec![]),
            Err(ExchangeError::MissingCredentials)
        ));
    }

    #[test]
    fn test_signed_url_contains_signature() {
        let client = ExchangeClient::new(
            ClientConfig::default(),
            Credentials::new("key", "secret"),
        );
        let url = client
            .signed_url(BALANCE_PATH, vec![("recvWindow".into(), "5000".into())])
            .unwrap();

        assert!(url.starts_with("https://open-api.bingx.com/openApi/swap/v2/user/balance?"));
        assert!(url.contains("recvWindow=5000"));
        assert!(url.contains("&signature="));
    }

    #[test]
    fn test_config_builders() {
        let config = ClientConfig::default()
            .with_base_url("http://localhost:8080")
            .with_max_retries(1)
            .with_request_pause(Duration::from_millis(50));

        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.request_pause, Duration::from_millis(50));
    }
}
