//! Request signing for authenticated exchange endpoints
//!
//! Authenticated requests carry the API key in an `X-BX-APIKEY` header
//! and an HMAC-SHA256 `signature` query parameter computed over the
//! sorted `key=value` query string, millisecond timestamp included.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 of `payload` keyed by `secret`
pub fn sign(payload: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Key-sorted `key=value&...` concatenation of the parameters
pub fn canonical_query(params: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the full signed query: parameters plus `timestamp`, sorted,
/// signed, with the signature appended last
pub fn signed_query(mut params: Vec<(String, String)>, timestamp_ms: i64, secret: &str) -> String {
    params.push(("timestamp".to_string(), timestamp_ms.to_string()));
    let query = canonical_query(&params);
    let signature = sign(&query, secret);
    format!("{}&signature={}", query, signature)
}

/// API credentials container
#[derive(Debug, Clone)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Looks for `BINGX_API_KEY` and `BINGX_API_SECRET`
    pub fn from_env() -> Result<Self, std::env::VarError> {
        let api_key = std::env::var("BINGX_API_KEY")?;
        let api_secret = std::env::var("BINGX_API_SECRET")?;
        Ok(Self::new(api_key, api_secret))
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_canonical_query_sorts_by_key() {
        let query = canonical_query(&params(&[
            ("symbol", "BTC-USDT"),
            ("interval", "4h"),
            ("limit", "200"),
        ]));
        assert_eq!(query, "interval=4h&limit=200&symbol=BTC-USDT");
    }

    #[test]
    fn test_signed_query_shape() {
        let signed = signed_query(params(&[("symbol", "BTC-USDT")]), 1700000000000, "secret");

        let (query, signature) = signed.rsplit_once("&signature=").unwrap();
        assert_eq!(query, "symbol=BTC-USDT&timestamp=1700000000000");
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_signature_is_deterministic_and_keyed() {
        let a = sign("symbol=BTC-USDT&timestamp=1", "secret");
        let b = sign("symbol=BTC-USDT&timestamp=1", "secret");
        let c = sign("symbol=BTC-USDT&timestamp=1", "other");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
