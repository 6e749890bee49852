//! Trend strategy configuration

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::indicators::IndicatorConfig;

/// Configuration for the single-timeframe trend strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendConfig {
    /// RSI ceiling for longs (default: 70)
    #[serde(default = "default_rsi_overbought")]
    pub rsi_overbought: f64,

    /// RSI floor for shorts (default: 30)
    #[serde(default = "default_rsi_oversold")]
    pub rsi_oversold: f64,

    /// Demand a volume spike on the signal candle (default: false)
    #[serde(default)]
    pub require_volume_spike: bool,

    /// Stop distance as a fraction of entry when no swing extreme is
    /// available (default: 0.02)
    #[serde(default = "default_fallback_stop_pct")]
    pub fallback_stop_pct: f64,

    /// Take-profit distance as a multiple of risk distance (default: 2.0)
    #[serde(default = "default_risk_reward")]
    pub risk_reward: f64,

    /// Indicator periods for the single timeframe
    #[serde(default)]
    pub indicators: IndicatorConfig,
}

fn default_rsi_overbought() -> f64 {
    70.0
}
fn default_rsi_oversold() -> f64 {
    30.0
}
fn default_fallback_stop_pct() -> f64 {
    0.02
}
fn default_risk_reward() -> f64 {
    2.0
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            rsi_overbought: default_rsi_overbought(),
            rsi_oversold: default_rsi_oversold(),
            require_volume_spike: false,
            fallback_stop_pct: default_fallback_stop_pct(),
            risk_reward: default_risk_reward(),
            indicators: IndicatorConfig::default(),
        }
    }
}

impl TrendConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0 < self.rsi_oversold && self.rsi_oversold < self.rsi_overbought
            && self.rsi_overbought < 100.0)
        {
            return Err(ConfigError::Invalid(format!(
                "RSI bounds must satisfy 0 < oversold < overbought < 100, got {} / {}",
                self.rsi_oversold, self.rsi_overbought
            )));
        }
        if self.fallback_stop_pct <= 0.0 {
            return Err(ConfigError::Invalid(
                "fallback_stop_pct must be positive".into(),
            ));
        }
        if self.risk_reward <= 0.0 {
            return Err(ConfigError::Invalid(
                "risk_reward must be positive".into(),
            ));
        }
        Ok(())
    }
}
