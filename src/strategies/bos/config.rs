//! Break-of-structure strategy configuration

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::indicators::IndicatorConfig;

/// Configuration for the break-of-structure tracker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BosConfig {
    /// Structure window on the higher timeframe (default: 20)
    #[serde(default = "default_higher_lookback")]
    pub higher_lookback: usize,

    /// Structure window on the lower, confirmation timeframe (default: 10)
    #[serde(default = "default_lower_lookback")]
    pub lower_lookback: usize,

    /// Neighbor window for the impulse-origin swing scan (default: 5)
    #[serde(default = "default_swing_neighbor")]
    pub swing_neighbor: usize,

    /// Retracement ratio anchoring the entry (default: 0.5)
    #[serde(default = "default_fib_entry")]
    pub fib_entry: f64,

    /// Retracement ratio anchoring the stop pivot (default: 0.618)
    #[serde(default = "default_fib_stop")]
    pub fib_stop: f64,

    /// Extra stop distance beyond the pivot, as a fraction of impulse
    /// size (default: 0.05)
    #[serde(default = "default_stop_buffer")]
    pub stop_buffer: f64,

    /// Take-profit distance as a multiple of risk distance (default: 2.0)
    #[serde(default = "default_risk_reward")]
    pub risk_reward: f64,

    /// Indicator periods applied to both timeframes
    #[serde(default)]
    pub indicators: IndicatorConfig,
}

fn default_higher_lookback() -> usize {
    20
}
fn default_lower_lookback() -> usize {
    10
}
fn default_swing_neighbor() -> usize {
    5
}
fn default_fib_entry() -> f64 {
    0.5
}
fn default_fib_stop() -> f64 {
    0.618
}
fn default_stop_buffer() -> f64 {
    0.05
}
fn default_risk_reward() -> f64 {
    2.0
}

impl Default for BosConfig {
    fn default() -> Self {
        Self {
            higher_lookback: default_higher_lookback(),
            lower_lookback: default_lower_lookback(),
            swing_neighbor: default_swing_neighbor(),
            fib_entry: default_fib_entry(),
            fib_stop: default_fib_stop(),
            stop_buffer: default_stop_buffer(),
            risk_reward: default_risk_reward(),
            indicators: IndicatorConfig::default(),
        }
    }
}

impl BosConfig {
    /// Reject configurations that would silently produce wrong zones.
    /// Called at startup, before the first tick.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.higher_lookback == 0 || self.lower_lookback == 0 {
            return Err(ConfigError::Invalid(
                "structure lookbacks must be greater than zero".into(),
            ));
        }
        if self.swing_neighbor == 0 {
            return Err(ConfigError::Invalid(
                "swing_neighbor must be greater than zero".into(),
            ));
        }
        if !(0.0 < self.fib_entry && self.fib_entry < self.fib_stop && self.fib_stop < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "fibonacci pair must satisfy 0 < fib_entry < fib_stop < 1, got {} / {}",
                self.fib_entry, self.fib_stop
            )));
        }
        if self.stop_buffer < 0.0 {
            return Err(ConfigError::Invalid(
                "stop_buffer must not be negative".into(),
            ));
        }
        if self.risk_reward <= 0.0 {
            return Err(ConfigError::Invalid(
                "risk_reward must be positive".into(),
            ));
        }
        if self.indicators.ema_trend == 0 {
            return Err(ConfigError::Invalid(
                "trend EMA period must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Minimum higher-timeframe candles for the full pipeline to engage
    pub fn min_higher_candles(&self) -> usize {
        (self.higher_lookback + 2).max(self.indicators.ema_trend)
    }

    /// Minimum lower-timeframe candles for confirmation to engage
    pub fn min_lower_candles(&self) -> usize {
        self.lower_lookback + 2
    }
}
