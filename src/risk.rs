//! Risk management
//!
//! Fixed-risk position sizing, margin sufficiency, and a daily trade
//! cap. All monetary values are dimensionless: sizing works in any
//! currency as long as balance and prices share one denomination.
//!
//! Position sizing formula:
//! ```text
//! quantity = (balance * risk_per_trade) / |entry_price - stop_price|
//! ```
//!
//! The day-rollover counter compares dates handed in by the caller, so
//! the whole module is clock-free and testable without mocking time.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Risk limits, loaded from the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Fraction of balance risked between entry and stop (default: 0.02)
    #[serde(default = "default_risk_per_trade")]
    pub risk_per_trade: f64,

    /// Cap on position value as a fraction of balance (default: 0.5)
    #[serde(default = "default_max_position_pct")]
    pub max_position_pct: f64,

    /// New entries allowed per calendar day (default: 5)
    #[serde(default = "default_max_trades_per_day")]
    pub max_trades_per_day: usize,

    /// Minimum available margin before any entry is considered
    #[serde(default = "default_min_available_margin")]
    pub min_available_margin: f64,
}

fn default_risk_per_trade() -> f64 {
    0.02
}
fn default_max_position_pct() -> f64 {
    0.5
}
fn default_max_trades_per_day() -> usize {
    5
}
fn default_min_available_margin() -> f64 {
    10.0
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_per_trade: default_risk_per_trade(),
            max_position_pct: default_max_position_pct(),
            max_trades_per_day: default_max_trades_per_day(),
            min_available_margin: default_min_available_margin(),
        }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0 < self.risk_per_trade && self.risk_per_trade <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "risk_per_trade must be in (0, 1], got {}",
                self.risk_per_trade
            )));
        }
        if !(0.0 < self.max_position_pct && self.max_position_pct <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "max_position_pct must be in (0, 1], got {}",
                self.max_position_pct
            )));
        }
        if self.max_trades_per_day == 0 {
            return Err(ConfigError::Invalid(
                "max_trades_per_day must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Sizing arithmetic plus the daily entry counter
#[derive(Debug, Clone)]
pub struct RiskManager {
    config: RiskConfig,
    trades_today: usize,
    counter_date: Option<NaiveDate>,
}

impl RiskManager {
    pub fn new(config: RiskConfig) -> Self {
        Self {
            config,
            trades_today: 0,
            counter_date: None,
        }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Quantity that risks `balance * risk_per_trade` between entry and
    /// stop, capped so the position value stays within
    /// `balance * max_position_pct`. Zero when the stop distance is
    /// zero or any input is non-positive.
    pub fn position_size(&self, balance: f64, entry_price: f64, stop_price: f64) -> f64 {
        if balance <= 0.0 || entry_price <= 0.0 {
            return 0.0;
        }

        let stop_distance = (entry_price - stop_price).abs();
        if stop_distance == 0.0 {
            return 0.0;
        }

        let quantity = (balance * self.config.risk_per_trade) / stop_distance;

        let max_value = balance * self.config.max_position_pct;
        if quantity * entry_price > max_value {
            max_value / entry_price
        } else {
            quantity
        }
    }

    /// Is there enough free margin to carry the position?
    pub fn has_sufficient_margin(
        &self,
        available_margin: f64,
        quantity: f64,
        entry_price: f64,
    ) -> bool {
        available_margin >= self.config.min_available_margin
            && available_margin >= quantity * entry_price * self.config.risk_per_trade
    }

    /// May another entry be opened on `today`?
    ///
    /// Rolls the counter when the date differs from the last recorded
    /// trade's date.
    pub fn can_trade(&mut self, today: NaiveDate) -> bool {
        self.roll_day(today);
        self.trades_today < self.config.max_trades_per_day
    }

    /// Count an opened entry against `today`'s budget
    pub fn record_trade(&mut self, today: NaiveDate) {
        self.roll_day(today);
        self.trades_today += 1;
    }

    pub fn trades_today(&self) -> usize {
        self.trades_today
    }

    fn roll_day(&mut self, today: NaiveDate) {
        if self.counter_date != Some(today) {
            self.counter_date = Some(today);
            self.trades_today = 0;
        }
    }
}
