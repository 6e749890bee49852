//! Trading strategies
//!
//! Two strategies ship with the bot:
//! - `bos`: the multi-timeframe break-of-structure state machine
//! - `trend`: a stateless single-timeframe checklist
//!
//! Both report their entry decisions as a [`SignalCheck`] so the log
//! always shows *why* a signal fired or where the checklist stopped.

pub mod bos;
pub mod trend;

use serde::{Deserialize, Serialize};

pub use bos::{Analysis, BosConfig, StructureTracker};
pub use trend::{TrendConfig, TrendStrategy};

/// Which strategy the bot runs, selected by name in the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Bos,
    Trend,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::Bos => write!(f, "bos"),
            StrategyKind::Trend => write!(f, "trend"),
        }
    }
}

/// Outcome of an ordered entry checklist.
///
/// `reasons` accumulates one line per evaluated step, in checklist
/// order; evaluation stops at the first unmet condition, so a failed
/// check's last reason names the first failing step. `signal` is true
/// only when every step passed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalCheck {
    pub signal: bool,
    pub reasons: Vec<String>,
}

impl SignalCheck {
    /// Walk `(met, satisfied-reason, unsatisfied-reason)` steps in order,
    /// short-circuiting at the first unmet one
    pub fn from_steps<I>(steps: I) -> Self
    where
        I: IntoIterator<Item = (bool, String, String)>,
    {
        let mut reasons = Vec::new();
        for (met, satisfied, unsatisfied) in steps {
            if met {
                reasons.push(satisfied);
            } else {
                reasons.push(unsatisfied);
                return SignalCheck {
                    signal: false,
                    reasons,
                };
            }
        }
        SignalCheck {
            signal: true,
            reasons,
        }
    }

    /// The first failing step's reason, if the checklist failed
    pub fn first_unmet(&self) -> Option<&str> {
        if self.signal {
            None
        } else {
            self.reasons.last().map(|s| s.as_str())
        }
    }
}
