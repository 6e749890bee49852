//! Append-only trade journal
//!
//! One JSON object per line, never rewritten. This file and the text
//! log are the system's only persistence.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Symbol, TradeDirection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalEvent {
    Entry,
    Exit,
}

/// One journaled trade event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub event: JournalEvent,
    pub symbol: Symbol,
    pub direction: TradeDirection,
    pub quantity: f64,
    pub entry_price: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_price: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pnl: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<i64>,

    pub paper: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Writer for the newline-delimited JSON journal
#[derive(Debug, Clone)]
pub struct TradeJournal {
    path: PathBuf,
}

impl TradeJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single JSON line
    pub fn append(&self, record: &TradeRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }

        let line = serde_json::to_string(record).context("failed to serialize trade record")?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open journal {}", self.path.display()))?;
        writeln!(file, "{}", line).context("failed to append trade record")?;

        Ok(())
    }
}
