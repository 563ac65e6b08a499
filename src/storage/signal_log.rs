//! Signal audit log.
//!
//! Every cycle's boosted signals are appended with the action the gate took,
//! whether or not they were dispatched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, warn};

use super::{load_or_default, lock, save_snapshot};
use crate::types::{Direction, PipelineError, Signal};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalLogEntry {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub direction: Direction,
    pub confidence: u8,
    pub reason: String,
    pub action: String,
}

pub struct SignalLog {
    path: Option<PathBuf>,
    entries: Mutex<Vec<SignalLogEntry>>,
}

impl SignalLog {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries: Vec<SignalLogEntry> = load_or_default(&path, "signal_log");
        Self {
            path: Some(path),
            entries: Mutex::new(entries),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Append `(signal, action)` pairs and persist once.
    pub fn record<'a>(&self, batch: impl IntoIterator<Item = (&'a Signal, &'a str)>) {
        let mut entries = lock(&self.entries);
        let before = entries.len();
        let now = Utc::now();
        entries.extend(batch.into_iter().map(|(signal, action)| SignalLogEntry {
            timestamp: now,
            symbol: signal.symbol.clone(),
            direction: signal.direction,
            confidence: signal.confidence,
            reason: signal.reason_text(),
            action: action.to_string(),
        }));
        debug!(added = entries.len() - before, "Signals logged");

        if let Some(path) = self.path.as_ref() {
            if let Err(e) = save_snapshot(path, &*entries) {
                let err = PipelineError::TransientIo {
                    resource: "signal_log".to_string(),
                    message: format!("{e:#}"),
                };
                warn!(error = %err, "Signal log not persisted");
            }
        }
    }

    pub fn entries(&self) -> Vec<SignalLogEntry> {
        lock(&self.entries).clone()
    }
}
