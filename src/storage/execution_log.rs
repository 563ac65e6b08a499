//! Execution log.
//!
//! Append-only list of [`ExecutionRecord`]s. Records are never deleted; the
//! only mutation is the single pending → win/loss resolution.

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use super::{load_snapshot, lock, preserve_unreadable, save_snapshot};
use crate::types::{ExecutionRecord, Outcome, PipelineError};

pub struct ExecutionLog {
    path: Option<PathBuf>,
    records: Mutex<Vec<ExecutionRecord>>,
}

impl ExecutionLog {
    /// Open the log at `path`, loading every readable record. Records that
    /// do not parse are skipped, and the file holding them is copied aside
    /// before the next write can replace it.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = load_records(&path);
        Self {
            path: Some(path),
            records: Mutex::new(records),
        }
    }

    /// A log that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            records: Mutex::new(Vec::new()),
        }
    }

    /// Append a record and persist the full log.
    pub fn append(&self, record: ExecutionRecord) {
        let mut records = lock(&self.records);
        info!(
            id = %record.id,
            symbol = %record.symbol,
            direction = %record.direction,
            confidence = record.confidence,
            mode = %record.mode,
            "Execution logged"
        );
        records.push(record);
        self.persist(&records);
    }

    /// Resolve a pending record to `outcome`. Fails if the record is unknown,
    /// already resolved, or `outcome` is itself pending.
    pub fn resolve(&self, id: Uuid, outcome: Outcome) -> Result<ExecutionRecord, PipelineError> {
        let mut records = lock(&self.records);
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(PipelineError::RecordNotFound(id))?;

        if !record.is_pending() {
            return Err(PipelineError::AlreadyResolved(id));
        }
        if outcome == Outcome::Pending {
            return Err(PipelineError::Data {
                symbol: record.symbol.clone(),
                message: "cannot resolve a record to pending".to_string(),
            });
        }

        record.outcome = outcome;
        record.resolved_at = Some(Utc::now());
        let resolved = record.clone();
        self.persist(&records);
        Ok(resolved)
    }

    /// All records in dispatch order.
    pub fn records(&self) -> Vec<ExecutionRecord> {
        lock(&self.records).clone()
    }

    /// Pending records whose order reached the broker.
    pub fn awaiting_settlement(&self) -> Vec<ExecutionRecord> {
        lock(&self.records)
            .iter()
            .filter(|r| r.is_awaiting_settlement())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn persist(&self, records: &[ExecutionRecord]) {
        let Some(path) = self.path.as_ref() else {
            return;
        };
        if let Err(e) = save_snapshot(path, records) {
            let err = PipelineError::TransientIo {
                resource: "execution_log".to_string(),
                message: format!("{e:#}"),
            };
            warn!(error = %err, "Execution log not persisted; in-memory log kept");
        }
    }
}

fn load_records(path: &Path) -> Vec<ExecutionRecord> {
    let raw: Vec<serde_json::Value> = match load_snapshot(path) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            info!(path = %path.display(), "No execution log found, starting empty");
            return Vec::new();
        }
        Err(e) => {
            warn!(
                path = %path.display(),
                error = format!("{e:#}"),
                "Execution log unreadable, starting empty"
            );
            keep_copy(path);
            return Vec::new();
        }
    };

    let total = raw.len();
    let records: Vec<ExecutionRecord> = raw
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(index, error = %e, "Skipping unreadable execution record");
                None
            }
        })
        .collect();

    if records.len() < total {
        keep_copy(path);
    }
    info!(
        path = %path.display(),
        records = records.len(),
        skipped = total - records.len(),
        "Execution log loaded"
    );
    records
}

fn keep_copy(path: &Path) {
    if let Err(e) = preserve_unreadable(path) {
        warn!(error = format!("{e:#}"), "Could not preserve unreadable execution log");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
