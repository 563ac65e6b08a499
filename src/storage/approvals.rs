//! Manual-mode approval queue.
//!
//! Each manual cycle replaces the queue with the signals it did not
//! dispatch. The operator moves entries to the approved set (`approve`) or
//! drops them (`reject`). The next manual cycle consumes the approvals it
//! read; anything approved while that cycle ran waits for the one after.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{info, warn};

use super::{load_or_default, lock, save_snapshot};
use crate::types::{normalise_symbol, ApprovalQueueEntry, PipelineError, Signal};

#[derive(Debug, Default)]
struct ApprovalState {
    queue: Vec<ApprovalQueueEntry>,
    approved: Vec<ApprovalQueueEntry>,
}

pub struct ApprovalQueue {
    queue_path: Option<PathBuf>,
    approved_path: Option<PathBuf>,
    state: Mutex<ApprovalState>,
}

impl ApprovalQueue {
    /// Open the queue and approved set from their snapshot files.
    pub fn open(queue_path: impl Into<PathBuf>, approved_path: impl Into<PathBuf>) -> Self {
        let queue_path = queue_path.into();
        let approved_path = approved_path.into();
        let state = ApprovalState {
            queue: load_or_default(&queue_path, "approval_queue"),
            approved: load_or_default(&approved_path, "approved_signals"),
        };
        Self {
            queue_path: Some(queue_path),
            approved_path: Some(approved_path),
            state: Mutex::new(state),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            queue_path: None,
            approved_path: None,
            state: Mutex::new(ApprovalState::default()),
        }
    }

    /// Replace the queue with one entry per signal. Symbols already in the
    /// approved set are not queued again.
    pub fn queue_batch(&self, signals: &[Signal]) -> usize {
        let mut state = lock(&self.state);
        let approved: BTreeSet<String> = state.approved.iter().map(|e| e.symbol.clone()).collect();
        state.queue = signals
            .iter()
            .filter(|s| !approved.contains(&s.symbol))
            .map(ApprovalQueueEntry::from_signal)
            .collect();
        info!(count = state.queue.len(), "Signals queued for manual approval");
        self.persist(&state);
        state.queue.len()
    }

    /// Move `symbol` from the queue to the approved set.
    pub fn approve(&self, symbol: &str) -> Result<ApprovalQueueEntry, PipelineError> {
        let symbol = normalise_symbol(symbol);
        let mut state = lock(&self.state);
        let pos = state
            .queue
            .iter()
            .position(|e| e.symbol == symbol)
            .ok_or_else(|| PipelineError::NotQueued(symbol.clone()))?;

        let entry = state.queue.remove(pos);
        state.approved.retain(|e| e.symbol != symbol);
        state.approved.push(entry.clone());
        info!(symbol = %symbol, confidence = entry.confidence, "Approved for execution");
        self.persist(&state);
        Ok(entry)
    }

    /// Remove `symbol` from the queue without approving it.
    pub fn reject(&self, symbol: &str) -> Result<ApprovalQueueEntry, PipelineError> {
        let symbol = normalise_symbol(symbol);
        let mut state = lock(&self.state);
        let pos = state
            .queue
            .iter()
            .position(|e| e.symbol == symbol)
            .ok_or_else(|| PipelineError::NotQueued(symbol.clone()))?;

        let entry = state.queue.remove(pos);
        info!(symbol = %symbol, "Rejected and removed from queue");
        self.persist(&state);
        Ok(entry)
    }

    pub fn queue(&self) -> Vec<ApprovalQueueEntry> {
        lock(&self.state).queue.clone()
    }

    pub fn approved(&self) -> Vec<ApprovalQueueEntry> {
        lock(&self.state).approved.clone()
    }

    pub fn approved_symbols(&self) -> BTreeSet<String> {
        lock(&self.state)
            .approved
            .iter()
            .map(|e| e.symbol.clone())
            .collect()
    }

    /// Remove and return the approved entries for `symbols`. Approvals for
    /// other symbols stay in the set.
    pub fn consume(&self, symbols: &BTreeSet<String>) -> Vec<ApprovalQueueEntry> {
        let mut state = lock(&self.state);
        let (taken, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.approved)
            .into_iter()
            .partition(|e| symbols.contains(&e.symbol));
        state.approved = kept;
        if !taken.is_empty() {
            self.persist(&state);
        }
        taken
    }

    fn persist(&self, state: &ApprovalState) {
        let targets = [
            (self.queue_path.as_ref(), &state.queue, "approval_queue"),
            (self.approved_path.as_ref(), &state.approved, "approved_signals"),
        ];
        for (path, entries, resource) in targets {
            let Some(path) = path else { continue };
            if let Err(e) = save_snapshot(path, entries) {
                let err = PipelineError::TransientIo {
                    resource: resource.to_string(),
                    message: format!("{e:#}"),
                };
                warn!(error = %err, "Approval state not persisted");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
