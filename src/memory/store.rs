//! Pattern memory store.
//!
//! Persistent `PatternKey → occurrence count` map. Updates rewrite the whole
//! snapshot while holding the store lock, so concurrent cycles sharing one
//! store never lose increments. Counts only go down through `reset` and
//! `reset_all`.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, info, warn};

use super::PatternKey;
use crate::storage::{load_snapshot, lock, save_snapshot};
use crate::types::PipelineError;

pub struct PatternMemoryStore {
    path: Option<PathBuf>,
    counts: Mutex<BTreeMap<PatternKey, u64>>,
}

impl PatternMemoryStore {
    /// Open the store at `path`. Missing or corrupt files load as empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let counts = load_counts(&path);
        Self {
            path: Some(path),
            counts: Mutex::new(counts),
        }
    }

    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::from_counts(std::iter::empty::<(PatternKey, u64)>())
    }

    /// In-memory store seeded with counts.
    pub fn from_counts<K: Into<PatternKey>>(counts: impl IntoIterator<Item = (K, u64)>) -> Self {
        Self {
            path: None,
            counts: Mutex::new(counts.into_iter().map(|(k, n)| (k.into(), n)).collect()),
        }
    }

    /// Occurrence count for `key` (0 if absent).
    pub fn get(&self, key: &PatternKey) -> u64 {
        lock(&self.counts).get(key).copied().unwrap_or(0)
    }

    /// Increment `key` and persist. Returns the new count.
    pub fn record_occurrence(&self, key: &PatternKey) -> u64 {
        let mut counts = lock(&self.counts);
        let count = counts.entry(key.clone()).or_insert(0);
        *count = count.saturating_add(1);
        let updated = *count;
        debug!(key = %key, count = updated, "Pattern occurrence recorded");
        self.persist(&counts);
        updated
    }

    /// Increment every key (repeats count once each) with a single snapshot
    /// write. Returns how many increments were applied.
    pub fn record_all(&self, keys: impl IntoIterator<Item = PatternKey>) -> usize {
        let mut counts = lock(&self.counts);
        let mut applied = 0;
        for key in keys {
            let count = counts.entry(key).or_insert(0);
            *count = count.saturating_add(1);
            applied += 1;
        }
        if applied > 0 {
            self.persist(&counts);
        }
        applied
    }

    /// Copy of the whole map, for a booster pass.
    pub fn snapshot(&self) -> BTreeMap<PatternKey, u64> {
        lock(&self.counts).clone()
    }

    /// Administrative reset of one key. Returns the removed count.
    pub fn reset(&self, key: &PatternKey) -> Option<u64> {
        let mut counts = lock(&self.counts);
        let removed = counts.remove(key);
        if removed.is_some() {
            info!(key = %key, "Pattern memory key reset");
            self.persist(&counts);
        }
        removed
    }

    /// Administrative reset of the whole store.
    pub fn reset_all(&self) {
        let mut counts = lock(&self.counts);
        let cleared = counts.len();
        counts.clear();
        info!(cleared, "Pattern memory reset");
        self.persist(&counts);
    }

    pub fn len(&self) -> usize {
        lock(&self.counts).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn persist(&self, counts: &BTreeMap<PatternKey, u64>) {
        let Some(path) = self.path.as_ref() else {
            return;
        };
        if let Err(e) = save_snapshot(path, counts) {
            let err = PipelineError::TransientIo {
                resource: "pattern_memory".to_string(),
                message: format!("{e:#}"),
            };
            warn!(error = %err, "Pattern memory not persisted; in-memory counts kept");
        }
    }
}

/// Read the snapshot, keeping only non-negative integer counts. Entries of
/// any other shape are skipped so newer writers can add fields.
fn load_counts(path: &std::path::Path) -> BTreeMap<PatternKey, u64> {
    let raw: BTreeMap<String, serde_json::Value> = match load_snapshot(path) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            info!(path = %path.display(), "No pattern memory found, starting empty");
            return BTreeMap::new();
        }
        Err(e) => {
            warn!(
                path = %path.display(),
                error = format!("{e:#}"),
                "Pattern memory unreadable, starting empty"
            );
            return BTreeMap::new();
        }
    };

    let total = raw.len();
    let counts: BTreeMap<PatternKey, u64> = raw
        .into_iter()
        .filter_map(|(key, value)| value.as_u64().map(|n| (PatternKey::from(key.as_str()), n)))
        .collect();
    if counts.len() < total {
        debug!(skipped = total - counts.len(), "Ignored non-count pattern memory entries");
    }
    info!(path = %path.display(), patterns = counts.len(), "Pattern memory loaded");
    counts
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
