//! Signal sources.
//!
//! Defines the `SignalSource` trait (one batch of raw per-symbol opinions
//! per cycle) and provides:
//! - `JsonFileSignalSource`: reads a `symbol → record` JSON object from disk
//! - `StaticSignalSource`: a fixed, replaceable batch for tests and demos

pub mod cache;

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::storage::lock;
use crate::types::{PipelineError, RawSignal, SignalBatch};

/// Producer of raw signals, queried once per cycle.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SignalSource: Send + Sync {
    async fn fetch_signals(&self) -> Result<SignalBatch>;
}

// ---------------------------------------------------------------------------
// JSON file source
// ---------------------------------------------------------------------------

/// Reads the batch written by an external indicator job.
///
/// The file must be a JSON object. Entries that are not objects are kept
/// as empty records so the normaliser defaults them like any other
/// malformed signal.
pub struct JsonFileSignalSource {
    path: PathBuf,
}

impl JsonFileSignalSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn parse(contents: &str) -> Result<SignalBatch> {
        let raw: BTreeMap<String, serde_json::Value> =
            serde_json::from_str(contents).context("Signal file is not a JSON object")?;

        Ok(raw
            .into_iter()
            .map(|(symbol, value)| {
                let signal = serde_json::from_value::<RawSignal>(value).unwrap_or_else(|e| {
                    let err = PipelineError::Data {
                        symbol: symbol.clone(),
                        message: e.to_string(),
                    };
                    warn!(error = %err, "Unreadable signal entry, defaulting");
                    RawSignal::default()
                });
                (symbol, signal)
            })
            .collect())
    }
}

#[async_trait]
impl SignalSource for JsonFileSignalSource {
    async fn fetch_signals(&self) -> Result<SignalBatch> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read signal file: {}", self.path.display()))?;
        let batch = Self::parse(&contents)?;
        debug!(path = %self.path.display(), symbols = batch.len(), "Signals fetched");
        Ok(batch)
    }
}

// ---------------------------------------------------------------------------
// Static source
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct StaticSignalSource {
    batch: Mutex<SignalBatch>,
}

impl StaticSignalSource {
    pub fn new(batch: SignalBatch) -> Self {
        Self {
            batch: Mutex::new(batch),
        }
    }

    /// Replace the batch returned by later fetches.
    pub fn set(&self, batch: SignalBatch) {
        *lock(&self.batch) = batch;
    }
}

#[async_trait]
impl SignalSource for StaticSignalSource {
    async fn fetch_signals(&self) -> Result<SignalBatch> {
        Ok(lock(&self.batch).clone())
    }
}
