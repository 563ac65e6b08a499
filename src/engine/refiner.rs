//! Strategy refiner.
//!
//! Recomputes per-symbol win ratios from the whole execution history and
//! writes them as a fresh snapshot. Informational only; nothing in the
//! booster chain reads the weights.

use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::storage::save_snapshot;
use crate::types::{ExecutionRecord, Outcome, PipelineError};

pub struct StrategyRefiner {
    output: Option<PathBuf>,
}

impl StrategyRefiner {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: Some(output.into()),
        }
    }

    /// A refiner that only computes.
    pub fn in_memory() -> Self {
        Self { output: None }
    }

    /// `wins / (wins + losses)` per symbol, rounded to two decimals.
    /// Symbols with only pending records get 0.0.
    pub fn refine(records: &[ExecutionRecord]) -> BTreeMap<String, f64> {
        let mut tally: BTreeMap<&str, (u32, u32)> = BTreeMap::new();
        for record in records {
            let entry = tally.entry(record.symbol.as_str()).or_default();
            match record.outcome {
                Outcome::Win => entry.0 += 1,
                Outcome::Loss => entry.1 += 1,
                Outcome::Pending => {}
            }
        }

        tally
            .into_iter()
            .map(|(symbol, (wins, losses))| {
                let decided = wins + losses;
                let ratio = if decided == 0 {
                    0.0
                } else {
                    (f64::from(wins) / f64::from(decided) * 100.0).round() / 100.0
                };
                (symbol.to_string(), ratio)
            })
            .collect()
    }

    /// Compute and overwrite the weights snapshot. A failed write is logged;
    /// the computed weights are returned either way.
    pub fn refine_and_save(&self, records: &[ExecutionRecord]) -> BTreeMap<String, f64> {
        let weights = Self::refine(records);
        if let Some(path) = self.output.as_ref() {
            if let Err(e) = save_snapshot(path, &weights) {
                let err = PipelineError::TransientIo {
                    resource: "signal_weights".to_string(),
                    message: format!("{e:#}"),
                };
                warn!(error = %err, "Strategy weights not persisted");
            }
        }
        info!(symbols = weights.len(), "Strategy weights refreshed");
        weights
    }
}
