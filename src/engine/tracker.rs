//! Outcome tracker.
//!
//! Asks a settlement source how each dispatched trade ended and resolves
//! the matching execution record exactly once. The settlement source is a
//! seam: the placeholder rule below stands in until real fills are wired.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::call_collaborator;
use crate::storage::execution_log::ExecutionLog;
use crate::types::{Direction, ExecutionRecord, Outcome};

/// Minimum confidence the placeholder rule counts as a win.
pub const PLACEHOLDER_WIN_CONFIDENCE: u8 = 85;

/// Source of truth for how a dispatched trade ended.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SettlementSource: Send + Sync {
    /// `Ok(None)` means the trade has not settled yet.
    async fn settle(&self, record: &ExecutionRecord) -> Result<Option<Outcome>>;
}

/// Win iff BUY at confidence ≥ 85, loss otherwise. Not market truth.
#[derive(Debug, Default)]
pub struct PlaceholderSettlement;

#[async_trait]
impl SettlementSource for PlaceholderSettlement {
    async fn settle(&self, record: &ExecutionRecord) -> Result<Option<Outcome>> {
        let outcome = if record.direction == Direction::Buy
            && record.confidence >= PLACEHOLDER_WIN_CONFIDENCE
        {
            Outcome::Win
        } else {
            Outcome::Loss
        };
        Ok(Some(outcome))
    }
}

pub struct OutcomeTracker {
    settlement: Arc<dyn SettlementSource>,
    log: Arc<ExecutionLog>,
    timeout: Duration,
}

impl OutcomeTracker {
    pub fn new(settlement: Arc<dyn SettlementSource>, log: Arc<ExecutionLog>, timeout: Duration) -> Self {
        Self {
            settlement,
            log,
            timeout,
        }
    }

    /// Resolve every record in `records` that is pending with a placed
    /// order. Returns the records resolved by this call.
    pub async fn resolve(&self, records: &[ExecutionRecord]) -> Vec<ExecutionRecord> {
        let mut resolved = Vec::new();

        for record in records.iter().filter(|r| r.is_awaiting_settlement()) {
            let outcome = match call_collaborator("settlement", self.timeout, self.settlement.settle(record)).await {
                Ok(Some(outcome)) if outcome != Outcome::Pending => outcome,
                Ok(_) => {
                    debug!(id = %record.id, symbol = %record.symbol, "Not settled yet");
                    continue;
                }
                Err(e) => {
                    warn!(id = %record.id, symbol = %record.symbol, error = %e, "Settlement lookup failed");
                    continue;
                }
            };

            match self.log.resolve(record.id, outcome) {
                Ok(updated) => {
                    debug!(symbol = %updated.symbol, outcome = %updated.outcome, "Outcome resolved");
                    resolved.push(updated);
                }
                Err(e) => warn!(id = %record.id, error = %e, "Outcome not applied"),
            }
        }

        if !resolved.is_empty() {
            info!(
                resolved = resolved.len(),
                wins = resolved.iter().filter(|r| r.outcome == Outcome::Win).count(),
                "Outcomes resolved"
            );
        }
        resolved
    }
}
