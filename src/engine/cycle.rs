//! Cycle orchestrator.
//!
//! One `Pipeline` owns the stores and collaborators and runs the sequential
//! pass: fetch → normalise → boost → resolve threshold → dispatch →
//! settle → learn. The per-cycle `CycleConfig` is passed in explicitly, so
//! cycles sharing a pipeline never see each other's settings.

use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::dispatcher::{DispatchRequest, Dispatcher};
use super::refiner::StrategyRefiner;
use super::resolver::resolve_threshold;
use super::tracker::{OutcomeTracker, SettlementSource};
use super::{call_collaborator, CancelToken};
use crate::booster::{BoostedSignal, BoosterChain};
use crate::broker::OrderPlacer;
use crate::config::{CycleConfig, StorageConfig};
use crate::memory::learner::PatternLearner;
use crate::memory::store::PatternMemoryStore;
use crate::notify::Notifier;
use crate::signals::SignalSource;
use crate::storage::approvals::ApprovalQueue;
use crate::storage::execution_log::ExecutionLog;
use crate::storage::signal_log::SignalLog;
use crate::types::{
    ApprovalQueueEntry, CycleReport, ExecutionMode, ExecutionRecord, OrderStatus, Outcome,
    PipelineError, Signal, SignalBatch, Threshold,
};

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// External collaborators the pipeline talks to.
pub struct Collaborators {
    pub source: Arc<dyn SignalSource>,
    pub broker: Arc<dyn OrderPlacer>,
    pub notifier: Arc<dyn Notifier>,
    pub settlement: Arc<dyn SettlementSource>,
}

/// Persistent state shared by every cycle.
#[derive(Clone)]
pub struct Stores {
    pub memory: Arc<PatternMemoryStore>,
    pub log: Arc<ExecutionLog>,
    pub approvals: Arc<ApprovalQueue>,
    pub signal_log: Arc<SignalLog>,
}

impl Stores {
    pub fn open(config: &StorageConfig) -> Self {
        Self {
            memory: Arc::new(PatternMemoryStore::open(config.pattern_memory_path())),
            log: Arc::new(ExecutionLog::open(config.execution_log_path())),
            approvals: Arc::new(ApprovalQueue::open(
                config.approval_queue_path(),
                config.approved_path(),
            )),
            signal_log: Arc::new(SignalLog::open(config.signal_log_path())),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            memory: Arc::new(PatternMemoryStore::in_memory()),
            log: Arc::new(ExecutionLog::in_memory()),
            approvals: Arc::new(ApprovalQueue::in_memory()),
            signal_log: Arc::new(SignalLog::in_memory()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Upper bound on every collaborator call.
    pub collaborator_timeout: Duration,
    /// Where `refine_strategy` writes weights; `None` keeps them in memory.
    pub weights_path: Option<PathBuf>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            collaborator_timeout: Duration::from_millis(5_000),
            weights_path: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct Pipeline {
    source: Arc<dyn SignalSource>,
    stores: Stores,
    dispatcher: Dispatcher,
    tracker: OutcomeTracker,
    learner: PatternLearner,
    refiner: StrategyRefiner,
    timeout: Duration,
}

impl Pipeline {
    pub fn new(collaborators: Collaborators, stores: Stores, options: PipelineOptions) -> Self {
        let timeout = options.collaborator_timeout;
        let refiner = match options.weights_path {
            Some(path) => StrategyRefiner::new(path),
            None => StrategyRefiner::in_memory(),
        };
        Self {
            source: collaborators.source,
            dispatcher: Dispatcher::new(
                collaborators.broker,
                collaborators.notifier,
                Arc::clone(&stores.log),
                timeout,
            ),
            tracker: OutcomeTracker::new(collaborators.settlement, Arc::clone(&stores.log), timeout),
            learner: PatternLearner::new(Arc::clone(&stores.memory)),
            refiner,
            stores,
            timeout,
        }
    }

    /// Fetch one batch from the signal source and process it.
    pub async fn run_cycle(&self, config: &CycleConfig) -> Result<CycleReport> {
        self.run_cycle_with_cancel(config, &CancelToken::new()).await
    }

    /// As `run_cycle`, stopping between symbols once `cancel` fires.
    pub async fn run_cycle_with_cancel(&self, config: &CycleConfig, cancel: &CancelToken) -> Result<CycleReport> {
        let batch = call_collaborator("signal_source", self.timeout, self.source.fetch_signals())
            .await
            .context("Failed to fetch signals")?;
        Ok(self.process_batch(config, &batch, cancel).await)
    }

    /// Run one full pass over an already-fetched batch. Never fails: every
    /// per-symbol or collaborator problem ends up in the report or the log.
    pub async fn process_batch(&self, config: &CycleConfig, batch: &SignalBatch, cancel: &CancelToken) -> CycleReport {
        let cycle_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(
            cycle_id = %cycle_id,
            mode = %config.mode,
            plan = %config.plan,
            signals = batch.len(),
            "Cycle started"
        );

        let signals = self.normalise(config, batch);
        let boosted = self.boost(config, signals);
        let threshold = resolve_threshold(&config.plan, config.override_threshold);

        let manual = config.mode == ExecutionMode::Manual;
        let approved = if manual {
            self.stores.approvals.approved_symbols()
        } else {
            BTreeSet::new()
        };

        let dispatch = self
            .dispatcher
            .dispatch(
                &boosted,
                &DispatchRequest {
                    mode: config.mode,
                    plan: &config.plan,
                    threshold,
                    approved: &approved,
                    commander: &config.commander_name,
                    cancel,
                },
            )
            .await;

        let mut queued_for_approval = 0;
        if manual {
            let consumed = self.stores.approvals.consume(&approved);
            debug!(consumed = consumed.len(), "Approved set consumed");
            if threshold != Threshold::Blocked {
                queued_for_approval = self.stores.approvals.queue_batch(&dispatch.skipped);
            }
        }

        self.log_signals(&boosted, &dispatch.records, threshold);

        let resolved = self.tracker.resolve(&dispatch.records).await;
        let patterns_learned = self.learner.learn(&resolved);
        let wins = resolved.iter().filter(|r| r.outcome == Outcome::Win).count();
        let losses = resolved.iter().filter(|r| r.outcome == Outcome::Loss).count();

        let report = CycleReport {
            cycle_id,
            started_at,
            mode: config.mode,
            plan: config.plan.clone(),
            threshold,
            signals_in: batch.len(),
            boosted: boosted.into_iter().map(|b| b.signal).collect(),
            dispatched: dispatch.records,
            events: dispatch.events,
            queued_for_approval,
            wins,
            losses,
            patterns_learned,
            cancelled: dispatch.cancelled,
        };
        debug!(%report, "Cycle report");
        report
    }

    fn normalise(&self, config: &CycleConfig, batch: &SignalBatch) -> Vec<Signal> {
        let mut signals = Vec::with_capacity(batch.len());
        for (symbol, raw) in batch {
            let (signal, issues) = raw.normalise(symbol);
            for issue in issues {
                warn!(error = %issue, "Signal field defaulted");
            }
            signals.push(signal);
        }

        if config.min_signal_confidence > 0 {
            let before = signals.len();
            signals.retain(|s| s.confidence >= config.min_signal_confidence);
            if signals.len() < before {
                info!(
                    dropped = before - signals.len(),
                    floor = config.min_signal_confidence,
                    "Signals below confidence floor dropped"
                );
            }
        }
        signals
    }

    fn boost(&self, config: &CycleConfig, signals: Vec<Signal>) -> Vec<BoostedSignal> {
        if config.boost_enabled {
            BoosterChain::new(self.stores.memory.snapshot()).boost_batch(&signals)
        } else {
            info!(count = signals.len(), "Booster chain disabled, signals pass unchanged");
            signals.into_iter().map(BoostedSignal::unboosted).collect()
        }
    }

    fn log_signals(&self, boosted: &[BoostedSignal], records: &[ExecutionRecord], threshold: Threshold) {
        let status: BTreeMap<&str, OrderStatus> = records
            .iter()
            .map(|r| (r.symbol.as_str(), r.order_status))
            .collect();

        self.stores.signal_log.record(boosted.iter().map(|b| {
            let action = match status.get(b.signal.symbol.as_str()) {
                Some(OrderStatus::Placed) => "dispatched",
                Some(OrderStatus::Failed) => "order_failed",
                None if threshold == Threshold::Blocked => "blocked",
                None => "skipped",
            };
            (&b.signal, action)
        }));
    }

    // -- operator actions --

    pub fn approve(&self, symbol: &str) -> Result<ApprovalQueueEntry, PipelineError> {
        self.stores.approvals.approve(symbol)
    }

    pub fn reject(&self, symbol: &str) -> Result<ApprovalQueueEntry, PipelineError> {
        self.stores.approvals.reject(symbol)
    }

    pub fn get_approval_queue(&self) -> Vec<ApprovalQueueEntry> {
        self.stores.approvals.queue()
    }

    /// Ask settlement about every record still awaiting an outcome, from
    /// any cycle, and learn from whatever resolves.
    pub async fn resolve_pending(&self) -> Vec<ExecutionRecord> {
        let pending = self.stores.log.awaiting_settlement();
        if pending.is_empty() {
            return Vec::new();
        }
        let resolved = self.tracker.resolve(&pending).await;
        self.learner.learn(&resolved);
        resolved
    }

    /// Recompute and persist per-symbol win ratios.
    pub fn refine_strategy(&self) -> BTreeMap<String, f64> {
        self.refiner.refine_and_save(&self.stores.log.records())
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
