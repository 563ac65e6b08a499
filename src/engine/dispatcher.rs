//! Execution dispatcher.
//!
//! Gates boosted signals by threshold (and, in manual mode, by the approved
//! set) and turns each admitted signal into an execution record, an order
//! and a notification. Collaborator failures are recorded on the report and
//! never stop the rest of the batch.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{call_collaborator, CancelToken};
use crate::booster::BoostedSignal;
use crate::broker::OrderPlacer;
use crate::notify::{format_trade_message, Notifier};
use crate::storage::execution_log::ExecutionLog;
use crate::types::{
    DispatchEvent, ExecutionMode, ExecutionRecord, OrderStatus, PlanTier, Signal, Threshold,
    TradeIntent,
};

// ---------------------------------------------------------------------------
// Request / report
// ---------------------------------------------------------------------------

/// Per-cycle gating inputs.
pub struct DispatchRequest<'a> {
    pub mode: ExecutionMode,
    pub plan: &'a PlanTier,
    pub threshold: Threshold,
    /// Symbols the operator has approved (manual mode only).
    pub approved: &'a BTreeSet<String>,
    pub commander: &'a str,
    pub cancel: &'a CancelToken,
}

/// Result of dispatching one batch.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub records: Vec<ExecutionRecord>,
    pub events: Vec<DispatchEvent>,
    /// Signals that were not dispatched, in batch order.
    pub skipped: Vec<Signal>,
    pub cancelled: bool,
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct Dispatcher {
    broker: Arc<dyn OrderPlacer>,
    notifier: Arc<dyn Notifier>,
    log: Arc<ExecutionLog>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        broker: Arc<dyn OrderPlacer>,
        notifier: Arc<dyn Notifier>,
        log: Arc<ExecutionLog>,
        timeout: Duration,
    ) -> Self {
        Self {
            broker,
            notifier,
            log,
            timeout,
        }
    }

    pub async fn dispatch(&self, batch: &[BoostedSignal], request: &DispatchRequest<'_>) -> DispatchReport {
        let mut report = DispatchReport::default();

        let min = match request.threshold {
            Threshold::Blocked => {
                warn!(plan = %request.plan, signals = batch.len(), "Plan tier blocks execution");
                report.events.push(DispatchEvent::TierBlocked {
                    plan: request.plan.to_string(),
                    signals: batch.len(),
                });
                report.skipped = batch.iter().map(|b| b.signal.clone()).collect();
                return report;
            }
            Threshold::Min(min) => min,
        };

        let manual = request.mode == ExecutionMode::Manual;
        if manual {
            for symbol in request.approved {
                if !batch.iter().any(|b| &b.signal.symbol == symbol) {
                    warn!(symbol = %symbol, "Approved symbol not in current batch, skipping");
                    report.events.push(DispatchEvent::StaleApproval {
                        symbol: symbol.clone(),
                    });
                }
            }
        }

        for (index, boosted) in batch.iter().enumerate() {
            if request.cancel.is_cancelled() {
                let remaining = batch.len() - index;
                info!(remaining, "Dispatch cancelled");
                report.events.push(DispatchEvent::Cancelled { remaining });
                report
                    .skipped
                    .extend(batch[index..].iter().map(|b| b.signal.clone()));
                report.cancelled = true;
                break;
            }

            let signal = &boosted.signal;
            if signal.confidence < min {
                info!(
                    symbol = %signal.symbol,
                    confidence = signal.confidence,
                    threshold = min,
                    "Below threshold, not dispatched"
                );
                report.events.push(DispatchEvent::BelowThreshold {
                    symbol: signal.symbol.clone(),
                    confidence: signal.confidence,
                    threshold: min,
                });
                report.skipped.push(signal.clone());
                continue;
            }

            if manual && !request.approved.contains(&signal.symbol) {
                debug!(symbol = %signal.symbol, "Awaiting manual approval");
                report.events.push(DispatchEvent::NotApproved {
                    symbol: signal.symbol.clone(),
                });
                report.skipped.push(signal.clone());
                continue;
            }

            let record = self.dispatch_one(boosted, request, &mut report.events).await;
            report.records.push(record);
        }

        info!(
            dispatched = report.records.len(),
            skipped = report.skipped.len(),
            "Dispatch complete"
        );
        report
    }

    /// Record, place and announce one admitted signal.
    async fn dispatch_one(
        &self,
        boosted: &BoostedSignal,
        request: &DispatchRequest<'_>,
        events: &mut Vec<DispatchEvent>,
    ) -> ExecutionRecord {
        let signal = &boosted.signal;
        let mut record = ExecutionRecord::from_signal(signal, request.mode);
        let intent = TradeIntent::from_signal(signal, request.mode);

        let placed = match call_collaborator("broker", self.timeout, self.broker.place_order(&intent)).await {
            Ok(()) => true,
            Err(e) => {
                warn!(symbol = %signal.symbol, error = %e, "Order placement failed");
                record.order_status = OrderStatus::Failed;
                events.push(DispatchEvent::OrderFailed {
                    symbol: signal.symbol.clone(),
                    error: e.to_string(),
                });
                false
            }
        };

        let message = format_trade_message(request.commander, boosted, request.mode, placed);
        if let Err(e) = call_collaborator("notifier", self.timeout, self.notifier.notify(&message)).await {
            warn!(symbol = %signal.symbol, error = %e, "Notification failed");
            events.push(DispatchEvent::NotifyFailed {
                symbol: signal.symbol.clone(),
                error: e.to_string(),
            });
        }

        self.log.append(record.clone());
        events.push(DispatchEvent::Dispatched {
            symbol: signal.symbol.clone(),
            confidence: signal.confidence,
        });
        record
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
