//! Order placement.
//!
//! Defines the `OrderPlacer` trait the dispatcher forwards trade intents to.
//! The pipeline only cares whether the broker accepted the intent; broker
//! payloads are never interpreted here.
//! - `DryRunBroker`: logs and accepts locally (default)
//! - `WebhookBroker`: POSTs the intent as JSON to an order-routing endpoint

pub mod webhook;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

use crate::types::TradeIntent;

/// Abstraction over order-placement backends.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderPlacer: Send + Sync {
    /// Forward one trade intent. `Ok` means the backend accepted it.
    async fn place_order(&self, intent: &TradeIntent) -> Result<()>;
}

/// Accepts every intent without routing it anywhere.
#[derive(Debug, Default)]
pub struct DryRunBroker {
    staged: AtomicUsize,
}

impl DryRunBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intents accepted so far.
    pub fn staged(&self) -> usize {
        self.staged.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl OrderPlacer for DryRunBroker {
    async fn place_order(&self, intent: &TradeIntent) -> Result<()> {
        self.staged.fetch_add(1, Ordering::Relaxed);
        info!(
            symbol = %intent.symbol,
            direction = %intent.direction,
            confidence = intent.confidence,
            mode = %intent.mode,
            "[DRY RUN] Order staged"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Direction, ExecutionMode, Signal};

    #[test]
    fn test_dry_run_accepts_and_counts() {
        let broker = DryRunBroker::new();
        let signal = Signal::new("BTCUSDT", Direction::Buy, 90, "RSI oversold");
        let intent = TradeIntent::from_signal(&signal, ExecutionMode::Auto);

        tokio_test::block_on(broker.place_order(&intent)).unwrap();
        tokio_test::block_on(broker.place_order(&intent)).unwrap();
        assert_eq!(broker.staged(), 2);
    }
}
