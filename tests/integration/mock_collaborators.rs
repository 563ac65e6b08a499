//! Deterministic collaborators for integration testing.
//!
//! Every mock records what it was asked to do and can be forced to fail,
//! all in-memory with no external dependencies.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tradenet::broker::OrderPlacer;
use tradenet::notify::Notifier;
use tradenet::types::*;

/// Order placer that records every intent it receives.
#[derive(Clone, Default)]
pub struct MockBroker {
    orders: Arc<Mutex<Vec<TradeIntent>>>,
    /// If set, every order is rejected with this message.
    force_error: Arc<Mutex<Option<String>>>,
    /// Symbols rejected regardless of `force_error`.
    reject_symbols: Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
}

impl MockBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A broker that takes `delay` to answer each order.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }

    pub fn reject(&self, symbol: &str) {
        self.reject_symbols.lock().unwrap().push(symbol.to_string());
    }

    pub fn orders(&self) -> Vec<TradeIntent> {
        self.orders.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderPlacer for MockBroker {
    async fn place_order(&self, intent: &TradeIntent) -> Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(ref msg) = *self.force_error.lock().unwrap() {
            return Err(anyhow!("{msg}"));
        }
        if self.reject_symbols.lock().unwrap().contains(&intent.symbol) {
            return Err(anyhow!("order rejected for {}", intent.symbol));
        }
        self.orders.lock().unwrap().push(intent.clone());
        Ok(())
    }
}

/// Notifier that keeps every message.
#[derive(Clone, Default)]
pub struct MockNotifier {
    messages: Arc<Mutex<Vec<String>>>,
    force_error: Arc<Mutex<Option<String>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        if let Some(ref msg) = *self.force_error.lock().unwrap() {
            return Err(anyhow!("{msg}"));
        }
        self.messages.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

/// Build a batch from `(symbol, direction, confidence, reason)` tuples.
pub fn batch(entries: &[(&str, Direction, i64, &str)]) -> SignalBatch {
    entries
        .iter()
        .map(|(symbol, direction, confidence, reason)| {
            (symbol.to_string(), RawSignal::new(*direction, *confidence, reason))
        })
        .collect()
}
