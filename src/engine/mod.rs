//! Core engine: the boost → gate → dispatch → resolve → learn cycle.

pub mod cycle;
pub mod dispatcher;
pub mod refiner;
pub mod resolver;
pub mod tracker;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use crate::types::PipelineError;

/// Cooperative cancellation for a running cycle.
///
/// The engine checks the token between symbols only, so a symbol that has
/// started dispatching always finishes.
#[derive(Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Await a collaborator call under `timeout`, mapping both failure shapes
/// into the domain taxonomy.
pub(crate) async fn call_collaborator<T, F>(
    collaborator: &str,
    timeout: Duration,
    fut: F,
) -> Result<T, PipelineError>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(PipelineError::Collaborator {
            collaborator: collaborator.to_string(),
            message: format!("{e:#}"),
        }),
        Err(_) => Err(PipelineError::Timeout {
            collaborator: collaborator.to_string(),
            millis: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}
