//! Runtime helpers and wake-up signalling for the sync loop.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use super::{BackoffJitter, SyncSleeper};

/// Runtime helpers used by the backoff policy.
pub struct SyncLoopRuntime {
    /// Async sleep implementation.
    pub sleeper: Arc<dyn SyncSleeper>,
    /// Jitter strategy for retry delays.
    pub jitter: Arc<dyn BackoffJitter>,
}

impl Default for SyncLoopRuntime {
    fn default() -> Self {
        Self {
            sleeper: Arc::new(TokioSleeper),
            jitter: Arc::new(BatchJitter),
        }
    }
}

/// Tokio-based sleeper implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl SyncSleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Equal jitter: waits somewhere between half the base delay and all of it.
///
/// Never exceeds `base`, so the loop's ceiling stays a true ceiling.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchJitter;

impl BackoffJitter for BatchJitter {
    fn jittered_delay(&self, base: Duration, seed: u64) -> Duration {
        let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
        let floor = base_ms / 2;
        let spread = base_ms - floor;
        Duration::from_millis(floor + seed % spread.saturating_add(1))
    }
}

/// Wakes an idle sync loop early.
///
/// Local writes and connectivity changes call [`SyncTrigger::notify`]. A
/// notification sent while the loop is busy is remembered, so the loop
/// checks the queue again as soon as it goes idle.
#[derive(Debug, Clone, Default)]
pub struct SyncTrigger(Arc<Notify>);

impl SyncTrigger {
    /// Fresh trigger with no pending notification.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to look at the queue now.
    pub fn notify(&self) {
        self.0.notify_one();
    }

    /// Wait for the next notification.
    pub async fn notified(&self) {
        self.0.notified().await;
    }
}
