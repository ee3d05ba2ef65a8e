//! Background sync loop driving the write-queue uploader.
//!
//! The loop keeps uploading while batches commit, waits for the poll interval
//! or a [`SyncTrigger`] once the queue is empty, and backs off exponentially
//! with jitter after a rollback or a queue failure. A rollback the remote
//! will never accept as is marks the loop as blocked on that mutation and
//! backs off at the ceiling straight away.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use tracing::{debug, info, warn};

use uuid::Uuid;

use crate::domain::uploader::{ApplyFailure, UploadOutcome, WriteQueueUploader};

mod runtime;

pub use runtime::{BatchJitter, SyncLoopRuntime, SyncTrigger, TokioSleeper};

/// Loop timing configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncLoopConfig {
    /// How long an idle loop waits before polling the queue again.
    pub poll_interval: Duration,
    /// Delay after the first consecutive failure.
    pub initial_backoff: Duration,
    /// Upper bound for any backoff delay.
    pub max_backoff: Duration,
}

impl Default for SyncLoopConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(60),
        }
    }
}

/// Async clock-independent sleeping abstraction.
#[async_trait]
pub trait SyncSleeper: Send + Sync {
    /// Suspend execution for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Retry backoff jitter abstraction.
pub trait BackoffJitter: Send + Sync {
    /// Spread the exponential `base` delay using `seed`.
    ///
    /// The loop seeds from the id of the batch that rolled back, so clients
    /// failing at the same moment still retry at different times.
    ///
    /// ```rust
    /// use client::domain::BackoffJitter;
    /// use std::time::Duration;
    /// struct SeedMillis;
    /// impl BackoffJitter for SeedMillis {
    ///     fn jittered_delay(&self, base: Duration, seed: u64) -> Duration {
    ///         base + Duration::from_millis(seed % 10)
    ///     }
    /// }
    /// let delay = SeedMillis.jittered_delay(Duration::from_millis(100), 23);
    /// assert_eq!(delay, Duration::from_millis(103));
    /// ```
    fn jittered_delay(&self, base: Duration, seed: u64) -> Duration;
}

/// What the loop does after one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStep {
    /// A batch committed; look for the next one straight away.
    Continue,
    /// The queue is empty; wait for the poll interval or a trigger.
    WaitForWork,
    /// The tick failed; sleep this long before retrying.
    Backoff(Duration),
}

/// Point-in-time view of the loop's progress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStatus {
    /// Queue depth after the last tick, when it could be read.
    pub pending: Option<u64>,
    /// Batches committed since start.
    pub committed_batches: u64,
    /// Failed ticks since the last success.
    pub consecutive_failures: u32,
    /// When a batch last committed.
    pub last_success_at: Option<DateTime<Utc>>,
    /// Message of the most recent failure.
    pub last_error: Option<String>,
    /// Queue position of a mutation the remote refuses for good.
    ///
    /// Uploads cannot get past it until the conflicting local or remote
    /// data changes. Cleared by the next commit.
    pub blocked_op_id: Option<i64>,
}

/// Domain-owned sync loop.
pub struct SyncLoop {
    uploader: Arc<WriteQueueUploader>,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn SyncSleeper>,
    jitter: Arc<dyn BackoffJitter>,
    trigger: SyncTrigger,
    config: SyncLoopConfig,
    status: Mutex<SyncStatus>,
}

impl SyncLoop {
    /// Build a loop using default runtime dependencies.
    pub fn new(
        uploader: Arc<WriteQueueUploader>,
        clock: Arc<dyn Clock>,
        trigger: SyncTrigger,
        config: SyncLoopConfig,
    ) -> Self {
        Self::with_runtime(uploader, clock, trigger, SyncLoopRuntime::default(), config)
    }

    /// Build a loop with injected runtime abstractions.
    pub fn with_runtime(
        uploader: Arc<WriteQueueUploader>,
        clock: Arc<dyn Clock>,
        trigger: SyncTrigger,
        runtime: SyncLoopRuntime,
        config: SyncLoopConfig,
    ) -> Self {
        Self {
            uploader,
            clock,
            sleeper: runtime.sleeper,
            jitter: runtime.jitter,
            trigger,
            config,
            status: Mutex::new(SyncStatus::default()),
        }
    }

    /// Trigger that wakes this loop.
    pub fn trigger(&self) -> SyncTrigger {
        self.trigger.clone()
    }

    /// Snapshot of the loop's progress.
    pub fn status(&self) -> SyncStatus {
        self.lock_status().clone()
    }

    /// Run one upload and decide what to do next.
    pub async fn tick(&self) -> SyncStep {
        let step = match self.uploader.upload_next().await {
            Ok(UploadOutcome::Committed {
                batch_id, applied, ..
            }) => {
                debug!(%batch_id, applied, "sync tick committed");
                let mut status = self.lock_status();
                status.committed_batches += 1;
                status.consecutive_failures = 0;
                status.last_success_at = Some(self.clock.utc());
                status.last_error = None;
                status.blocked_op_id = None;
                SyncStep::Continue
            }
            Ok(UploadOutcome::Idle) => SyncStep::WaitForWork,
            Ok(UploadOutcome::RolledBack {
                batch_id, failure, ..
            }) => self.record_rollback(batch_id, &failure),
            Err(error) => {
                let seed = u64::from(self.clock.utc().timestamp_subsec_nanos());
                self.record_failure(error.to_string(), seed, false)
            }
        };

        match self.uploader.pending_count().await {
            Ok(pending) => self.lock_status().pending = Some(pending),
            Err(error) => debug!(error = %error, "could not read queue depth"),
        }
        step
    }

    /// Run until `shutdown` resolves.
    ///
    /// An in-flight batch is dropped uncommitted when shutdown wins the race;
    /// its mutations stay queued.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);
        info!("sync loop started");

        loop {
            let step = tokio::select! {
                () = &mut shutdown => break,
                step = self.tick() => step,
            };

            match step {
                SyncStep::Continue => {}
                SyncStep::WaitForWork => {
                    tokio::select! {
                        () = &mut shutdown => break,
                        () = self.sleeper.sleep(self.config.poll_interval) => {}
                        () = self.trigger.notified() => {}
                    }
                }
                SyncStep::Backoff(delay) => {
                    tokio::select! {
                        () = &mut shutdown => break,
                        () = self.sleeper.sleep(delay) => {}
                    }
                }
            }
        }

        info!("sync loop stopped");
    }

    fn record_rollback(&self, batch_id: Uuid, failure: &ApplyFailure) -> SyncStep {
        let (high, low) = batch_id.as_u64_pair();
        let permanent = !failure.reason.is_retryable();
        if permanent {
            warn!(
                op_id = failure.op_id,
                table = %failure.table,
                error = %failure.reason,
                "remote refuses queued mutation; uploads are blocked"
            );
        }
        self.lock_status().blocked_op_id = permanent.then_some(failure.op_id);
        self.record_failure(failure.to_string(), high ^ low, permanent)
    }

    fn record_failure(&self, message: String, seed: u64, permanent: bool) -> SyncStep {
        let attempt = {
            let mut status = self.lock_status();
            status.consecutive_failures = status.consecutive_failures.saturating_add(1);
            status.last_error = Some(message.clone());
            status.consecutive_failures
        };
        let base = if permanent {
            self.config.max_backoff
        } else {
            self.retry_base_delay(attempt)
        };
        let delay = self
            .jitter
            .jittered_delay(base, seed)
            .min(self.config.max_backoff);
        warn!(
            error = %message,
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "sync tick failed; backing off"
        );
        SyncStep::Backoff(delay)
    }

    fn retry_base_delay(&self, attempt: u32) -> Duration {
        let exponent = 2_u32.saturating_pow(attempt.saturating_sub(1));
        let base_ms = u64::try_from(self.config.initial_backoff.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.config.max_backoff.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(base_ms.saturating_mul(u64::from(exponent)).min(max_ms))
    }

    fn lock_status(&self) -> MutexGuard<'_, SyncStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
