//! Write-queue uploader: replays pending mutations against the remote store.
//!
//! The uploader drains one bounded batch at a time, applies its mutations
//! strictly in queue order and then either commits (evicting them from the
//! local queue) or rolls back (leaving every one queued). It never retries on
//! its own; the sync loop decides when to call again.
//!
//! [`WriteQueueUploader::upload_next`] holds the in-flight lock for a whole
//! cycle. The step methods it is built from take no lock: a caller driving
//! them by hand must not overlap two cycles on the same queue, or both can
//! drain and replay the same head of the queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::ports::{MutationQueue, RemoteStore, RemoteStoreError};
use crate::domain::{
    BatchState, PendingMutation, RemoteOperation, TableMap, UnmappedTablePolicy, UploadBatch,
};

mod outcome;

pub use outcome::{
    ApplyFailure, ApplyFailureReason, ApplyReport, DrainReport, SkippedMutation, UploadError,
    UploadOutcome,
};

/// Largest batch the uploader drains at once.
///
/// Keeps a batch, and the queue statements that evict it, well inside
/// SQLite's bound-variable limit.
pub const MAX_BATCH_SIZE: usize = 1_000;

/// Uploader configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteQueueUploaderConfig {
    /// Maximum mutations drained per batch, clamped to `1..=MAX_BATCH_SIZE`.
    pub batch_size: usize,
    /// Deadline for each remote call.
    pub call_timeout: Duration,
    /// Handling of mutations for tables with no remote resource.
    pub unmapped_table_policy: UnmappedTablePolicy,
}

impl Default for WriteQueueUploaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            call_timeout: Duration::from_secs(10),
            unmapped_table_policy: UnmappedTablePolicy::Skip,
        }
    }
}

/// Port bundle required by the uploader.
pub struct WriteQueueUploaderPorts {
    /// Local queue of pending mutations.
    pub queue: Arc<dyn MutationQueue>,
    /// Remote store adapter.
    pub remote: Arc<dyn RemoteStore>,
}

impl WriteQueueUploaderPorts {
    /// Build a strongly-typed uploader port bundle.
    pub fn new(queue: Arc<dyn MutationQueue>, remote: Arc<dyn RemoteStore>) -> Self {
        Self { queue, remote }
    }
}

/// Domain-owned write-queue uploader.
pub struct WriteQueueUploader {
    queue: Arc<dyn MutationQueue>,
    remote: Arc<dyn RemoteStore>,
    table_map: TableMap,
    config: WriteQueueUploaderConfig,
    in_flight: Mutex<()>,
}

impl WriteQueueUploader {
    /// Build an uploader over the todo table map.
    pub fn new(ports: WriteQueueUploaderPorts, config: WriteQueueUploaderConfig) -> Self {
        Self::with_table_map(ports, TableMap::todo_tables(), config)
    }

    /// Build an uploader with a custom table map.
    pub fn with_table_map(
        ports: WriteQueueUploaderPorts,
        table_map: TableMap,
        config: WriteQueueUploaderConfig,
    ) -> Self {
        Self {
            queue: ports.queue,
            remote: ports.remote,
            table_map,
            config,
            in_flight: Mutex::new(()),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &WriteQueueUploaderConfig {
        &self.config
    }

    /// Fetch the next batch, or `None` when nothing is queued.
    ///
    /// Not serialised; see the module docs.
    pub async fn drain_next_batch(&self) -> Result<Option<UploadBatch>, UploadError> {
        let limit = self.config.batch_size.clamp(1, MAX_BATCH_SIZE);
        let batch = self.queue.next_batch(limit).await?;
        if let Some(batch) = &batch {
            debug!(
                batch_id = %batch.id(),
                batch_size = batch.len(),
                "drained upload batch"
            );
        }
        Ok(batch)
    }

    /// Apply every mutation of `batch` in queue order.
    ///
    /// Stops at the first failure, records it on the batch and returns
    /// [`UploadError::Apply`]; the caller must then roll the batch back.
    ///
    /// Not serialised; see the module docs.
    pub async fn apply_batch(&self, batch: &mut UploadBatch) -> Result<ApplyReport, UploadError> {
        batch.transition(BatchState::Applying)?;
        let mut report = ApplyReport::default();
        let mut failure = None;

        for mutation in batch.mutations() {
            match self.apply_one(mutation).await {
                Ok(true) => report.applied += 1,
                Ok(false) => report.skipped.push(SkippedMutation {
                    op_id: mutation.op_id,
                    table: mutation.table.clone(),
                }),
                Err(reason) => {
                    failure = Some(ApplyFailure {
                        op_id: mutation.op_id,
                        kind: mutation.kind,
                        table: mutation.table.clone(),
                        record_id: mutation.record_id.clone(),
                        reason,
                    });
                    break;
                }
            }
        }

        match failure {
            Some(failure) => {
                batch.record_failure(failure.op_id);
                Err(UploadError::Apply(failure))
            }
            None => Ok(report),
        }
    }

    /// Evict a fully applied batch from the queue.
    ///
    /// Not serialised; see the module docs.
    pub async fn commit(&self, batch: &mut UploadBatch) -> Result<(), UploadError> {
        batch.ensure_can_transition(BatchState::Committed)?;
        self.queue.commit(batch).await?;
        batch.transition(BatchState::Committed)?;
        info!(
            batch_id = %batch.id(),
            batch_size = batch.len(),
            "committed upload batch"
        );
        Ok(())
    }

    /// Abandon a batch, keeping all of its mutations queued.
    ///
    /// Not serialised; see the module docs.
    pub async fn rollback(&self, batch: &mut UploadBatch) -> Result<(), UploadError> {
        batch.transition(BatchState::RolledBack)?;
        warn!(
            batch_id = %batch.id(),
            batch_size = batch.len(),
            op_id = batch.failed_op_id(),
            "rolled back upload batch"
        );
        self.queue.rollback(batch).await?;
        Ok(())
    }

    /// Run one drain, apply, commit-or-rollback cycle.
    ///
    /// Calls are serialised so at most one batch is in flight.
    pub async fn upload_next(&self) -> Result<UploadOutcome, UploadError> {
        let _in_flight = self.in_flight.lock().await;

        let Some(mut batch) = self.drain_next_batch().await? else {
            return Ok(UploadOutcome::Idle);
        };

        match self.apply_batch(&mut batch).await {
            Ok(report) => {
                self.commit(&mut batch).await?;
                Ok(UploadOutcome::Committed {
                    batch_id: batch.id(),
                    applied: report.applied,
                    skipped: report.skipped.len(),
                })
            }
            Err(UploadError::Apply(failure)) => {
                warn!(
                    op_id = failure.op_id,
                    table = %failure.table,
                    error = %failure.reason,
                    "mutation failed to apply"
                );
                self.rollback(&mut batch).await?;
                Ok(UploadOutcome::RolledBack {
                    batch_id: batch.id(),
                    batch_size: batch.len(),
                    failure,
                })
            }
            Err(other) => Err(other),
        }
    }

    /// Upload batches until the queue is empty or a batch rolls back.
    pub async fn drain_until_idle(&self) -> Result<DrainReport, UploadError> {
        let mut report = DrainReport::default();
        loop {
            match self.upload_next().await? {
                UploadOutcome::Idle => return Ok(report),
                UploadOutcome::Committed {
                    applied, skipped, ..
                } => {
                    report.batches += 1;
                    report.applied += applied;
                    report.skipped += skipped;
                }
                UploadOutcome::RolledBack { failure, .. } => {
                    report.failure = Some(failure);
                    return Ok(report);
                }
            }
        }
    }

    /// Number of mutations still queued.
    pub async fn pending_count(&self) -> Result<u64, UploadError> {
        Ok(self.queue.pending_count().await?)
    }

    /// Apply one mutation. `Ok(false)` means it was skipped.
    async fn apply_one(&self, mutation: &PendingMutation) -> Result<bool, ApplyFailureReason> {
        let operation = match self.table_map.translate(mutation) {
            Ok(operation) => operation,
            Err(error)
                if error.is_unmapped_table()
                    && self.config.unmapped_table_policy == UnmappedTablePolicy::Skip =>
            {
                warn!(
                    op_id = mutation.op_id,
                    table = %mutation.table,
                    "skipping mutation for unmapped table"
                );
                return Ok(false);
            }
            Err(error) => return Err(error.into()),
        };

        debug!(
            op_id = mutation.op_id,
            table = %mutation.table,
            kind = %mutation.kind,
            "applying mutation"
        );
        self.call_remote(&operation).await?;
        Ok(true)
    }

    async fn call_remote(&self, operation: &RemoteOperation) -> Result<(), RemoteStoreError> {
        let call = async {
            match operation {
                RemoteOperation::Upsert { resource, record } => {
                    self.remote.upsert(resource, record).await
                }
                RemoteOperation::Update {
                    resource,
                    record_id,
                    changes,
                } => self.remote.update(resource, record_id, changes).await,
                RemoteOperation::Delete {
                    resource,
                    record_id,
                } => self.remote.delete(resource, record_id).await,
            }
        };

        tokio::time::timeout(self.config.call_timeout, call)
            .await
            .unwrap_or_else(|_| {
                Err(RemoteStoreError::timeout(format!(
                    "no response from {} within {} ms",
                    operation.resource().name,
                    self.config.call_timeout.as_millis()
                )))
            })
    }
}
