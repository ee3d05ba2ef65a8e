//! Driven port over the local queue of pending mutations.
//!
//! The queue is owned by the storage layer. It keeps no lease: a batch that
//! is rolled back, or abandoned mid-flight, is simply the head of the queue
//! again on the next drain.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::UploadBatch;

define_port_error! {
    /// Errors surfaced by queue adapters.
    pub enum MutationQueueError {
        /// The backing store could not be reached.
        Connection { message: String } => "mutation queue connection failed: {message}",
        /// A read or write against the queue failed.
        Query { message: String } => "mutation queue query failed: {message}",
        /// The stored row could not be decoded into a pending mutation.
        Corrupt { op_id: i64, message: String } =>
            "pending mutation {op_id} is corrupt: {message}",
    }
}

/// Port for draining and acknowledging pending mutations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MutationQueue: Send + Sync {
    /// Fetch up to `limit` of the oldest pending mutations in `op_id` order.
    ///
    /// Returns `None` when the queue is empty.
    async fn next_batch(&self, limit: usize) -> Result<Option<UploadBatch>, MutationQueueError>;

    /// Evict exactly the mutations of a fully applied batch.
    async fn commit(&self, batch: &UploadBatch) -> Result<(), MutationQueueError>;

    /// Release a failed batch, leaving every mutation queued unchanged.
    async fn rollback(&self, batch: &UploadBatch) -> Result<(), MutationQueueError>;

    /// Number of mutations still waiting for upload.
    async fn pending_count(&self) -> Result<u64, MutationQueueError>;
}

/// Fixture queue that is always empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureMutationQueue;

#[async_trait]
impl MutationQueue for FixtureMutationQueue {
    async fn next_batch(&self, _limit: usize) -> Result<Option<UploadBatch>, MutationQueueError> {
        Ok(None)
    }

    async fn commit(&self, _batch: &UploadBatch) -> Result<(), MutationQueueError> {
        Ok(())
    }

    async fn rollback(&self, _batch: &UploadBatch) -> Result<(), MutationQueueError> {
        Ok(())
    }

    async fn pending_count(&self) -> Result<u64, MutationQueueError> {
        Ok(0)
    }
}
