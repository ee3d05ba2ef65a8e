//! Reports and errors produced by the uploader.

use uuid::Uuid;

use crate::domain::ports::{MutationQueueError, RemoteStoreError};
use crate::domain::{BatchError, MappingError, MutationKind, RecordId};

/// A mutation left out of the upload because its table is unmapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedMutation {
    /// Queue position.
    pub op_id: i64,
    /// Unmapped local table.
    pub table: String,
}

/// Summary of a fully applied batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Mutations confirmed by the remote store.
    pub applied: usize,
    /// Mutations skipped under the `skip` policy.
    pub skipped: Vec<SkippedMutation>,
}

/// Why one mutation could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplyFailureReason {
    /// The mutation could not be translated into a remote call.
    #[error(transparent)]
    Mapping(#[from] MappingError),
    /// The remote store refused or never answered the call.
    #[error(transparent)]
    Remote(#[from] RemoteStoreError),
}

impl ApplyFailureReason {
    /// Whether the same mutation may succeed on a later attempt unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Mapping(_) => false,
            Self::Remote(error) => error.is_retryable(),
        }
    }
}

/// The first mutation of a batch that failed to apply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("op {op_id} ({kind} {table}/{record_id}) failed: {reason}")]
pub struct ApplyFailure {
    /// Queue position of the failing mutation.
    pub op_id: i64,
    /// Operation kind.
    pub kind: MutationKind,
    /// Local table name.
    pub table: String,
    /// Target record.
    pub record_id: RecordId,
    /// Underlying cause.
    pub reason: ApplyFailureReason,
}

/// Result of one `upload_next` tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The queue was empty.
    Idle,
    /// Every mutation of the batch was confirmed and evicted.
    Committed {
        /// Batch identifier.
        batch_id: Uuid,
        /// Mutations applied remotely.
        applied: usize,
        /// Mutations skipped under the `skip` policy.
        skipped: usize,
    },
    /// A mutation failed; the whole batch stays queued.
    RolledBack {
        /// Batch identifier.
        batch_id: Uuid,
        /// Number of mutations kept in the queue.
        batch_size: usize,
        /// The failure that aborted the batch.
        failure: ApplyFailure,
    },
}

/// Totals from draining the queue until idle or the first rollback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Batches committed.
    pub batches: usize,
    /// Mutations applied across committed batches.
    pub applied: usize,
    /// Mutations skipped across committed batches.
    pub skipped: usize,
    /// The failure that stopped the drain, if any.
    pub failure: Option<ApplyFailure>,
}

/// Errors raised by uploader operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    /// The local queue failed.
    #[error(transparent)]
    Queue(#[from] MutationQueueError),
    /// A batch operation was called out of order.
    #[error(transparent)]
    Batch(#[from] BatchError),
    /// A mutation could not be applied; the batch must roll back.
    #[error(transparent)]
    Apply(ApplyFailure),
}
