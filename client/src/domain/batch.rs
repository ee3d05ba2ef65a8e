//! Upload batches and their state machine.
//!
//! A batch moves `Fetched → Applying → {Committed | RolledBack}`. The two
//! end states are terminal. A batch may also be rolled back straight from
//! `Fetched` when application never started.

use std::fmt;

use uuid::Uuid;

use super::mutation::PendingMutation;

/// Lifecycle state of one upload batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchState {
    /// Drained from the queue, nothing sent yet.
    Fetched,
    /// Mutations are being replayed against the remote store.
    Applying,
    /// Every mutation succeeded and the queue evicted them.
    Committed,
    /// A mutation failed; the queue kept every mutation.
    RolledBack,
}

impl BatchState {
    /// Whether no further transition is allowed.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::RolledBack)
    }

    const fn can_become(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Fetched, Self::Applying)
                | (Self::Applying, Self::Committed)
                | (Self::Fetched | Self::Applying, Self::RolledBack)
        )
    }
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Fetched => "fetched",
            Self::Applying => "applying",
            Self::Committed => "committed",
            Self::RolledBack => "rolled back",
        };
        f.write_str(label)
    }
}

/// Errors raised by batch construction and transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    /// A batch must hold at least one mutation.
    #[error("an upload batch must contain at least one mutation")]
    Empty,
    /// Mutations must be in strictly increasing queue order.
    #[error("batch mutations are out of queue order at op {op_id}")]
    OutOfOrder {
        /// First op id that broke the ordering.
        op_id: i64,
    },
    /// A batch with a failed mutation can only be rolled back.
    #[error("batch {batch_id} cannot commit: op {op_id} failed")]
    HasFailure {
        /// Batch identifier.
        batch_id: Uuid,
        /// Failing op id.
        op_id: i64,
    },
    /// The requested transition is not part of the state machine.
    #[error("batch {batch_id} cannot move from {from} to {to}")]
    IllegalTransition {
        /// Batch identifier.
        batch_id: Uuid,
        /// Current state.
        from: BatchState,
        /// Requested state.
        to: BatchState,
    },
}

/// A bounded, ordered set of pending mutations uploaded as one unit.
///
/// # Examples
/// ```
/// use chrono::Utc;
/// use client::domain::{
///     BatchState, MutationDraft, PendingMutation, RecordId, UploadBatch,
/// };
///
/// let draft = MutationDraft::delete("todos", RecordId::new("todo-1").expect("valid id"));
/// let mut batch = UploadBatch::fetched(vec![PendingMutation::from_draft(1, draft, Utc::now())])
///     .expect("non-empty batch");
/// assert_eq!(batch.state(), BatchState::Fetched);
/// batch.transition(BatchState::Applying).expect("legal transition");
/// assert!(batch.transition(BatchState::Fetched).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct UploadBatch {
    id: Uuid,
    mutations: Vec<PendingMutation>,
    state: BatchState,
    failed_op_id: Option<i64>,
}

impl UploadBatch {
    /// Wrap freshly drained mutations in a `Fetched` batch.
    pub fn fetched(mutations: Vec<PendingMutation>) -> Result<Self, BatchError> {
        if mutations.is_empty() {
            return Err(BatchError::Empty);
        }
        let out_of_order = mutations.windows(2).find_map(|pair| match pair {
            [first, second] if first.op_id >= second.op_id => Some(second.op_id),
            _ => None,
        });
        if let Some(op_id) = out_of_order {
            return Err(BatchError::OutOfOrder { op_id });
        }
        Ok(Self {
            id: Uuid::new_v4(),
            mutations,
            state: BatchState::Fetched,
            failed_op_id: None,
        })
    }

    /// Batch identifier used for log correlation.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Mutations in queue order.
    pub fn mutations(&self) -> &[PendingMutation] {
        &self.mutations
    }

    /// Current state.
    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Number of mutations in the batch.
    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    /// Always `false`; batches are never empty.
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Queue positions covered by this batch, in order.
    pub fn op_ids(&self) -> Vec<i64> {
        self.mutations.iter().map(|mutation| mutation.op_id).collect()
    }

    /// Op id of the mutation whose application failed, if any.
    pub fn failed_op_id(&self) -> Option<i64> {
        self.failed_op_id
    }

    /// Record that applying `op_id` failed. The batch can then only roll back.
    pub fn record_failure(&mut self, op_id: i64) {
        self.failed_op_id.get_or_insert(op_id);
    }

    /// Check that `next` is reachable without changing state.
    pub fn ensure_can_transition(&self, next: BatchState) -> Result<(), BatchError> {
        if !self.state.can_become(next) {
            return Err(BatchError::IllegalTransition {
                batch_id: self.id,
                from: self.state,
                to: next,
            });
        }
        match (next, self.failed_op_id) {
            (BatchState::Committed, Some(op_id)) => Err(BatchError::HasFailure {
                batch_id: self.id,
                op_id,
            }),
            _ => Ok(()),
        }
    }

    /// Move to `next` if the state machine allows it.
    pub fn transition(&mut self, next: BatchState) -> Result<(), BatchError> {
        self.ensure_can_transition(next)?;
        self.state = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rstest::rstest;

    use super::*;
    use crate::domain::{MutationDraft, RecordId};

    fn mutation(op_id: i64) -> PendingMutation {
        let draft = MutationDraft::delete(
            "todos",
            RecordId::new(format!("todo-{op_id}")).expect("valid id"),
        );
        PendingMutation::from_draft(op_id, draft, Utc::now())
    }

    fn batch() -> UploadBatch {
        UploadBatch::fetched(vec![mutation(1), mutation(2)]).expect("valid batch")
    }

    #[test]
    fn empty_batches_are_rejected() {
        assert_eq!(UploadBatch::fetched(Vec::new()), Err(BatchError::Empty));
    }

    #[test]
    fn out_of_order_mutations_are_rejected() {
        let result = UploadBatch::fetched(vec![mutation(3), mutation(2)]);
        assert_eq!(result, Err(BatchError::OutOfOrder { op_id: 2 }));
    }

    #[test]
    fn fetched_batches_expose_their_op_ids() {
        let batch = batch();
        assert_eq!(batch.state(), BatchState::Fetched);
        assert_eq!(batch.op_ids(), vec![1, 2]);
        assert_eq!(batch.len(), 2);
    }

    #[rstest]
    #[case(&[BatchState::Applying, BatchState::Committed])]
    #[case(&[BatchState::Applying, BatchState::RolledBack])]
    #[case(&[BatchState::RolledBack])]
    fn legal_paths_are_accepted(#[case] path: &[BatchState]) {
        let mut batch = batch();
        for state in path {
            batch.transition(*state).expect("legal transition");
        }
        assert!(batch.state().is_terminal());
    }

    #[test]
    fn failed_batches_cannot_commit() {
        let mut batch = batch();
        batch.transition(BatchState::Applying).expect("legal transition");
        batch.record_failure(2);
        batch.record_failure(1);

        let error = batch
            .transition(BatchState::Committed)
            .expect_err("failed batch must not commit");

        assert!(matches!(error, BatchError::HasFailure { op_id: 2, .. }));
        assert_eq!(batch.failed_op_id(), Some(2));
        batch
            .transition(BatchState::RolledBack)
            .expect("rollback stays legal");
    }

    #[rstest]
    #[case(&[], BatchState::Committed)]
    #[case(&[BatchState::Applying], BatchState::Applying)]
    #[case(&[BatchState::Applying, BatchState::Committed], BatchState::RolledBack)]
    #[case(&[BatchState::RolledBack], BatchState::Applying)]
    fn illegal_transitions_leave_state_untouched(
        #[case] path: &[BatchState],
        #[case] next: BatchState,
    ) {
        let mut batch = batch();
        for state in path {
            batch.transition(*state).expect("legal transition");
        }
        let before = batch.state();

        let error = batch.transition(next).expect_err("illegal transition");

        assert!(matches!(error, BatchError::IllegalTransition { from, to, .. } if from == before && to == next));
        assert_eq!(batch.state(), before);
    }
}
