//! In-memory mutation queue mirroring the SQLite queue's semantics.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::ports::{MutationQueue, MutationQueueError};
use crate::domain::{MutationDraft, PendingMutation, UploadBatch};

#[derive(Default)]
struct QueueState {
    last_op_id: i64,
    pending: BTreeMap<i64, PendingMutation>,
    commits: Vec<Vec<i64>>,
    rollbacks: Vec<Vec<i64>>,
    fail_commit: Option<MutationQueueError>,
}

/// Queue double backed by an ordered map.
#[derive(Default)]
pub struct InMemoryMutationQueue {
    state: Mutex<QueueState>,
}

impl InMemoryMutationQueue {
    /// Empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue pre-filled with `drafts` in order.
    pub fn with_drafts(drafts: impl IntoIterator<Item = MutationDraft>) -> Self {
        let queue = Self::new();
        for draft in drafts {
            queue.push(draft);
        }
        queue
    }

    /// Append a draft and return its op id.
    pub fn push(&self, draft: MutationDraft) -> i64 {
        let mut state = self.lock();
        state.last_op_id += 1;
        let op_id = state.last_op_id;
        state
            .pending
            .insert(op_id, PendingMutation::from_draft(op_id, draft, Utc::now()));
        op_id
    }

    /// Make the next commit fail with `error`.
    pub fn fail_next_commit(&self, error: MutationQueueError) {
        self.lock().fail_commit = Some(error);
    }

    /// Pending mutations in op id order.
    pub fn snapshot(&self) -> Vec<PendingMutation> {
        self.lock().pending.values().cloned().collect()
    }

    /// Op ids evicted by each commit.
    pub fn commits(&self) -> Vec<Vec<i64>> {
        self.lock().commits.clone()
    }

    /// Op ids released by each rollback.
    pub fn rollbacks(&self) -> Vec<Vec<i64>> {
        self.lock().rollbacks.clone()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl MutationQueue for InMemoryMutationQueue {
    async fn next_batch(&self, limit: usize) -> Result<Option<UploadBatch>, MutationQueueError> {
        let mutations: Vec<_> = self.lock().pending.values().take(limit).cloned().collect();
        if mutations.is_empty() {
            return Ok(None);
        }
        UploadBatch::fetched(mutations)
            .map(Some)
            .map_err(|error| MutationQueueError::query(error.to_string()))
    }

    async fn commit(&self, batch: &UploadBatch) -> Result<(), MutationQueueError> {
        let mut state = self.lock();
        if let Some(error) = state.fail_commit.take() {
            return Err(error);
        }
        let op_ids = batch.op_ids();
        for op_id in &op_ids {
            state.pending.remove(op_id);
        }
        state.commits.push(op_ids);
        Ok(())
    }

    async fn rollback(&self, batch: &UploadBatch) -> Result<(), MutationQueueError> {
        self.lock().rollbacks.push(batch.op_ids());
        Ok(())
    }

    async fn pending_count(&self) -> Result<u64, MutationQueueError> {
        Ok(u64::try_from(self.lock().pending.len()).unwrap_or(u64::MAX))
    }
}
