//! Driven port for the local todo cache and its write queue.
//!
//! `apply` is the only write path. Implementations must update the cache
//! tables and append each write's pending mutation in a single local
//! transaction, so the cache and the queue never disagree.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{LocalWrite, RecordId, Todo, TodoList};

define_port_error! {
    /// Errors surfaced by the local store.
    pub enum TodoStoreError {
        /// The database could not be reached.
        Connection { message: String } => "local store connection failed: {message}",
        /// A read or write failed.
        Query { message: String } => "local store query failed: {message}",
        /// A write targeted a row that does not exist.
        MissingRecord { table: String, id: String } =>
            "{table} record {id} does not exist",
    }
}

/// Row counts reported by `status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    /// Lists in the cache.
    pub lists: u64,
    /// Todos in the cache.
    pub todos: u64,
    /// Mutations waiting for upload.
    pub pending: u64,
}

/// Port for reading and writing the local cache.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// All lists, newest first.
    async fn lists(&self) -> Result<Vec<TodoList>, TodoStoreError>;

    /// Look up one list.
    async fn find_list(&self, id: &RecordId) -> Result<Option<TodoList>, TodoStoreError>;

    /// Todos belonging to `list_id`, newest first.
    async fn todos_for_list(&self, list_id: &RecordId) -> Result<Vec<Todo>, TodoStoreError>;

    /// Look up one todo.
    async fn find_todo(&self, id: &RecordId) -> Result<Option<Todo>, TodoStoreError>;

    /// Apply writes in order and queue their mutations atomically.
    ///
    /// Returns the queue positions assigned to the new mutations.
    async fn apply(&self, writes: &[LocalWrite]) -> Result<Vec<i64>, TodoStoreError>;

    /// Current row counts.
    async fn counts(&self) -> Result<StoreCounts, TodoStoreError>;
}

/// Fixture store with no rows that accepts every write.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureTodoStore;

#[async_trait]
impl TodoStore for FixtureTodoStore {
    async fn lists(&self) -> Result<Vec<TodoList>, TodoStoreError> {
        Ok(Vec::new())
    }

    async fn find_list(&self, _id: &RecordId) -> Result<Option<TodoList>, TodoStoreError> {
        Ok(None)
    }

    async fn todos_for_list(&self, _list_id: &RecordId) -> Result<Vec<Todo>, TodoStoreError> {
        Ok(Vec::new())
    }

    async fn find_todo(&self, _id: &RecordId) -> Result<Option<Todo>, TodoStoreError> {
        Ok(None)
    }

    async fn apply(&self, _writes: &[LocalWrite]) -> Result<Vec<i64>, TodoStoreError> {
        Ok(Vec::new())
    }

    async fn counts(&self) -> Result<StoreCounts, TodoStoreError> {
        Ok(StoreCounts::default())
    }
}
