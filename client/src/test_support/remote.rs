//! In-memory remote store with foreign-key enforcement and failure injection.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::ports::{RemoteStore, RemoteStoreError};
use crate::domain::{RecordId, RecordPayload, RemoteResource};

/// `(child table, column, parent table)` with cascade delete.
const FOREIGN_KEYS: &[(&str, &str, &str)] = &[("todos", "list_id", "lists")];

/// One call received by [`InMemoryRemoteStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    /// Upsert into a resource.
    Upsert {
        /// Resource name.
        resource: String,
        /// Primary key of the record.
        id: String,
    },
    /// Filtered update.
    Update {
        /// Resource name.
        resource: String,
        /// Row filter value.
        id: String,
    },
    /// Filtered delete.
    Delete {
        /// Resource name.
        resource: String,
        /// Row filter value.
        id: String,
    },
}

#[derive(Default)]
struct RemoteState {
    tables: BTreeMap<String, BTreeMap<String, RecordPayload>>,
    calls: Vec<RemoteCall>,
    failures: BTreeMap<usize, RemoteStoreError>,
    hanging: Vec<usize>,
}

enum Scripted {
    Proceed,
    Fail(RemoteStoreError),
    Hang,
}

/// Remote store double holding rows in memory.
///
/// Calls are numbered from zero in arrival order. A scripted failure or hang
/// applies to the call with that number and leaves the rows untouched.
#[derive(Default)]
pub struct InMemoryRemoteStore {
    state: Mutex<RemoteState>,
}

impl InMemoryRemoteStore {
    /// Empty remote.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail call number `index` with `error`.
    pub fn fail_call(&self, index: usize, error: RemoteStoreError) {
        self.lock().failures.insert(index, error);
    }

    /// Fail the next call with `error`.
    pub fn fail_next(&self, error: RemoteStoreError) {
        let mut state = self.lock();
        let index = state.calls.len();
        state.failures.insert(index, error);
    }

    /// Make call number `index` never complete.
    pub fn hang_call(&self, index: usize) {
        self.lock().hanging.push(index);
    }

    /// Seed a row directly, bypassing call accounting.
    pub fn insert_row(&self, resource: &str, id: &str, mut record: RecordPayload) {
        record.insert("id".to_owned(), Value::from(id));
        self.lock()
            .tables
            .entry(resource.to_owned())
            .or_default()
            .insert(id.to_owned(), record);
    }

    /// Every call received so far, including failed ones.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    /// Rows of `resource` ordered by primary key.
    pub fn rows(&self, resource: &str) -> Vec<RecordPayload> {
        self.lock()
            .tables
            .get(resource)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    /// One row of `resource`.
    pub fn row(&self, resource: &str, id: &str) -> Option<RecordPayload> {
        self.lock()
            .tables
            .get(resource)
            .and_then(|rows| rows.get(id))
            .cloned()
    }

    fn lock(&self) -> MutexGuard<'_, RemoteState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn admit(&self, call: RemoteCall) -> Scripted {
        let mut state = self.lock();
        let index = state.calls.len();
        state.calls.push(call);
        if state.hanging.contains(&index) {
            return Scripted::Hang;
        }
        state
            .failures
            .remove(&index)
            .map_or(Scripted::Proceed, Scripted::Fail)
    }

    async fn run<F>(&self, call: RemoteCall, apply: F) -> Result<(), RemoteStoreError>
    where
        F: FnOnce(&mut RemoteState) -> Result<(), RemoteStoreError>,
    {
        match self.admit(call) {
            Scripted::Proceed => apply(&mut self.lock()),
            Scripted::Fail(error) => Err(error),
            Scripted::Hang => std::future::pending().await,
        }
    }
}

impl RemoteState {
    fn check_foreign_keys(
        &self,
        resource: &str,
        record: &RecordPayload,
    ) -> Result<(), RemoteStoreError> {
        for (child, column, parent) in FOREIGN_KEYS {
            if *child != resource {
                continue;
            }
            let Some(Value::String(parent_id)) = record.get(*column) else {
                continue;
            };
            let exists = self
                .tables
                .get(*parent)
                .is_some_and(|rows| rows.contains_key(parent_id));
            if !exists {
                return Err(RemoteStoreError::constraint(format!(
                    "insert or update on table \"{child}\" violates foreign key constraint \
                     \"{child}_{column}_fkey\""
                )));
            }
        }
        Ok(())
    }

    fn cascade_delete(&mut self, resource: &str, id: &str) {
        for (child, column, parent) in FOREIGN_KEYS {
            if *parent != resource {
                continue;
            }
            if let Some(rows) = self.tables.get_mut(*child) {
                rows.retain(|_, row| row.get(*column).and_then(Value::as_str) != Some(id));
            }
        }
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn upsert(
        &self,
        resource: &RemoteResource,
        record: &RecordPayload,
    ) -> Result<(), RemoteStoreError> {
        let id = record
            .get(resource.primary_key)
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_default();
        let call = RemoteCall::Upsert {
            resource: resource.name.to_owned(),
            id: id.clone(),
        };
        self.run(call, |state| {
            if id.is_empty() {
                return Err(RemoteStoreError::rejected("upsert without primary key"));
            }
            let mut merged = state
                .tables
                .get(resource.name)
                .and_then(|rows| rows.get(&id))
                .cloned()
                .unwrap_or_default();
            merged.extend(record.clone());
            state.check_foreign_keys(resource.name, &merged)?;
            state
                .tables
                .entry(resource.name.to_owned())
                .or_default()
                .insert(id, merged);
            Ok(())
        })
        .await
    }

    async fn update(
        &self,
        resource: &RemoteResource,
        record_id: &RecordId,
        changes: &RecordPayload,
    ) -> Result<(), RemoteStoreError> {
        let call = RemoteCall::Update {
            resource: resource.name.to_owned(),
            id: record_id.to_string(),
        };
        self.run(call, |state| {
            let Some(existing) = state
                .tables
                .get(resource.name)
                .and_then(|rows| rows.get(record_id.as_str()))
                .cloned()
            else {
                return Ok(());
            };
            let mut merged = existing;
            merged.extend(changes.clone());
            state.check_foreign_keys(resource.name, &merged)?;
            if let Some(rows) = state.tables.get_mut(resource.name) {
                rows.insert(record_id.to_string(), merged);
            }
            Ok(())
        })
        .await
    }

    async fn delete(
        &self,
        resource: &RemoteResource,
        record_id: &RecordId,
    ) -> Result<(), RemoteStoreError> {
        let call = RemoteCall::Delete {
            resource: resource.name.to_owned(),
            id: record_id.to_string(),
        };
        self.run(call, |state| {
            state.cascade_delete(resource.name, record_id.as_str());
            if let Some(rows) = state.tables.get_mut(resource.name) {
                rows.remove(record_id.as_str());
            }
            Ok(())
        })
        .await
    }
}
