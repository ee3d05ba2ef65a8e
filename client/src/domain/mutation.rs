//! Pending mutations: local writes waiting for remote confirmation.
//!
//! Local CRUD produces [`LocalWrite`] values. The store applies each write to
//! its cache tables and appends the matching [`MutationDraft`] to the queue in
//! the same transaction; the queue assigns the `op_id` that turns a draft into
//! a [`PendingMutation`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::record::{RecordId, Todo, TodoList, format_timestamp};

/// Column map carried by `put` and `patch` mutations.
pub type RecordPayload = Map<String, Value>;

/// Local table holding todo lists.
pub const LISTS_TABLE: &str = "lists";

/// Local table holding todos.
pub const TODOS_TABLE: &str = "todos";

/// Operation recorded for one pending mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// Create or fully replace a record.
    Put,
    /// Update a subset of a record's columns.
    Patch,
    /// Remove a record.
    Delete,
}

impl MutationKind {
    /// Stable lowercase name stored in the queue table.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Put => "put",
            Self::Patch => "patch",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored mutation kind is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mutation kind `{0}`")]
pub struct ParseMutationKindError(pub String);

impl FromStr for MutationKind {
    type Err = ParseMutationKindError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "put" => Ok(Self::Put),
            "patch" => Ok(Self::Patch),
            "delete" => Ok(Self::Delete),
            other => Err(ParseMutationKindError(other.to_owned())),
        }
    }
}

/// A mutation before the queue has assigned its position.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationDraft {
    /// Operation kind.
    pub kind: MutationKind,
    /// Local table name.
    pub table: String,
    /// Target record.
    pub record_id: RecordId,
    /// Column values in local representation; `None` for deletes.
    pub payload: Option<RecordPayload>,
}

impl MutationDraft {
    /// Draft a full upsert.
    pub fn put(table: impl Into<String>, record_id: RecordId, payload: RecordPayload) -> Self {
        Self {
            kind: MutationKind::Put,
            table: table.into(),
            record_id,
            payload: Some(payload),
        }
    }

    /// Draft a partial update.
    pub fn patch(table: impl Into<String>, record_id: RecordId, payload: RecordPayload) -> Self {
        Self {
            kind: MutationKind::Patch,
            table: table.into(),
            record_id,
            payload: Some(payload),
        }
    }

    /// Draft a delete.
    pub fn delete(table: impl Into<String>, record_id: RecordId) -> Self {
        Self {
            kind: MutationKind::Delete,
            table: table.into(),
            record_id,
            payload: None,
        }
    }
}

/// One queued local write awaiting remote confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMutation {
    /// Queue position; strictly increasing in arrival order.
    pub op_id: i64,
    /// Operation kind.
    pub kind: MutationKind,
    /// Local table name.
    pub table: String,
    /// Target record.
    pub record_id: RecordId,
    /// Column values in local representation; `None` for deletes.
    pub payload: Option<RecordPayload>,
    /// When the write was queued.
    pub queued_at: DateTime<Utc>,
}

impl PendingMutation {
    /// Attach a queue position to a draft.
    pub fn from_draft(op_id: i64, draft: MutationDraft, queued_at: DateTime<Utc>) -> Self {
        let MutationDraft {
            kind,
            table,
            record_id,
            payload,
        } = draft;
        Self {
            op_id,
            kind,
            table,
            record_id,
            payload,
            queued_at,
        }
    }
}

/// Column changes for a todo update. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoChanges {
    /// New description.
    pub description: Option<String>,
    /// New completion flag.
    pub completed: Option<bool>,
}

impl TodoChanges {
    /// Whether no column would change.
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.completed.is_none()
    }
}

/// One local write applied to the cache and mirrored into the queue.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalWrite {
    /// Insert or replace a list.
    PutList(TodoList),
    /// Rename a list.
    RenameList {
        /// Target list.
        id: RecordId,
        /// New name.
        name: String,
        /// Modification instant.
        updated_at: DateTime<Utc>,
    },
    /// Remove a list row.
    DeleteList(RecordId),
    /// Insert or replace a todo.
    PutTodo(Todo),
    /// Change some todo columns.
    PatchTodo {
        /// Target todo.
        id: RecordId,
        /// Column changes.
        changes: TodoChanges,
        /// Modification instant.
        updated_at: DateTime<Utc>,
    },
    /// Remove a todo row.
    DeleteTodo(RecordId),
}

impl LocalWrite {
    /// Build the queue entry mirroring this write.
    ///
    /// Payloads use the local column representation: `completed` is `0`/`1`
    /// and timestamps are ISO-8601 strings. The primary key travels as
    /// `record_id` rather than inside the payload.
    ///
    /// ```
    /// use chrono::Utc;
    /// use client::domain::{LocalWrite, MutationKind, RecordId, TodoChanges};
    ///
    /// let write = LocalWrite::PatchTodo {
    ///     id: RecordId::new("todo-1").expect("valid id"),
    ///     changes: TodoChanges { description: None, completed: Some(true) },
    ///     updated_at: Utc::now(),
    /// };
    /// let draft = write.to_draft();
    /// assert_eq!(draft.kind, MutationKind::Patch);
    /// let payload = draft.payload.expect("patch payload");
    /// assert_eq!(payload.get("completed"), Some(&serde_json::json!(1)));
    /// ```
    pub fn to_draft(&self) -> MutationDraft {
        match self {
            Self::PutList(list) => {
                MutationDraft::put(LISTS_TABLE, list.id.clone(), list_payload(list))
            }
            Self::RenameList {
                id,
                name,
                updated_at,
            } => {
                let mut payload = RecordPayload::new();
                payload.insert("name".to_owned(), Value::from(name.as_str()));
                payload.insert(
                    "updated_at".to_owned(),
                    Value::from(format_timestamp(*updated_at)),
                );
                MutationDraft::patch(LISTS_TABLE, id.clone(), payload)
            }
            Self::DeleteList(id) => MutationDraft::delete(LISTS_TABLE, id.clone()),
            Self::PutTodo(todo) => {
                MutationDraft::put(TODOS_TABLE, todo.id.clone(), todo_payload(todo))
            }
            Self::PatchTodo {
                id,
                changes,
                updated_at,
            } => {
                let mut payload = RecordPayload::new();
                if let Some(description) = &changes.description {
                    payload.insert("description".to_owned(), Value::from(description.as_str()));
                }
                if let Some(completed) = changes.completed {
                    payload.insert("completed".to_owned(), completed_flag(completed));
                }
                payload.insert(
                    "updated_at".to_owned(),
                    Value::from(format_timestamp(*updated_at)),
                );
                MutationDraft::patch(TODOS_TABLE, id.clone(), payload)
            }
            Self::DeleteTodo(id) => MutationDraft::delete(TODOS_TABLE, id.clone()),
        }
    }
}

fn list_payload(list: &TodoList) -> RecordPayload {
    let mut payload = RecordPayload::new();
    payload.insert("name".to_owned(), Value::from(list.name.as_str()));
    payload.insert(
        "created_at".to_owned(),
        Value::from(format_timestamp(list.created_at)),
    );
    payload.insert(
        "updated_at".to_owned(),
        Value::from(format_timestamp(list.updated_at)),
    );
    payload
}

fn todo_payload(todo: &Todo) -> RecordPayload {
    let mut payload = RecordPayload::new();
    payload.insert("list_id".to_owned(), Value::from(todo.list_id.as_str()));
    payload.insert(
        "description".to_owned(),
        Value::from(todo.description.as_str()),
    );
    payload.insert("completed".to_owned(), completed_flag(todo.completed));
    payload.insert(
        "created_at".to_owned(),
        Value::from(format_timestamp(todo.created_at)),
    );
    payload.insert(
        "updated_at".to_owned(),
        Value::from(format_timestamp(todo.updated_at)),
    );
    payload
}

fn completed_flag(completed: bool) -> Value {
    Value::from(i32::from(completed))
}
