//! Static dispatch from local tables to remote resources.
//!
//! Translation turns one [`PendingMutation`] into the exact remote call shape
//! (upsert, filtered update, filtered delete) and converts local column
//! representations into the remote store's native types.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use super::mutation::{LISTS_TABLE, MutationKind, PendingMutation, RecordPayload, TODOS_TABLE};
use super::record::RecordId;

/// Remote resource addressed by table name and primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RemoteResource {
    /// Local table that feeds this resource.
    pub local_table: &'static str,
    /// Remote table name.
    pub name: &'static str,
    /// Remote primary key column.
    pub primary_key: &'static str,
    /// Columns stored as `0`/`1` locally and as booleans remotely.
    pub boolean_columns: &'static [&'static str],
}

/// Remote `lists` table.
pub const LISTS_RESOURCE: RemoteResource = RemoteResource {
    local_table: LISTS_TABLE,
    name: "lists",
    primary_key: "id",
    boolean_columns: &[],
};

/// Remote `todos` table.
pub const TODOS_RESOURCE: RemoteResource = RemoteResource {
    local_table: TODOS_TABLE,
    name: "todos",
    primary_key: "id",
    boolean_columns: &["completed"],
};

static TODO_RESOURCES: [RemoteResource; 2] = [LISTS_RESOURCE, TODOS_RESOURCE];

/// What to do with a mutation whose table has no remote counterpart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum UnmappedTablePolicy {
    /// Log a warning, leave the mutation out of the upload and let the batch
    /// commit without it.
    #[default]
    Skip,
    /// Fail the batch so it rolls back and stays queued.
    Reject,
}

impl UnmappedTablePolicy {
    /// Configuration spelling of the policy.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Reject => "reject",
        }
    }
}

impl fmt::Display for UnmappedTablePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a configured policy name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown unmapped-table policy `{0}`; expected `skip` or `reject`")]
pub struct ParseUnmappedTablePolicyError(pub String);

impl FromStr for UnmappedTablePolicy {
    type Err = ParseUnmappedTablePolicyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "reject" => Ok(Self::Reject),
            _ => Err(ParseUnmappedTablePolicyError(value.to_owned())),
        }
    }
}

/// Mapping failures raised while translating a mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    /// No remote resource is registered for the table.
    #[error("table `{table}` has no remote resource")]
    UnmappedTable {
        /// Local table name.
        table: String,
    },
    /// A put or patch arrived without column values.
    #[error("{kind} mutation for `{table}` carries no payload")]
    MissingPayload {
        /// Local table name.
        table: String,
        /// Operation kind.
        kind: MutationKind,
    },
    /// The payload names a different primary key than the mutation.
    #[error("payload key `{payload_id}` does not match record `{record_id}`")]
    PrimaryKeyMismatch {
        /// Mutation target.
        record_id: String,
        /// Key found in the payload.
        payload_id: String,
    },
    /// A boolean column held something other than `0`, `1`, a bool or null.
    #[error("column `{table}.{column}` holds non-boolean value {value}")]
    InvalidBoolean {
        /// Local table name.
        table: String,
        /// Column name.
        column: String,
        /// Offending value, rendered as JSON.
        value: String,
    },
}

impl MappingError {
    /// Whether the unmapped-table policy applies to this error.
    pub fn is_unmapped_table(&self) -> bool {
        matches!(self, Self::UnmappedTable { .. })
    }
}

/// Remote call shape derived from one pending mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteOperation {
    /// Insert or merge a full record keyed by its primary key.
    Upsert {
        /// Target resource.
        resource: RemoteResource,
        /// Record columns, including the primary key.
        record: RecordPayload,
    },
    /// Update the listed columns of the row matching the primary key.
    Update {
        /// Target resource.
        resource: RemoteResource,
        /// Row filter value.
        record_id: RecordId,
        /// Columns to change.
        changes: RecordPayload,
    },
    /// Delete the row matching the primary key.
    Delete {
        /// Target resource.
        resource: RemoteResource,
        /// Row filter value.
        record_id: RecordId,
    },
}

impl RemoteOperation {
    /// Resource addressed by this operation.
    pub fn resource(&self) -> &RemoteResource {
        match self {
            Self::Upsert { resource, .. }
            | Self::Update { resource, .. }
            | Self::Delete { resource, .. } => resource,
        }
    }
}

/// Static table-to-resource lookup.
///
/// # Examples
/// ```
/// use client::domain::TableMap;
///
/// let map = TableMap::todo_tables();
/// assert_eq!(map.resolve("todos").map(|resource| resource.name), Some("todos"));
/// assert!(map.resolve("ps_oplog").is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableMap {
    resources: &'static [RemoteResource],
}

impl Default for TableMap {
    fn default() -> Self {
        Self::todo_tables()
    }
}

impl TableMap {
    /// Build a map over a fixed set of resources.
    pub const fn new(resources: &'static [RemoteResource]) -> Self {
        Self { resources }
    }

    /// The `lists` and `todos` tables of the todo schema.
    pub fn todo_tables() -> Self {
        Self::new(&TODO_RESOURCES)
    }

    /// Find the resource fed by `table`.
    pub fn resolve(&self, table: &str) -> Option<&'static RemoteResource> {
        self.resources
            .iter()
            .find(|resource| resource.local_table == table)
    }

    /// Translate a pending mutation into its remote call.
    pub fn translate(&self, mutation: &PendingMutation) -> Result<RemoteOperation, MappingError> {
        let resource = *self
            .resolve(&mutation.table)
            .ok_or_else(|| MappingError::UnmappedTable {
                table: mutation.table.clone(),
            })?;

        match mutation.kind {
            MutationKind::Put => {
                let mut record = convert_payload(&resource, mutation)?;
                claim_primary_key(&resource, &mutation.record_id, &mut record)?;
                record.insert(
                    resource.primary_key.to_owned(),
                    Value::from(mutation.record_id.as_str()),
                );
                Ok(RemoteOperation::Upsert { resource, record })
            }
            MutationKind::Patch => {
                let mut changes = convert_payload(&resource, mutation)?;
                claim_primary_key(&resource, &mutation.record_id, &mut changes)?;
                Ok(RemoteOperation::Update {
                    resource,
                    record_id: mutation.record_id.clone(),
                    changes,
                })
            }
            MutationKind::Delete => Ok(RemoteOperation::Delete {
                resource,
                record_id: mutation.record_id.clone(),
            }),
        }
    }
}

fn convert_payload(
    resource: &RemoteResource,
    mutation: &PendingMutation,
) -> Result<RecordPayload, MappingError> {
    let payload = mutation
        .payload
        .as_ref()
        .ok_or_else(|| MappingError::MissingPayload {
            table: mutation.table.clone(),
            kind: mutation.kind,
        })?;

    payload
        .iter()
        .map(|(column, value)| {
            if resource.boolean_columns.contains(&column.as_str()) {
                to_remote_boolean(value)
                    .map(|converted| (column.clone(), converted))
                    .ok_or_else(|| MappingError::InvalidBoolean {
                        table: mutation.table.clone(),
                        column: column.clone(),
                        value: value.to_string(),
                    })
            } else {
                Ok((column.clone(), value.clone()))
            }
        })
        .collect()
}

/// Remove a primary key echoed in the payload, rejecting a conflicting one.
fn claim_primary_key(
    resource: &RemoteResource,
    record_id: &RecordId,
    payload: &mut RecordPayload,
) -> Result<(), MappingError> {
    match payload.remove(resource.primary_key) {
        None => Ok(()),
        Some(Value::String(value)) if value == record_id.as_str() => Ok(()),
        Some(other) => Err(MappingError::PrimaryKeyMismatch {
            record_id: record_id.to_string(),
            payload_id: match other {
                Value::String(value) => value,
                value => value.to_string(),
            },
        }),
    }
}

fn to_remote_boolean(value: &Value) -> Option<Value> {
    match value {
        Value::Null | Value::Bool(_) => Some(value.clone()),
        Value::Number(number) => match number.as_i64() {
            Some(0) => Some(Value::Bool(false)),
            Some(1) => Some(Value::Bool(true)),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rstest::{fixture, rstest};
    use serde_json::json;

    use super::*;

    #[fixture]
    fn map() -> TableMap {
        TableMap::todo_tables()
    }

    fn mutation(kind: MutationKind, table: &str, payload: Option<Value>) -> PendingMutation {
        PendingMutation {
            op_id: 1,
            kind,
            table: table.to_owned(),
            record_id: RecordId::new("rec-1").expect("valid id"),
            payload: payload.map(|value| match value {
                Value::Object(map) => map,
                other => panic!("payload must be an object, got {other}"),
            }),
            queued_at: Utc::now(),
        }
    }

    #[rstest]
    fn put_becomes_upsert_with_primary_key(map: TableMap) {
        let put = mutation(
            MutationKind::Put,
            "todos",
            Some(json!({"list_id": "list-1", "description": "Milk", "completed": 0})),
        );

        let operation = map.translate(&put).expect("translatable");

        assert_eq!(
            operation,
            RemoteOperation::Upsert {
                resource: TODOS_RESOURCE,
                record: json!({
                    "id": "rec-1",
                    "list_id": "list-1",
                    "description": "Milk",
                    "completed": false,
                })
                .as_object()
                .cloned()
                .expect("object"),
            }
        );
    }

    #[rstest]
    #[case(json!(1), json!(true))]
    #[case(json!(0), json!(false))]
    #[case(json!(true), json!(true))]
    #[case(json!(null), json!(null))]
    fn boolean_columns_become_booleans(map: TableMap, #[case] local: Value, #[case] remote: Value) {
        let patch = mutation(MutationKind::Patch, "todos", Some(json!({"completed": local})));

        let RemoteOperation::Update { changes, .. } = map.translate(&patch).expect("translatable")
        else {
            panic!("patch must become an update");
        };

        assert_eq!(changes.get("completed"), Some(&remote));
    }

    #[rstest]
    #[case(json!(7))]
    #[case(json!("yes"))]
    fn invalid_booleans_are_mapping_errors(map: TableMap, #[case] local: Value) {
        let patch = mutation(MutationKind::Patch, "todos", Some(json!({"completed": local})));

        let error = map.translate(&patch).expect_err("invalid boolean");

        assert!(matches!(error, MappingError::InvalidBoolean { ref column, .. } if column == "completed"));
        assert!(!error.is_unmapped_table());
    }

    #[rstest]
    fn non_boolean_tables_pass_integers_through(map: TableMap) {
        let patch = mutation(MutationKind::Patch, "lists", Some(json!({"completed": 3})));
        let RemoteOperation::Update { changes, .. } = map.translate(&patch).expect("translatable")
        else {
            panic!("patch must become an update");
        };
        assert_eq!(changes.get("completed"), Some(&json!(3)));
    }

    #[rstest]
    fn delete_needs_no_payload(map: TableMap) {
        let delete = mutation(MutationKind::Delete, "lists", None);
        assert_eq!(
            map.translate(&delete),
            Ok(RemoteOperation::Delete {
                resource: LISTS_RESOURCE,
                record_id: RecordId::new("rec-1").expect("valid id"),
            })
        );
    }

    #[rstest]
    fn unmapped_tables_are_reported(map: TableMap) {
        let put = mutation(MutationKind::Put, "attachments", Some(json!({})));
        let error = map.translate(&put).expect_err("unmapped");
        assert!(error.is_unmapped_table());
        assert_eq!(error.to_string(), "table `attachments` has no remote resource");
    }

    #[rstest]
    fn put_without_payload_is_rejected(map: TableMap) {
        let put = mutation(MutationKind::Put, "lists", None);
        assert!(matches!(
            map.translate(&put),
            Err(MappingError::MissingPayload {
                kind: MutationKind::Put,
                ..
            })
        ));
    }

    #[rstest]
    fn matching_payload_key_is_accepted(map: TableMap) {
        let put = mutation(MutationKind::Put, "lists", Some(json!({"id": "rec-1", "name": "A"})));
        assert!(map.translate(&put).is_ok());
    }

    #[rstest]
    fn conflicting_payload_key_is_rejected(map: TableMap) {
        let put = mutation(MutationKind::Put, "lists", Some(json!({"id": "other", "name": "A"})));
        assert_eq!(
            map.translate(&put),
            Err(MappingError::PrimaryKeyMismatch {
                record_id: "rec-1".to_owned(),
                payload_id: "other".to_owned(),
            })
        );
    }

    #[rstest]
    #[case("skip", UnmappedTablePolicy::Skip)]
    #[case(" Reject ", UnmappedTablePolicy::Reject)]
    fn policies_parse_case_insensitively(#[case] raw: &str, #[case] expected: UnmappedTablePolicy) {
        assert_eq!(raw.parse::<UnmappedTablePolicy>(), Ok(expected));
    }

    #[test]
    fn unknown_policies_are_rejected() {
        assert!("ignore".parse::<UnmappedTablePolicy>().is_err());
    }
}
