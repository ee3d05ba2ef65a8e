//! Internal Diesel row structs for the SQLite cache.
//!
//! These types never leave the persistence layer.

use diesel::prelude::*;

use super::schema::{lists, pending_mutations, todos};

/// Row read from `lists`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = lists)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub(crate) struct ListRow {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Insertable list row.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = lists)]
pub(crate) struct NewListRow<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub created_at: String,
    pub updated_at: String,
}

/// Row read from `todos`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = todos)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub(crate) struct TodoRow {
    pub id: String,
    pub list_id: String,
    pub description: String,
    pub completed: i32,
    pub created_at: String,
    pub updated_at: String,
}

/// Insertable todo row.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = todos)]
pub(crate) struct NewTodoRow<'a> {
    pub id: &'a str,
    pub list_id: &'a str,
    pub description: &'a str,
    pub completed: i32,
    pub created_at: String,
    pub updated_at: String,
}

/// Partial todo update; `None` columns are left untouched.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = todos)]
pub(crate) struct TodoUpdate<'a> {
    pub description: Option<&'a str>,
    pub completed: Option<i32>,
    pub updated_at: String,
}

/// Row read from `pending_mutations`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = pending_mutations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub(crate) struct PendingMutationRow {
    pub op_id: i64,
    pub kind: String,
    pub table_name: String,
    pub record_id: String,
    pub payload: Option<String>,
    pub queued_at: String,
}

/// Insertable queue row; SQLite assigns `op_id`.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = pending_mutations)]
pub(crate) struct NewPendingMutationRow<'a> {
    pub kind: &'a str,
    pub table_name: &'a str,
    pub record_id: &'a str,
    pub payload: Option<String>,
    pub queued_at: String,
}
