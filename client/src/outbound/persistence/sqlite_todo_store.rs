//! SQLite-backed `TodoStore` implementation using Diesel.
//!
//! Each `apply` call runs in one transaction: the cache rows change and the
//! matching `pending_mutations` rows are appended together, or not at all.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::BigInt;
use diesel::upsert::excluded;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use mockable::Clock;
use tracing::debug;

use crate::domain::ports::{StoreCounts, TodoStore, TodoStoreError};
use crate::domain::{
    LISTS_TABLE, LocalWrite, MutationDraft, RecordId, TODOS_TABLE, Todo, TodoList,
    format_timestamp, parse_timestamp,
};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::{
    ListRow, NewListRow, NewPendingMutationRow, NewTodoRow, TodoRow, TodoUpdate,
};
use super::pool::{DbPool, PoolError, SqliteConn};
use super::schema::{lists, pending_mutations, todos};

/// Diesel-backed implementation of the `TodoStore` port.
#[derive(Clone)]
pub struct SqliteTodoStore {
    pool: DbPool,
    clock: Arc<dyn Clock>,
}

impl SqliteTodoStore {
    /// Create a new store; `clock` stamps queued mutations.
    pub fn new(pool: DbPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

fn map_pool_error(error: PoolError) -> TodoStoreError {
    map_basic_pool_error(error, TodoStoreError::connection)
}

fn map_diesel_error(error: DieselError) -> TodoStoreError {
    map_basic_diesel_error(error, TodoStoreError::query, TodoStoreError::connection)
}

/// Failure inside the write transaction.
enum WriteError {
    Diesel(DieselError),
    Missing { table: &'static str, id: String },
    Encode(String),
}

impl From<DieselError> for WriteError {
    fn from(value: DieselError) -> Self {
        Self::Diesel(value)
    }
}

impl From<WriteError> for TodoStoreError {
    fn from(value: WriteError) -> Self {
        match value {
            WriteError::Diesel(error) => map_diesel_error(error),
            WriteError::Missing { table, id } => Self::missing_record(table, id),
            WriteError::Encode(message) => Self::query(message),
        }
    }
}

fn missing(table: &'static str, id: &RecordId) -> WriteError {
    WriteError::Missing {
        table,
        id: id.to_string(),
    }
}

fn require_row(affected: usize, table: &'static str, id: &RecordId) -> Result<(), WriteError> {
    if affected == 0 {
        Err(missing(table, id))
    } else {
        Ok(())
    }
}

async fn apply_local(conn: &mut SqliteConn, write: &LocalWrite) -> Result<(), WriteError> {
    match write {
        LocalWrite::PutList(list) => {
            let row = NewListRow {
                id: list.id.as_str(),
                name: &list.name,
                created_at: format_timestamp(list.created_at),
                updated_at: format_timestamp(list.updated_at),
            };
            diesel::insert_into(lists::table)
                .values(&row)
                .on_conflict(lists::id)
                .do_update()
                .set((
                    lists::name.eq(excluded(lists::name)),
                    lists::updated_at.eq(excluded(lists::updated_at)),
                ))
                .execute(conn)
                .await?;
        }
        LocalWrite::RenameList {
            id,
            name,
            updated_at,
        } => {
            let affected = diesel::update(lists::table.find(id.as_str()))
                .set((
                    lists::name.eq(name),
                    lists::updated_at.eq(format_timestamp(*updated_at)),
                ))
                .execute(conn)
                .await?;
            require_row(affected, LISTS_TABLE, id)?;
        }
        LocalWrite::DeleteList(id) => {
            let affected = diesel::delete(lists::table.find(id.as_str()))
                .execute(conn)
                .await?;
            require_row(affected, LISTS_TABLE, id)?;
        }
        LocalWrite::PutTodo(todo) => {
            let row = NewTodoRow {
                id: todo.id.as_str(),
                list_id: todo.list_id.as_str(),
                description: &todo.description,
                completed: i32::from(todo.completed),
                created_at: format_timestamp(todo.created_at),
                updated_at: format_timestamp(todo.updated_at),
            };
            diesel::insert_into(todos::table)
                .values(&row)
                .on_conflict(todos::id)
                .do_update()
                .set((
                    todos::list_id.eq(excluded(todos::list_id)),
                    todos::description.eq(excluded(todos::description)),
                    todos::completed.eq(excluded(todos::completed)),
                    todos::updated_at.eq(excluded(todos::updated_at)),
                ))
                .execute(conn)
                .await
                .map_err(|error| match error {
                    DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                        missing(LISTS_TABLE, &todo.list_id)
                    }
                    other => WriteError::Diesel(other),
                })?;
        }
        LocalWrite::PatchTodo {
            id,
            changes,
            updated_at,
        } => {
            let update = TodoUpdate {
                description: changes.description.as_deref(),
                completed: changes.completed.map(i32::from),
                updated_at: format_timestamp(*updated_at),
            };
            let affected = diesel::update(todos::table.find(id.as_str()))
                .set(&update)
                .execute(conn)
                .await?;
            require_row(affected, TODOS_TABLE, id)?;
        }
        LocalWrite::DeleteTodo(id) => {
            let affected = diesel::delete(todos::table.find(id.as_str()))
                .execute(conn)
                .await?;
            require_row(affected, TODOS_TABLE, id)?;
        }
    }
    Ok(())
}

async fn enqueue(
    conn: &mut SqliteConn,
    draft: &MutationDraft,
    queued_at: &str,
) -> Result<i64, WriteError> {
    let payload = draft
        .payload
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|error| WriteError::Encode(format!("encode mutation payload: {error}")))?;
    let row = NewPendingMutationRow {
        kind: draft.kind.as_str(),
        table_name: &draft.table,
        record_id: draft.record_id.as_str(),
        payload,
        queued_at: queued_at.to_owned(),
    };
    diesel::insert_into(pending_mutations::table)
        .values(&row)
        .execute(conn)
        .await?;
    let op_id = diesel::select(sql::<BigInt>("last_insert_rowid()"))
        .get_result::<i64>(conn)
        .await?;
    Ok(op_id)
}

fn decode_id(table: &str, raw: String) -> Result<RecordId, TodoStoreError> {
    RecordId::new(raw).map_err(|error| TodoStoreError::query(format!("stored {table} id: {error}")))
}

fn decode_timestamp(
    table: &str,
    id: &str,
    raw: &str,
) -> Result<chrono::DateTime<chrono::Utc>, TodoStoreError> {
    parse_timestamp(raw).map_err(|error| {
        TodoStoreError::query(format!("stored {table} {id} has invalid timestamp `{raw}`: {error}"))
    })
}

fn row_to_list(row: ListRow) -> Result<TodoList, TodoStoreError> {
    let created_at = decode_timestamp(LISTS_TABLE, &row.id, &row.created_at)?;
    let updated_at = decode_timestamp(LISTS_TABLE, &row.id, &row.updated_at)?;
    Ok(TodoList {
        id: decode_id(LISTS_TABLE, row.id)?,
        name: row.name,
        created_at,
        updated_at,
    })
}

fn row_to_todo(row: TodoRow) -> Result<Todo, TodoStoreError> {
    let created_at = decode_timestamp(TODOS_TABLE, &row.id, &row.created_at)?;
    let updated_at = decode_timestamp(TODOS_TABLE, &row.id, &row.updated_at)?;
    Ok(Todo {
        id: decode_id(TODOS_TABLE, row.id)?,
        list_id: decode_id(LISTS_TABLE, row.list_id)?,
        description: row.description,
        completed: row.completed != 0,
        created_at,
        updated_at,
    })
}

fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

#[async_trait]
impl TodoStore for SqliteTodoStore {
    async fn lists(&self) -> Result<Vec<TodoList>, TodoStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows = lists::table
            .order((lists::created_at.desc(), lists::id.desc()))
            .select(ListRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_list).collect()
    }

    async fn find_list(&self, id: &RecordId) -> Result<Option<TodoList>, TodoStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = lists::table
            .find(id.as_str())
            .select(ListRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_list).transpose()
    }

    async fn todos_for_list(&self, list_id: &RecordId) -> Result<Vec<Todo>, TodoStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows = todos::table
            .filter(todos::list_id.eq(list_id.as_str()))
            .order((todos::created_at.desc(), todos::id.desc()))
            .select(TodoRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_todo).collect()
    }

    async fn find_todo(&self, id: &RecordId) -> Result<Option<Todo>, TodoStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = todos::table
            .find(id.as_str())
            .select(TodoRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_todo).transpose()
    }

    async fn apply(&self, writes: &[LocalWrite]) -> Result<Vec<i64>, TodoStoreError> {
        if writes.is_empty() {
            return Ok(Vec::new());
        }
        let queued_at = format_timestamp(self.clock.utc());
        let mut pooled = self.pool.get().await.map_err(map_pool_error)?;
        let conn: &mut SqliteConn = &mut pooled;

        let op_ids = conn
            .transaction(|conn| {
                async move {
                    let mut op_ids = Vec::with_capacity(writes.len());
                    for write in writes {
                        apply_local(conn, write).await?;
                        op_ids.push(enqueue(conn, &write.to_draft(), &queued_at).await?);
                    }
                    Ok::<_, WriteError>(op_ids)
                }
                .scope_boxed()
            })
            .await?;

        debug!(?op_ids, "applied local writes");
        Ok(op_ids)
    }

    async fn counts(&self) -> Result<StoreCounts, TodoStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let list_count: i64 = lists::table
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        let todo_count: i64 = todos::table
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        let pending_count: i64 = pending_mutations::table
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(StoreCounts {
            lists: to_count(list_count),
            todos: to_count(todo_count),
            pending: to_count(pending_count),
        })
    }
}
