//! SQLite-backed `MutationQueue` implementation using Diesel.
//!
//! Rows in `pending_mutations` are appended by [`super::SqliteTodoStore`] and
//! removed only here, when a batch commits.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use tracing::{debug, warn};

use crate::domain::ports::{MutationQueue, MutationQueueError};
use crate::domain::{
    MutationKind, PendingMutation, RecordId, RecordPayload, UploadBatch, parse_timestamp,
};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::PendingMutationRow;
use super::pool::{DbPool, PoolError, SqliteConn};
use super::schema::pending_mutations;

/// Diesel-backed implementation of the `MutationQueue` port.
#[derive(Clone)]
pub struct SqliteMutationQueue {
    pool: DbPool,
}

impl SqliteMutationQueue {
    /// Create a new queue over the shared pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> MutationQueueError {
    map_basic_pool_error(error, MutationQueueError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> MutationQueueError {
    map_basic_diesel_error(
        error,
        MutationQueueError::query,
        MutationQueueError::connection,
    )
}

fn corrupt(op_id: i64, message: impl Into<String>) -> MutationQueueError {
    MutationQueueError::corrupt(op_id, message)
}

fn row_to_mutation(row: PendingMutationRow) -> Result<PendingMutation, MutationQueueError> {
    let op_id = row.op_id;
    let kind = row
        .kind
        .parse::<MutationKind>()
        .map_err(|error| corrupt(op_id, error.to_string()))?;
    let record_id = RecordId::new(row.record_id).map_err(|error| corrupt(op_id, error.to_string()))?;
    let payload = row
        .payload
        .as_deref()
        .map(serde_json::from_str::<RecordPayload>)
        .transpose()
        .map_err(|error| corrupt(op_id, format!("payload is not a JSON object: {error}")))?;
    if kind != MutationKind::Delete && payload.is_none() {
        return Err(corrupt(op_id, format!("{kind} mutation has no payload")));
    }
    let queued_at = parse_timestamp(&row.queued_at)
        .map_err(|error| corrupt(op_id, format!("invalid queued_at: {error}")))?;

    Ok(PendingMutation {
        op_id,
        kind,
        table: row.table_name,
        record_id,
        payload,
        queued_at,
    })
}

#[async_trait]
impl MutationQueue for SqliteMutationQueue {
    async fn next_batch(&self, limit: usize) -> Result<Option<UploadBatch>, MutationQueueError> {
        if limit == 0 {
            return Ok(None);
        }
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows = pending_mutations::table
            .order(pending_mutations::op_id.asc())
            .limit(limit)
            .select(PendingMutationRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        if rows.is_empty() {
            return Ok(None);
        }

        let mutations = rows
            .into_iter()
            .map(row_to_mutation)
            .collect::<Result<Vec<_>, _>>()?;
        let batch = UploadBatch::fetched(mutations)
            .map_err(|error| MutationQueueError::query(error.to_string()))?;
        debug!(batch_id = %batch.id(), batch_size = batch.len(), "drained upload batch");
        Ok(Some(batch))
    }

    /// Evict the batch as one `op_id` range.
    ///
    /// A batch is always the head of the queue in `op_id` order and new
    /// mutations only ever receive larger ids, so the range holds exactly
    /// the batch and binds two variables however large the batch is.
    async fn commit(&self, batch: &UploadBatch) -> Result<(), MutationQueueError> {
        let op_ids = batch.op_ids();
        let (Some(&first), Some(&last)) = (op_ids.as_slice().first(), op_ids.last()) else {
            return Ok(());
        };
        let expected = op_ids.len();
        let mut pooled = self.pool.get().await.map_err(map_pool_error)?;
        let conn: &mut SqliteConn = &mut pooled;

        let deleted = conn
            .transaction(|conn| {
                async move {
                    diesel::delete(
                        pending_mutations::table.filter(
                            pending_mutations::op_id
                                .ge(first)
                                .and(pending_mutations::op_id.le(last)),
                        ),
                    )
                    .execute(conn)
                    .await
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        if deleted != expected {
            warn!(
                batch_id = %batch.id(),
                expected,
                deleted,
                "committed batch evicted an unexpected number of mutations"
            );
        }
        Ok(())
    }

    async fn rollback(&self, batch: &UploadBatch) -> Result<(), MutationQueueError> {
        // Nothing is leased, so the mutations are already at the queue head.
        debug!(batch_id = %batch.id(), batch_size = batch.len(), "released upload batch");
        Ok(())
    }

    async fn pending_count(&self) -> Result<u64, MutationQueueError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let count: i64 = pending_mutations::table
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}
