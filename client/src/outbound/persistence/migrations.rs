//! Embedded schema migrations for the SQLite cache.

use diesel::Connection;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

use super::pool::PoolError;

/// Embedded migrations from the client/migrations directory.
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Apply pending migrations to the database at `database_url`.
///
/// Runs on the blocking thread pool with its own connection, so it must be
/// called before the pool hands out connections.
///
/// # Errors
///
/// Returns `PoolError::Build` when the database cannot be opened or a
/// migration fails.
pub async fn run_migrations(database_url: &str) -> Result<(), PoolError> {
    let url = database_url.to_owned();
    let applied = tokio::task::spawn_blocking(move || -> Result<usize, String> {
        let mut conn = SqliteConnection::establish(&url).map_err(|err| err.to_string())?;
        conn.run_pending_migrations(MIGRATIONS)
            .map(|versions| versions.len())
            .map_err(|err| err.to_string())
    })
    .await
    .map_err(|err| PoolError::build(format!("migration task failed: {err}")))?
    .map_err(|message| PoolError::build(format!("migration failed: {message}")))?;

    info!(applied, "database migrations applied");
    Ok(())
}
