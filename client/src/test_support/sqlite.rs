//! Throwaway SQLite databases for adapter and end-to-end tests.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::outbound::persistence::{DbPool, PoolConfig, PoolError, run_migrations};

/// A database file inside a temporary directory removed on drop.
pub struct TempDatabase {
    _dir: TempDir,
    path: PathBuf,
}

impl TempDatabase {
    /// Reserve a fresh database path. The file is created on first connect.
    pub fn new() -> io::Result<Self> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("todo-sync.db");
        Ok(Self { _dir: dir, path })
    }

    /// Location of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Connection string accepted by the pool and the migration runner.
    pub fn url(&self) -> String {
        self.path.display().to_string()
    }

    /// Run migrations and open a single-connection pool.
    pub async fn migrated_pool(&self) -> Result<DbPool, PoolError> {
        let url = self.url();
        run_migrations(&url).await?;
        DbPool::new(PoolConfig::new(url)).await
    }
}
