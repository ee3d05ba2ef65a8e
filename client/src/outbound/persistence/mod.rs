//! SQLite persistence adapters for the local cache and write queue.
//!
//! The cache tables (`lists`, `todos`) and the `pending_mutations` queue live
//! in one SQLite file so a local write and its queue entry commit together.
//!
//! # Example
//!
//! ```ignore
//! use client::outbound::persistence::{DbPool, PoolConfig, SqliteMutationQueue};
//!
//! run_migrations("todo.db").await?;
//! let pool = DbPool::new(PoolConfig::new("todo.db")).await?;
//! let queue = SqliteMutationQueue::new(pool);
//! ```

mod diesel_basic_error_mapping;
mod migrations;
mod models;
mod pool;
mod schema;
mod sqlite_mutation_queue;
mod sqlite_todo_store;

pub use migrations::run_migrations;
pub use pool::{DbPool, PoolConfig, PoolError, SqliteConn};
pub use sqlite_mutation_queue::SqliteMutationQueue;
pub use sqlite_todo_store::SqliteTodoStore;
