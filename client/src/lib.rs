//! Offline todo client library.
//!
//! Lists and todos live in a local SQLite cache. Every local write also
//! appends a pending mutation; the write-queue uploader replays those
//! mutations against a PostgREST remote in bounded, all-or-nothing batches.

pub mod config;
pub mod domain;
pub mod inbound;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use config::{SettingsError, SyncSettings};
