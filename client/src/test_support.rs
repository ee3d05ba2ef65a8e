//! Test utilities for the client crate.
//!
//! Shared by unit tests in `src/` and integration tests in `tests/`. Compiled
//! for tests and behind the `test-support` feature.

mod queue;
mod remote;
mod runtime;
mod sqlite;

pub use queue::InMemoryMutationQueue;
pub use remote::{InMemoryRemoteStore, RemoteCall};
pub use runtime::{ImmediateSleeper, MutableClock, NoJitter, PendingSleeper, RecordingSleeper};
pub use sqlite::TempDatabase;
