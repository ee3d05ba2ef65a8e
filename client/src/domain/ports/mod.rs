//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Each trait exposes strongly typed errors so adapters map their failures
//! into predictable variants.

mod macros;
pub(crate) use macros::define_port_error;

mod credentials_provider;
mod mutation_queue;
mod remote_store;
mod todo_store;

#[cfg(test)]
pub use credentials_provider::MockCredentialsProvider;
pub use credentials_provider::{
    AccessToken, CredentialsError, CredentialsProvider, FixtureCredentialsProvider,
    RemoteCredentials,
};
#[cfg(test)]
pub use mutation_queue::MockMutationQueue;
pub use mutation_queue::{FixtureMutationQueue, MutationQueue, MutationQueueError};
#[cfg(test)]
pub use remote_store::MockRemoteStore;
pub use remote_store::{FixtureRemoteStore, RemoteStore, RemoteStoreError};
#[cfg(test)]
pub use todo_store::MockTodoStore;
pub use todo_store::{FixtureTodoStore, StoreCounts, TodoStore, TodoStoreError};
