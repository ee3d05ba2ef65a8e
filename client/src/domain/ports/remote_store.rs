//! Driven port for the remote relational store.
//!
//! The uploader only ever issues three call shapes: an upsert keyed by the
//! primary key, an update filtered by the primary key and a delete filtered
//! by the primary key. Adapters own transport, authentication and status
//! mapping.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{RecordId, RecordPayload, RemoteResource};

define_port_error! {
    /// Errors surfaced while calling the remote store.
    pub enum RemoteStoreError {
        /// The request never produced a usable response.
        Transport { message: String } => "remote transport failed: {message}",
        /// The call exceeded its deadline.
        Timeout { message: String } => "remote call timed out: {message}",
        /// The remote refused the credentials.
        Unauthorized { message: String } => "remote rejected credentials: {message}",
        /// A foreign key, unique or check constraint was violated.
        Constraint { message: String } => "remote constraint violated: {message}",
        /// The remote rejected the request for another reason.
        Rejected { message: String } => "remote rejected request: {message}",
        /// Credentials could not be obtained before the call.
        Credentials { message: String } => "remote credentials unavailable: {message}",
    }
}

impl RemoteStoreError {
    /// Return whether retrying the same call later is expected to help.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Timeout { .. } | Self::Credentials { .. }
        )
    }
}

/// Port for replaying mutations against the remote store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Insert `record`, or merge it into the row with the same primary key.
    async fn upsert(
        &self,
        resource: &RemoteResource,
        record: &RecordPayload,
    ) -> Result<(), RemoteStoreError>;

    /// Update the row whose primary key equals `record_id`.
    async fn update(
        &self,
        resource: &RemoteResource,
        record_id: &RecordId,
        changes: &RecordPayload,
    ) -> Result<(), RemoteStoreError>;

    /// Delete the row whose primary key equals `record_id`.
    async fn delete(
        &self,
        resource: &RemoteResource,
        record_id: &RecordId,
    ) -> Result<(), RemoteStoreError>;
}

/// Fixture remote that accepts every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureRemoteStore;

#[async_trait]
impl RemoteStore for FixtureRemoteStore {
    async fn upsert(
        &self,
        _resource: &RemoteResource,
        _record: &RecordPayload,
    ) -> Result<(), RemoteStoreError> {
        Ok(())
    }

    async fn update(
        &self,
        _resource: &RemoteResource,
        _record_id: &RecordId,
        _changes: &RecordPayload,
    ) -> Result<(), RemoteStoreError> {
        Ok(())
    }

    async fn delete(
        &self,
        _resource: &RemoteResource,
        _record_id: &RecordId,
    ) -> Result<(), RemoteStoreError> {
        Ok(())
    }
}
