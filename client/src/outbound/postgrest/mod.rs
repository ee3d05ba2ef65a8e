//! PostgREST outbound adapter.
//!
//! This module provides a thin HTTP implementation of the `RemoteStore`
//! port for Supabase-style REST endpoints.

mod http_remote_store;

pub use http_remote_store::PostgrestRemoteStore;
