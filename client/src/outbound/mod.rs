//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: SQLite cache and write queue using Diesel
//! - **postgrest**: reqwest-backed remote store for PostgREST endpoints
//! - **credentials**: start-up configured credentials provider
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod credentials;
pub mod persistence;
pub mod postgrest;
