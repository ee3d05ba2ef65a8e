//! Inbound adapters.
//!
//! The command line is the only driving adapter. It talks to the domain
//! through [`crate::domain::TodoService`] and the uploader, never to the
//! stores directly.

pub mod cli;
