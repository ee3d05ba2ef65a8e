//! Error types for the example-data crate.
//!
//! Semantic error enums for registry parsing and list generation, built
//! with `thiserror`.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur when loading, parsing or querying a seed registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The registry file could not be read.
    #[error("failed to read registry file at '{path}': {message}")]
    IoError {
        /// Path to the registry file.
        path: Utf8PathBuf,
        /// Description of the I/O error.
        message: String,
    },

    /// The registry JSON is malformed or missing required fields.
    #[error("invalid registry JSON: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
    },

    /// The registry version is not supported.
    #[error("unsupported registry version: expected {expected}, found {actual}")]
    UnsupportedVersion {
        /// Expected version number.
        expected: u32,
        /// Actual version found in the registry.
        actual: u32,
    },

    /// A list name is blank, padded or too long.
    #[error("invalid list name at index {index}: '{value}'")]
    InvalidListName {
        /// Index of the invalid name in the array.
        index: usize,
        /// The invalid name.
        value: String,
    },

    /// A todo description is blank, padded or too long.
    #[error("invalid todo description at index {index}: '{value}'")]
    InvalidTodoDescription {
        /// Index of the invalid description in the array.
        index: usize,
        /// The invalid description.
        value: String,
    },

    /// The registry offers no list names.
    #[error("registry contains no list names")]
    EmptyListNames,

    /// The registry contains no seed definitions.
    #[error("registry contains no seed definitions")]
    EmptySeeds,

    /// The requested seed name was not found in the registry.
    #[error("seed '{name}' not found in registry")]
    SeedNotFound {
        /// The seed name that was not found.
        name: String,
    },
}

/// Errors that can occur during list generation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// The seed asks for more lists than the registry has names.
    #[error("seed requests {requested} lists but the registry has {available} names")]
    NotEnoughListNames {
        /// Lists requested by the seed.
        requested: usize,
        /// Names available in the registry.
        available: usize,
    },

    /// The seed asks for more todos per list than the registry has descriptions.
    #[error("seed requests {requested} todos per list but the registry has {available} descriptions")]
    NotEnoughTodoDescriptions {
        /// Todos per list requested by the seed.
        requested: usize,
        /// Descriptions available in the registry.
        available: usize,
    },
}
