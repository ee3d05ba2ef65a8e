//! Deterministic sample todo lists for demonstration purposes.
//!
//! This crate generates believable, reproducible lists and todos from a JSON
//! seed registry. It is independent of the client's domain types so the
//! client can depend on it without a cycle.
//!
//! # Overview
//!
//! The crate supports:
//!
//! - Loading seed registries from JSON files or the built-in registry
//! - Deterministic list generation using named seeds
//! - Text validation matching the client's list name and description rules
//! - The fixed starter data used by the demo
//!
//! # Example
//!
//! ```
//! use example_data::{SeedRegistry, generate_example_lists};
//!
//! let json = r#"{
//!     "version": 1,
//!     "listNames": ["Groceries", "Chores"],
//!     "todoDescriptions": ["Buy milk", "Water plants", "Call the bank"],
//!     "seeds": [{"name": "test-seed", "seed": 42, "listCount": 2, "todosPerList": 2}]
//! }"#;
//!
//! let registry = SeedRegistry::from_json(json).expect("valid registry");
//! let seed_def = registry.find_seed("test-seed").expect("seed exists");
//! let lists = generate_example_lists(&registry, seed_def).expect("generation succeeds");
//!
//! assert_eq!(lists.len(), 2);
//! ```

mod builtin;
mod error;
mod generator;
mod registry;
mod seed;
mod validation;

pub use builtin::{BUILTIN_SEED_NAME, demo_lists};
pub use error::{GenerationError, RegistryError};
pub use generator::generate_example_lists;
pub use registry::{SeedDefinition, SeedRegistry};
pub use seed::{ExampleListSeed, ExampleTodoSeed};
pub use validation::{TEXT_MAX_CHARS, is_valid_text};
