//! Built-in registry and the fixed demo data.

use crate::error::RegistryError;
use crate::registry::SeedRegistry;
use crate::seed::{ExampleListSeed, ExampleTodoSeed};

/// Name of the seed bundled with the built-in registry.
pub const BUILTIN_SEED_NAME: &str = "demo";

const BUILTIN_REGISTRY_JSON: &str = r#"{
    "version": 1,
    "listNames": [
        "My First List",
        "Work Tasks",
        "Personal Goals",
        "Groceries",
        "Weekend Chores",
        "Reading List"
    ],
    "todoDescriptions": [
        "Set up PowerSync integration",
        "Test offline synchronization",
        "Build React UI",
        "Review pull requests",
        "Book dentist appointment",
        "Buy oat milk",
        "Water the plants",
        "Run 5 km",
        "Finish the quarterly report",
        "Call the bank",
        "Clean the garage",
        "Read two chapters"
    ],
    "seeds": [
        {"name": "demo", "seed": 2026, "listCount": 3, "todosPerList": 3}
    ]
}"#;

impl SeedRegistry {
    /// Returns the registry bundled with the crate.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] only if the bundled JSON is invalid.
    ///
    /// ```
    /// use example_data::{BUILTIN_SEED_NAME, SeedRegistry};
    ///
    /// let registry = SeedRegistry::builtin().expect("bundled registry");
    /// assert!(registry.find_seed(BUILTIN_SEED_NAME).is_ok());
    /// ```
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_json(BUILTIN_REGISTRY_JSON)
    }
}

/// The starter lists shown by the demo: three lists, with three open todos
/// in the first one.
///
/// ```
/// let lists = example_data::demo_lists();
/// assert_eq!(lists.len(), 3);
/// assert_eq!(lists.first().map(|list| list.name.as_str()), Some("My First List"));
/// ```
#[must_use]
pub fn demo_lists() -> Vec<ExampleListSeed> {
    let open = |description: &str| ExampleTodoSeed {
        description: description.to_owned(),
        completed: false,
    };
    vec![
        ExampleListSeed {
            name: "My First List".to_owned(),
            todos: vec![
                open("Set up PowerSync integration"),
                open("Test offline synchronization"),
                open("Build React UI"),
            ],
        },
        ExampleListSeed {
            name: "Work Tasks".to_owned(),
            todos: Vec::new(),
        },
        ExampleListSeed {
            name: "Personal Goals".to_owned(),
            todos: Vec::new(),
        },
    ]
}
