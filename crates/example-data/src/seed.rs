//! Generated list seed types.
//!
//! These are plain values; the client turns them into local writes so the
//! seeded rows are queued for upload like any other edit.

use serde::{Deserialize, Serialize};

/// A generated todo item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExampleTodoSeed {
    /// Todo description.
    pub description: String,
    /// Whether the todo starts out done.
    pub completed: bool,
}

/// A generated todo list with its items.
///
/// # Example
///
/// ```
/// use example_data::{ExampleListSeed, ExampleTodoSeed};
///
/// let list = ExampleListSeed {
///     name: "Groceries".to_owned(),
///     todos: vec![ExampleTodoSeed {
///         description: "Buy milk".to_owned(),
///         completed: false,
///     }],
/// };
///
/// assert_eq!(list.todos.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExampleListSeed {
    /// List name.
    pub name: String,
    /// Items in creation order.
    pub todos: Vec<ExampleTodoSeed>,
}
