//! Deterministic list generation from seed definitions.
//!
//! The same seed definition and registry always produce identical lists.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::GenerationError;
use crate::registry::{SeedDefinition, SeedRegistry};
use crate::seed::{ExampleListSeed, ExampleTodoSeed};

/// Chance that a generated todo starts out completed (one in four).
const COMPLETED_NUMERATOR: u32 = 1;

/// Denominator for the completed chance.
const COMPLETED_DENOMINATOR: u32 = 4;

/// Generates example lists from a seed definition.
///
/// The seed value initialises a ChaCha8 RNG. Generated lists have:
///
/// - Distinct names drawn from the registry's list names
/// - `todos_per_list` distinct descriptions drawn from the registry
/// - Roughly one todo in four already completed
///
/// # Errors
///
/// Returns [`GenerationError`] when the seed asks for more lists or todos
/// per list than the registry vocabulary can supply without repeats.
///
/// # Example
///
/// ```
/// use example_data::{SeedRegistry, generate_example_lists};
///
/// let json = r#"{
///     "version": 1,
///     "listNames": ["Groceries", "Chores", "Garden"],
///     "todoDescriptions": ["Buy milk", "Sweep", "Weed beds"],
///     "seeds": [{"name": "test", "seed": 42, "listCount": 2, "todosPerList": 3}]
/// }"#;
///
/// let registry = SeedRegistry::from_json(json).expect("valid");
/// let seed_def = registry.find_seed("test").expect("found");
/// let lists = generate_example_lists(&registry, seed_def).expect("generated");
///
/// assert_eq!(lists.len(), 2);
/// // Same seed produces identical lists
/// let again = generate_example_lists(&registry, seed_def).expect("generated");
/// assert_eq!(lists, again);
/// ```
pub fn generate_example_lists(
    registry: &SeedRegistry,
    seed_def: &SeedDefinition,
) -> Result<Vec<ExampleListSeed>, GenerationError> {
    let names = registry.list_names();
    if seed_def.list_count() > names.len() {
        return Err(GenerationError::NotEnoughListNames {
            requested: seed_def.list_count(),
            available: names.len(),
        });
    }
    let descriptions = registry.todo_descriptions();
    if seed_def.todos_per_list() > descriptions.len() {
        return Err(GenerationError::NotEnoughTodoDescriptions {
            requested: seed_def.todos_per_list(),
            available: descriptions.len(),
        });
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed_def.seed());
    let chosen_names = choose_distinct(&mut rng, names, seed_def.list_count());

    Ok(chosen_names
        .into_iter()
        .map(|name| ExampleListSeed {
            name,
            todos: generate_todos(&mut rng, descriptions, seed_def.todos_per_list()),
        })
        .collect())
}

fn generate_todos(
    rng: &mut ChaCha8Rng,
    descriptions: &[String],
    count: usize,
) -> Vec<ExampleTodoSeed> {
    choose_distinct(rng, descriptions, count)
        .into_iter()
        .map(|description| ExampleTodoSeed {
            description,
            completed: rng.random_ratio(COMPLETED_NUMERATOR, COMPLETED_DENOMINATOR),
        })
        .collect()
}

/// Shuffles a copy of `values` and keeps the first `count`.
fn choose_distinct(rng: &mut ChaCha8Rng, values: &[String], count: usize) -> Vec<String> {
    let mut shuffled = values.to_vec();
    shuffled.shuffle(rng);
    shuffled.truncate(count);
    shuffled
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rstest::{fixture, rstest};

    use super::*;

    const TEST_REGISTRY_JSON: &str = r#"{
        "version": 1,
        "listNames": ["Groceries", "Chores", "Garden", "Work", "Travel"],
        "todoDescriptions": [
            "Buy milk", "Sweep", "Weed beds", "File taxes", "Pack bags", "Book hotel"
        ],
        "seeds": [
            {"name": "test-seed", "seed": 42, "listCount": 4, "todosPerList": 5},
            {"name": "small-seed", "seed": 123, "listCount": 2, "todosPerList": 1},
            {"name": "greedy-seed", "seed": 7, "listCount": 9, "todosPerList": 1},
            {"name": "wordy-seed", "seed": 7, "listCount": 1, "todosPerList": 9}
        ]
    }"#;

    #[fixture]
    fn test_registry() -> SeedRegistry {
        SeedRegistry::from_json(TEST_REGISTRY_JSON).expect("valid test registry")
    }

    fn generate(registry: &SeedRegistry, name: &str) -> Vec<ExampleListSeed> {
        let seed_def = registry.find_seed(name).expect("seed found");
        generate_example_lists(registry, seed_def).expect("generated")
    }

    #[rstest]
    fn generates_requested_shape(test_registry: SeedRegistry) {
        let lists = generate(&test_registry, "test-seed");

        assert_eq!(lists.len(), 4);
        assert!(lists.iter().all(|list| list.todos.len() == 5));
    }

    #[rstest]
    fn generation_is_deterministic(test_registry: SeedRegistry) {
        assert_eq!(
            generate(&test_registry, "test-seed"),
            generate(&test_registry, "test-seed")
        );
    }

    #[rstest]
    fn list_names_are_distinct_and_from_the_registry(test_registry: SeedRegistry) {
        let lists = generate(&test_registry, "test-seed");
        let known: HashSet<_> = test_registry.list_names().iter().collect();
        let names: HashSet<_> = lists.iter().map(|list| &list.name).collect();

        assert_eq!(names.len(), lists.len());
        assert!(names.iter().all(|name| known.contains(name)));
    }

    #[rstest]
    fn todo_descriptions_do_not_repeat_within_a_list(test_registry: SeedRegistry) {
        for list in generate(&test_registry, "test-seed") {
            let descriptions: HashSet<_> =
                list.todos.iter().map(|todo| &todo.description).collect();
            assert_eq!(descriptions.len(), list.todos.len());
        }
    }

    #[rstest]
    fn rejects_seeds_that_need_more_names(test_registry: SeedRegistry) {
        let seed_def = test_registry.find_seed("greedy-seed").expect("seed found");
        assert_eq!(
            generate_example_lists(&test_registry, seed_def),
            Err(GenerationError::NotEnoughListNames {
                requested: 9,
                available: 5,
            })
        );
    }

    #[rstest]
    fn rejects_seeds_that_need_more_descriptions(test_registry: SeedRegistry) {
        let seed_def = test_registry.find_seed("wordy-seed").expect("seed found");
        assert_eq!(
            generate_example_lists(&test_registry, seed_def),
            Err(GenerationError::NotEnoughTodoDescriptions {
                requested: 9,
                available: 6,
            })
        );
    }
}
