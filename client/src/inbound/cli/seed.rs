//! `seed` command: insert sample lists through the todo service.
//!
//! Rows are written with the same service calls a user would make, so every
//! seeded list and todo is queued for upload.

use camino::Utf8PathBuf;
use clap::Args;
use example_data::{
    ExampleListSeed, GenerationError, RegistryError, SeedRegistry, demo_lists,
    generate_example_lists,
};
use tracing::info;

use crate::domain::{Error, TodoService};

/// Arguments for `todo-sync seed`.
#[derive(Debug, Clone, Default, Args)]
pub struct SeedArgs {
    /// Named seed to generate from. Without it the fixed demo lists are used.
    #[arg(long, value_name = "seed")]
    pub name: Option<String>,
    /// Registry JSON holding the named seed. Defaults to the built-in one.
    #[arg(long, value_name = "path", requires = "name")]
    pub registry: Option<Utf8PathBuf>,
}

/// Errors raised while seeding.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SeedError {
    /// The registry could not be loaded or lacks the seed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// The seed asks for more data than the registry offers.
    #[error(transparent)]
    Generation(#[from] GenerationError),
    /// A generated row was rejected by the todo service.
    #[error(transparent)]
    Domain(#[from] Error),
}

/// How much was inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Lists created.
    pub lists: usize,
    /// Todos created.
    pub todos: usize,
}

pub(super) async fn seed(service: &TodoService, args: &SeedArgs) -> Result<SeedReport, SeedError> {
    let lists = match &args.name {
        None => demo_lists(),
        Some(name) => {
            let registry = match &args.registry {
                Some(path) => SeedRegistry::from_ambient_path(path)?,
                None => SeedRegistry::builtin()?,
            };
            let seed_def = registry.find_seed(name)?;
            generate_example_lists(&registry, seed_def)?
        }
    };
    insert(service, lists).await
}

async fn insert(
    service: &TodoService,
    lists: Vec<ExampleListSeed>,
) -> Result<SeedReport, SeedError> {
    let mut report = SeedReport::default();
    for seed_list in lists {
        let list = service.create_list(&seed_list.name).await?;
        report.lists += 1;
        for seed_todo in seed_list.todos {
            let todo = service.create_todo(&list.id, &seed_todo.description).await?;
            if seed_todo.completed {
                service.set_completed(&todo.id, true).await?;
            }
            report.todos += 1;
        }
    }
    info!(lists = report.lists, todos = report.todos, "sample data seeded");
    Ok(report)
}
