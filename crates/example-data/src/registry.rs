//! Seed registry types and JSON parsing.
//!
//! A registry holds the vocabulary that generated lists draw from (list
//! names and todo descriptions) and a set of named seeds. Registries are
//! read through capability-based directory handles.

use camino::Utf8Path;
use cap_std::{ambient_authority, fs::Dir};
use serde::Deserialize;

use crate::error::RegistryError;
use crate::validation::is_valid_text;

/// Current supported registry version.
const SUPPORTED_VERSION: u32 = 1;

/// A seed registry containing vocabulary and named seeds.
///
/// # Example
///
/// ```
/// use example_data::SeedRegistry;
///
/// let json = r#"{
///     "version": 1,
///     "listNames": ["Groceries"],
///     "todoDescriptions": ["Buy milk"],
///     "seeds": [{"name": "test", "seed": 42, "listCount": 1, "todosPerList": 1}]
/// }"#;
///
/// let registry = SeedRegistry::from_json(json).expect("valid registry");
/// assert_eq!(registry.seeds().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedRegistry {
    version: u32,
    list_names: Vec<String>,
    todo_descriptions: Vec<String>,
    seeds: Vec<SeedDefinition>,
}

impl SeedRegistry {
    /// Parses a seed registry from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if:
    /// - The JSON is malformed
    /// - Required fields are missing
    /// - The version is unsupported
    /// - Any list name or todo description is invalid
    /// - The list names or seeds arrays are empty
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let raw: RawSeedRegistry =
            serde_json::from_str(json).map_err(|e| RegistryError::ParseError {
                message: e.to_string(),
            })?;

        Self::from_raw(raw)
    }

    /// Loads a seed registry from `path` inside `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the file cannot be read or parsed.
    pub fn from_file(dir: &Dir, path: &Utf8Path) -> Result<Self, RegistryError> {
        let contents = dir
            .read_to_string(path)
            .map_err(|e| RegistryError::IoError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        Self::from_json(&contents)
    }

    /// Loads a seed registry from a path relative to the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the parent directory cannot be opened or
    /// the file cannot be read or parsed.
    pub fn from_ambient_path(path: &Utf8Path) -> Result<Self, RegistryError> {
        let (dir, file_name) = open_parent_dir(path)?;
        Self::from_file(&dir, file_name)
    }

    fn from_raw(raw: RawSeedRegistry) -> Result<Self, RegistryError> {
        if raw.version != SUPPORTED_VERSION {
            return Err(RegistryError::UnsupportedVersion {
                expected: SUPPORTED_VERSION,
                actual: raw.version,
            });
        }

        if let Some((index, value)) = first_invalid(&raw.list_names) {
            return Err(RegistryError::InvalidListName { index, value });
        }
        if raw.list_names.is_empty() {
            return Err(RegistryError::EmptyListNames);
        }
        if let Some((index, value)) = first_invalid(&raw.todo_descriptions) {
            return Err(RegistryError::InvalidTodoDescription { index, value });
        }
        if raw.seeds.is_empty() {
            return Err(RegistryError::EmptySeeds);
        }

        let seeds = raw
            .seeds
            .into_iter()
            .map(|s| SeedDefinition {
                name: s.name,
                seed: s.seed,
                list_count: s.list_count,
                todos_per_list: s.todos_per_list,
            })
            .collect();

        Ok(Self {
            version: raw.version,
            list_names: raw.list_names,
            todo_descriptions: raw.todo_descriptions,
            seeds,
        })
    }

    /// Returns the registry version.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Returns the list names generated lists draw from.
    #[must_use]
    pub fn list_names(&self) -> &[String] {
        &self.list_names
    }

    /// Returns the todo descriptions generated todos draw from.
    #[must_use]
    pub fn todo_descriptions(&self) -> &[String] {
        &self.todo_descriptions
    }

    /// Returns all seed definitions.
    #[must_use]
    pub fn seeds(&self) -> &[SeedDefinition] {
        &self.seeds
    }

    /// Finds a seed definition by name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::SeedNotFound`] if no seed with the given name
    /// exists.
    pub fn find_seed(&self, name: &str) -> Result<&SeedDefinition, RegistryError> {
        self.seeds
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| RegistryError::SeedNotFound {
                name: name.to_owned(),
            })
    }
}

/// Opens the directory holding `path` and returns it with the file name.
fn open_parent_dir(path: &Utf8Path) -> Result<(Dir, &Utf8Path), RegistryError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let file_name = path
        .file_name()
        .map(Utf8Path::new)
        .ok_or_else(|| RegistryError::IoError {
            path: path.to_path_buf(),
            message: "registry path must name a file".to_owned(),
        })?;
    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|err| {
        RegistryError::IoError {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    })?;
    Ok((dir, file_name))
}

fn first_invalid(values: &[String]) -> Option<(usize, String)> {
    values
        .iter()
        .enumerate()
        .find(|(_, value)| !is_valid_text(value))
        .map(|(index, value)| (index, value.clone()))
}

/// A named seed definition for deterministic list generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedDefinition {
    name: String,
    seed: u64,
    list_count: usize,
    todos_per_list: usize,
}

impl SeedDefinition {
    /// Creates a seed definition.
    #[must_use]
    pub const fn new(name: String, seed: u64, list_count: usize, todos_per_list: usize) -> Self {
        Self {
            name,
            seed,
            list_count,
            todos_per_list,
        }
    }

    /// Returns the seed name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the RNG seed value.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the number of lists to generate.
    #[must_use]
    pub const fn list_count(&self) -> usize {
        self.list_count
    }

    /// Returns the number of todos generated for each list.
    #[must_use]
    pub const fn todos_per_list(&self) -> usize {
        self.todos_per_list
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSeedRegistry {
    version: u32,
    list_names: Vec<String>,
    #[serde(default)]
    todo_descriptions: Vec<String>,
    seeds: Vec<RawSeedDefinition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSeedDefinition {
    name: String,
    seed: u64,
    list_count: usize,
    todos_per_list: usize,
}
