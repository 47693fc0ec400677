//! Where the store lives and which views a fresh store starts with.

use std::path::PathBuf;

use directories::BaseDirs;

use crate::db::SortOrder;
use crate::error::{Error, Result};

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".bibliotech";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "books.sqlite";
/// Path SQLite treats as a private in-memory store.
const IN_MEMORY_PATH: &str = ":memory:";

/// A view inserted when the store is first created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSeed {
    pub name: String,
    pub order: i64,
    pub sort: SortOrder,
}

impl ViewSeed {
    /// A seed sorted by insertion order.
    pub fn new(name: impl Into<String>, order: i64) -> Self {
        Self {
            name: name.into(),
            order,
            sort: SortOrder::default(),
        }
    }
}

/// How to open a store. The default is in-memory; use `default_location`
/// or `at` for a file that persists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Store file. Ignored by `BookDatabase::open_in_memory`.
    pub path: PathBuf,
    pub seed_views: Vec<ViewSeed>,
}

impl DatabaseConfig {
    /// Store at an explicit path with the default seed views.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            seed_views: default_seed_views(),
        }
    }

    /// A store that lives only as long as its connection.
    pub fn in_memory() -> Self {
        Self::at(IN_MEMORY_PATH)
    }

    /// Store under the user's home directory.
    pub fn default_location() -> Result<Self> {
        let base_dirs = BaseDirs::new().ok_or(Error::NoHomeDirectory)?;
        Ok(Self::at(
            base_dirs.home_dir().join(DATA_DIR_NAME).join(DB_FILE_NAME),
        ))
    }

    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str() == IN_MEMORY_PATH
    }

    /// Replace the views a fresh store is seeded with.
    pub fn with_seed_views(mut self, seed_views: Vec<ViewSeed>) -> Self {
        self.seed_views = seed_views;
        self
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

fn default_seed_views() -> Vec<ViewSeed> {
    vec![ViewSeed::new("Owned", 0), ViewSeed::new("Wishlist", 1)]
}
