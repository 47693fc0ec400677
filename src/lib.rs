//! Local data layer for a personal book collection.
//!
//! Books found through an ISBN lookup are stored with their authors and
//! organised into views (tabs such as "Owned" and "Wishlist"). The store is
//! an embedded SQLite file whose schema is created and migrated on open.
pub mod config;
pub mod db;
pub mod error;
pub mod lookup;
pub mod models;
pub mod queue;

/// The store and the query helpers most callers need.
pub use db::{split_author_name, BookDatabase, CancellationSignal, SortOrder, UpgradeReport};

pub use config::{DatabaseConfig, ViewSeed};
pub use error::{Error, Result};
pub use models::{Author, AuthorName, BookRecord, NewBook, View};
pub use queue::SerialQueue;
