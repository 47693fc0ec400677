//! Table declarations and versioned migration.
//!
//! Every table and column records the schema version that introduced it.
//! Creating a store at version N emits only what existed at N, and upgrading
//! from N to M walks an explicit, ordered list of steps, one version at a
//! time. Steps are additive; when the engine refuses an added column the
//! table is dropped and rebuilt, which discards its rows. That fallback is
//! logged and reported so it never happens silently.

use std::fmt;

use log::{debug, warn};
use rusqlite::Connection;

use crate::error::{Result, SqlContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    /// Type and constraints, e.g. `TEXT NOT NULL DEFAULT ''`.
    pub definition: &'static str,
    /// Schema version that introduced the column.
    pub since: u32,
}

impl Column {
    pub const fn new(name: &'static str, definition: &'static str, since: u32) -> Self {
        Self {
            name,
            definition,
            since,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
    /// Table-level constraint clause, empty when there is none.
    pub constraints: &'static str,
    pub since: u32,
}

impl Table {
    pub fn columns_at(&self, version: u32) -> impl Iterator<Item = &Column> + '_ {
        self.columns.iter().filter(move |c| c.since <= version)
    }

    pub fn create_sql(&self, version: u32) -> String {
        let mut parts: Vec<String> = self
            .columns_at(version)
            .map(|c| format!("{} {}", c.name, c.definition))
            .collect();
        if !self.constraints.is_empty() {
            parts.push(self.constraints.to_string());
        }
        format!("CREATE TABLE {} ({})", self.name, parts.join(", "))
    }

    fn add_column_sql(&self, column: &Column) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            self.name, column.name, column.definition
        )
    }

    fn create(&self, conn: &Connection, version: u32) -> Result<()> {
        debug!("creating table {} at version {version}", self.name);
        conn.execute_batch(&self.create_sql(version))
            .context("failed to create table")
    }

    fn recreate(&self, conn: &Connection, version: u32) -> Result<()> {
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", self.name))
            .context("failed to drop table")?;
        self.create(conn, version)
    }
}

/// A read-only SQL view rebuilt from scratch whenever the schema changes.
#[derive(Debug, Clone, Copy)]
pub struct DerivedView {
    pub name: &'static str,
    /// Builds the `CREATE VIEW` statement for a schema version.
    pub build: fn(u32) -> String,
}

#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub version: u32,
    pub tables: &'static [Table],
    pub views: &'static [DerivedView],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStep<'a> {
    CreateTable {
        table: &'a Table,
        version: u32,
    },
    AddColumn {
        table: &'a Table,
        column: &'a Column,
        version: u32,
    },
}

impl fmt::Display for MigrationStep<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationStep::CreateTable { table, version } => {
                write!(f, "v{version}: create {}", table.name)
            }
            MigrationStep::AddColumn {
                table,
                column,
                version,
            } => write!(f, "v{version}: add {}.{}", table.name, column.name),
        }
    }
}

/// Outcome of an upgrade. `recreated` lists tables whose rows were lost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeReport {
    pub from: u32,
    pub to: u32,
    pub recreated: Vec<&'static str>,
}

impl UpgradeReport {
    pub fn lost_data(&self) -> bool {
        !self.recreated.is_empty()
    }
}

impl Schema {
    /// Create every table and derived view as they were at `version`.
    pub fn create(&self, conn: &Connection, version: u32) -> Result<()> {
        for table in self.tables.iter().filter(|t| t.since <= version) {
            table.create(conn, version)?;
        }
        self.create_views(conn, version)
    }

    /// Ordered steps taking a store from `from` to `to`.
    pub fn plan(&self, from: u32, to: u32) -> Vec<MigrationStep<'_>> {
        let mut steps = Vec::new();
        for version in from + 1..=to {
            for table in self.tables {
                if table.since == version {
                    steps.push(MigrationStep::CreateTable { table, version });
                } else if table.since < version {
                    steps.extend(
                        table
                            .columns
                            .iter()
                            .filter(|c| c.since == version)
                            .map(|column| MigrationStep::AddColumn {
                                table,
                                column,
                                version,
                            }),
                    );
                }
            }
        }
        steps
    }

    /// Bring a store at `from` up to `self.version`. Callers are expected to
    /// wrap this in a transaction with foreign keys disabled.
    pub fn upgrade(&self, conn: &Connection, from: u32) -> Result<UpgradeReport> {
        let to = self.version;
        let mut report = UpgradeReport {
            from,
            to,
            recreated: Vec::new(),
        };

        self.drop_views(conn)?;
        for step in self.plan(from, to) {
            debug!("migration step {step}");
            match step {
                MigrationStep::CreateTable { table, version } => table.create(conn, version)?,
                MigrationStep::AddColumn { table, column, .. } => {
                    if report.recreated.contains(&table.name) {
                        continue;
                    }
                    if let Err(err) = conn.execute_batch(&table.add_column_sql(column)) {
                        warn!(
                            "cannot add column {}.{} ({err}); recreating table {} at version {to}, existing rows are discarded",
                            table.name, column.name, table.name
                        );
                        table.recreate(conn, to)?;
                        report.recreated.push(table.name);
                    }
                }
            }
        }
        self.create_views(conn, to)?;

        Ok(report)
    }

    fn create_views(&self, conn: &Connection, version: u32) -> Result<()> {
        for view in self.views {
            debug!("creating view {} at version {version}", view.name);
            conn.execute_batch(&(view.build)(version))
                .context("failed to create derived view")?;
        }
        Ok(())
    }

    fn drop_views(&self, conn: &Connection) -> Result<()> {
        for view in self.views {
            conn.execute_batch(&format!("DROP VIEW IF EXISTS {}", view.name))
                .context("failed to drop derived view")?;
        }
        Ok(())
    }
}

pub const BOOKS: Table = Table {
    name: "books",
    columns: &[
        Column::new("id", "INTEGER PRIMARY KEY AUTOINCREMENT", 1),
        Column::new("volume_id", "TEXT DEFAULT NULL UNIQUE", 1),
        Column::new("isbn", "TEXT DEFAULT NULL UNIQUE", 1),
        Column::new("title", "TEXT NOT NULL DEFAULT ''", 1),
        Column::new("subtitle", "TEXT NOT NULL DEFAULT ''", 1),
        Column::new("description", "TEXT NOT NULL DEFAULT ''", 1),
        Column::new("small_thumb", "TEXT NOT NULL DEFAULT ''", 1),
        Column::new("large_thumb", "TEXT NOT NULL DEFAULT ''", 1),
        Column::new("page_count", "INTEGER NOT NULL DEFAULT 0", 2),
    ],
    constraints: "",
    since: 1,
};

// Authors are keyed by name only; two people sharing a name are one row.
pub const AUTHORS: Table = Table {
    name: "authors",
    columns: &[
        Column::new("id", "INTEGER PRIMARY KEY AUTOINCREMENT", 1),
        Column::new("last_name", "TEXT NOT NULL", 1),
        Column::new("remainder", "TEXT NOT NULL DEFAULT ''", 1),
    ],
    constraints: "UNIQUE (last_name, remainder)",
    since: 1,
};

pub const BOOK_AUTHORS: Table = Table {
    name: "book_authors",
    columns: &[
        Column::new("id", "INTEGER PRIMARY KEY AUTOINCREMENT", 1),
        Column::new("book_id", "INTEGER NOT NULL REFERENCES books(id)", 1),
        Column::new("author_id", "INTEGER NOT NULL REFERENCES authors(id)", 1),
    ],
    constraints: "UNIQUE (book_id, author_id)",
    since: 1,
};

pub const VIEWS: Table = Table {
    name: "views",
    columns: &[
        Column::new("id", "INTEGER PRIMARY KEY AUTOINCREMENT", 1),
        Column::new("name", "TEXT NOT NULL", 1),
        Column::new("display_order", "INTEGER NOT NULL", 1),
        Column::new("sort", "TEXT NOT NULL DEFAULT 'added'", 1),
    ],
    constraints: "",
    since: 1,
};

pub const BOOK_VIEWS: Table = Table {
    name: "book_views",
    columns: &[
        Column::new("id", "INTEGER PRIMARY KEY AUTOINCREMENT", 1),
        Column::new("book_id", "INTEGER NOT NULL REFERENCES books(id)", 1),
        Column::new("view_id", "INTEGER NOT NULL REFERENCES views(id)", 1),
        Column::new("is_selected", "INTEGER NOT NULL DEFAULT 0", 1),
        Column::new("is_open", "INTEGER NOT NULL DEFAULT 0", 1),
    ],
    constraints: "UNIQUE (book_id, view_id)",
    since: 1,
};

pub const BOOK_AUTHORS_VIEW: DerivedView = DerivedView {
    name: "book_authors_view",
    build: book_authors_view_sql,
};

/// The application schema.
pub static SCHEMA: Schema = Schema {
    version: 2,
    tables: &[BOOKS, AUTHORS, BOOK_AUTHORS, VIEWS, BOOK_VIEWS],
    views: &[BOOK_AUTHORS_VIEW],
};

/// Every book column plus `all_authors`, the book's authors in link order.
fn book_authors_view_sql(version: u32) -> String {
    let columns = BOOKS
        .columns_at(version)
        .map(|c| format!("books.{0} AS {0}", c.name))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE VIEW book_authors_view AS
         SELECT {columns},
                COALESCE(GROUP_CONCAT(
                    CASE WHEN authors.remainder = '' THEN authors.last_name
                         ELSE authors.last_name || ', ' || authors.remainder END,
                    ',' || char(10) ORDER BY book_authors.id), '') AS all_authors
         FROM books
         LEFT JOIN book_authors ON book_authors.book_id = books.id
         LEFT JOIN authors ON authors.id = book_authors.author_id
         GROUP BY books.id"
    )
}
