use std::fs;

use log::{debug, info};
use rusqlite::Connection;

use super::cancel::CancellationSignal;
use super::schema::{UpgradeReport, SCHEMA};
use super::views::create_view;
use crate::config::{DatabaseConfig, ViewSeed};
use crate::error::{Error, IoContext, Result, SqlContext};

/// An open book store. Creation and migration happen while opening; after
/// that every operation is a plain synchronous call on the one connection.
pub struct BookDatabase {
    conn: Connection,
    version: u32,
    upgrade: Option<UpgradeReport>,
}

impl BookDatabase {
    /// Open the store at `config.path`, creating or upgrading it as needed.
    /// An in-memory config opens a private in-memory store instead.
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        if config.is_in_memory() {
            return Self::open_in_memory(config);
        }

        if let Some(parent) = config.path.parent() {
            fs::create_dir_all(parent).context("failed to create data directory")?;
        }

        let conn = Connection::open(&config.path).context("failed to open SQLite database")?;
        debug!("opened book database at {}", config.path.display());
        Self::from_connection(conn, config)
    }

    /// A private in-memory store, seeded like a fresh file.
    pub fn open_in_memory(config: &DatabaseConfig) -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        Self::from_connection(conn, config)
    }

    /// Adopt an existing connection, creating or upgrading the schema.
    pub fn from_connection(conn: Connection, config: &DatabaseConfig) -> Result<Self> {
        // Table rebuilds during an upgrade must not trip foreign keys, and
        // the pragma is ignored inside a transaction.
        conn.execute_batch("PRAGMA foreign_keys = OFF")
            .context("failed to disable foreign keys")?;

        let found = user_version(&conn)?;
        let upgrade = if found == 0 {
            create(&conn, &config.seed_views)?;
            None
        } else if found < SCHEMA.version {
            Some(upgrade(&conn, found)?)
        } else if found > SCHEMA.version {
            return Err(Error::UnsupportedVersion {
                found,
                supported: SCHEMA.version,
            });
        } else {
            None
        };

        conn.execute_batch("PRAGMA foreign_keys = ON")
            .context("failed to enable foreign keys")?;

        Ok(Self {
            conn,
            version: SCHEMA.version,
            upgrade,
        })
    }

    /// Release the handle, surfacing any error the engine reports on close.
    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, err)| err)
            .context("failed to close database")
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// What the upgrade performed while opening, if one ran.
    pub fn upgrade_report(&self) -> Option<&UpgradeReport> {
        self.upgrade.as_ref()
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// A signal whose `cancel` also interrupts the statement running on this
    /// connection.
    pub fn cancellation_signal(&self) -> CancellationSignal {
        CancellationSignal::with_interrupt(self.conn.get_interrupt_handle())
    }
}

fn user_version(conn: &Connection) -> Result<u32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read schema version")
}

fn set_user_version(conn: &Connection, version: u32) -> Result<()> {
    conn.pragma_update(None, "user_version", version)
        .context("failed to write schema version")
}

fn create(conn: &Connection, seeds: &[ViewSeed]) -> Result<()> {
    let tx = conn
        .unchecked_transaction()
        .context("failed to begin schema creation")?;

    SCHEMA.create(&tx, SCHEMA.version)?;
    for seed in seeds {
        create_view(&tx, &seed.name, seed.order, &seed.sort)?;
    }
    set_user_version(&tx, SCHEMA.version)?;

    tx.commit().context("failed to commit schema creation")?;
    info!(
        "created book database at version {} with {} view(s)",
        SCHEMA.version,
        seeds.len()
    );
    Ok(())
}

fn upgrade(conn: &Connection, from: u32) -> Result<UpgradeReport> {
    let tx = conn
        .unchecked_transaction()
        .context("failed to begin schema upgrade")?;

    let report = SCHEMA.upgrade(&tx, from)?;
    set_user_version(&tx, SCHEMA.version)?;

    tx.commit().context("failed to commit schema upgrade")?;
    info!(
        "upgraded book database from version {from} to {}",
        SCHEMA.version
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM views", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn fresh_store_is_created_and_seeded() {
        let db = BookDatabase::open_in_memory(&DatabaseConfig::default()).unwrap();
        assert_eq!(db.version(), SCHEMA.version);
        assert_eq!(user_version(db.connection()).unwrap(), SCHEMA.version);
        assert_eq!(view_count(db.connection()), 2);
        assert!(db.upgrade_report().is_none());

        let fk: i64 = db
            .connection()
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn default_config_opens_in_memory() {
        let db = BookDatabase::open(&DatabaseConfig::default()).unwrap();
        assert_eq!(view_count(db.connection()), 2);
        assert!(db.connection().path().map_or(true, str::is_empty));
        assert!(!std::path::Path::new(":memory:").exists());
    }

    #[test]
    fn custom_seeds_replace_the_defaults() {
        let config = DatabaseConfig::default().with_seed_views(vec![ViewSeed::new("Shelf", 0)]);
        let db = BookDatabase::open_in_memory(&config).unwrap();
        assert_eq!(view_count(db.connection()), 1);
    }

    #[test]
    fn version_one_store_is_upgraded_in_place() {
        let conn = Connection::open_in_memory().unwrap();
        SCHEMA.create(&conn, 1).unwrap();
        set_user_version(&conn, 1).unwrap();
        conn.execute("INSERT INTO books (isbn, title) VALUES ('123', 'Dune')", [])
            .unwrap();

        let db = BookDatabase::from_connection(conn, &DatabaseConfig::default()).unwrap();

        let report = db.upgrade_report().unwrap();
        assert_eq!((report.from, report.to), (1, 2));
        assert!(!report.lost_data());
        let pages: i64 = db
            .connection()
            .query_row("SELECT page_count FROM books WHERE isbn = '123'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(pages, 0);
        assert_eq!(user_version(db.connection()).unwrap(), 2);
        assert_eq!(view_count(db.connection()), 0, "upgrades never seed views");
    }

    #[test]
    fn newer_store_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        set_user_version(&conn, SCHEMA.version + 1).unwrap();

        let err = BookDatabase::from_connection(conn, &DatabaseConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, Error::UnsupportedVersion { found: 3, supported: 2 }));
    }
}
