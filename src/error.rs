//! Crate-wide error type. Engine failures are wrapped with a short context
//! string at every call site, and constraint or interrupt codes are lifted
//! into their own variants so callers can react to them without digging
//! through `rusqlite` internals.

use std::io;

use rusqlite::ErrorCode;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A uniqueness or foreign-key constraint rejected the statement.
    #[error("{context}: constraint violation")]
    Constraint {
        context: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// An update or delete touched no rows.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A cancellation signal fired before or during the query.
    #[error("query cancelled")]
    Cancelled,

    /// A view sort expression named an unknown key or direction.
    #[error("invalid sort expression: {0}")]
    InvalidSort(String),

    #[error("database version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("{context}")]
    Sqlite {
        context: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{context}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("could not locate home directory")]
    NoHomeDirectory,

    #[error("malformed lookup response")]
    Json(#[from] serde_json::Error),

    #[error("invalid lookup response: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Classify an engine error. Constraint failures and interrupted
    /// statements get dedicated variants, everything else keeps the context.
    pub(crate) fn from_sqlite(context: &'static str, source: rusqlite::Error) -> Self {
        match source.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => Error::Constraint { context, source },
            Some(ErrorCode::OperationInterrupted) => Error::Cancelled,
            _ => Error::Sqlite { context, source },
        }
    }

    pub fn is_constraint(&self) -> bool {
        matches!(self, Error::Constraint { .. })
    }
}

/// `anyhow`-style `.context(..)` for `rusqlite` results.
pub(crate) trait SqlContext<T> {
    fn context(self, context: &'static str) -> Result<T>;
}

impl<T> SqlContext<T> for rusqlite::Result<T> {
    fn context(self, context: &'static str) -> Result<T> {
        self.map_err(|source| Error::from_sqlite(context, source))
    }
}

pub(crate) trait IoContext<T> {
    fn context(self, context: &'static str) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn context(self, context: &'static str) -> Result<T> {
        self.map_err(|source| Error::Io { context, source })
    }
}
