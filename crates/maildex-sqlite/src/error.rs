//! Error types for SQLite storage

use std::path::PathBuf;

use maildex_core::{InvalidQuery, StorageError, StoreInitError};
use thiserror::Error;

/// SQLite storage error type
#[derive(Error, Debug)]
pub enum SqliteError {
    /// Database file could not be opened or configured
    #[error("Connection error for {path}: {reason}")]
    Connection { path: PathBuf, reason: String },

    /// Schema creation error
    #[error("Schema error: {0}")]
    Schema(String),

    /// Existing file was written by something else
    #[error("Incompatible layout: found {found}, expected {expected}")]
    IncompatibleLayout { found: String, expected: String },

    /// Opened for querying before ingestion finished
    #[error("Store at {0} is not finalized")]
    NotFinalized(PathBuf),

    /// Write attempted on a finalized or read-only store
    #[error("Store is read-only")]
    ReadOnly,

    #[error("Full-text index already finalized")]
    AlreadyFinalized,

    #[error(transparent)]
    InvalidQuery(#[from] InvalidQuery),

    /// Stored row could not be decoded
    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    /// Underlying rusqlite error
    #[error("SQLite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
}

/// Result type for SQLite operations
pub type SqliteResult<T> = Result<T, SqliteError>;

impl From<SqliteError> for StorageError {
    fn from(err: SqliteError) -> Self {
        match err {
            SqliteError::Connection { path, reason } => {
                Self::Init(StoreInitError::Unwritable { path, reason })
            }
            SqliteError::Schema(msg) => Self::Init(StoreInitError::Backend(msg)),
            SqliteError::IncompatibleLayout { found, expected } => {
                Self::Init(StoreInitError::IncompatibleLayout { found, expected })
            }
            SqliteError::NotFinalized(path) => Self::Init(StoreInitError::NotFinalized(path)),
            SqliteError::ReadOnly => Self::ReadOnly,
            SqliteError::AlreadyFinalized => Self::AlreadyFinalized,
            SqliteError::InvalidQuery(e) => Self::InvalidQuery(e),
            SqliteError::CorruptRow(msg) => Self::Backend(format!("Corrupt row: {}", msg)),
            SqliteError::Rusqlite(e) => Self::Backend(e.to_string()),
        }
    }
}

impl SqliteError {
    /// Collapse into the startup error taxonomy; anything that is not an
    /// init failure is reported as a backend fault.
    pub fn into_init_error(self) -> StoreInitError {
        match StorageError::from(self) {
            StorageError::Init(init) => init,
            other => StoreInitError::Backend(other.to_string()),
        }
    }
}
