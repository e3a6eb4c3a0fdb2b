//! Storage Error Types

use std::path::PathBuf;

use thiserror::Error;

use crate::query::InvalidQuery;

/// Storage could not be opened or created. Fatal at startup, never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreInitError {
    #[error("Storage path {path} is not usable: {reason}")]
    Unwritable { path: PathBuf, reason: String },

    #[error("Incompatible store layout: found {found}, expected {expected}")]
    IncompatibleLayout { found: String, expected: String },

    #[error("Store at {0} was never finalized; run ingestion to completion first")]
    NotFinalized(PathBuf),

    #[error("Storage backend error during initialization: {0}")]
    Backend(String),
}

/// Error type for store and query operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error(transparent)]
    Init(#[from] StoreInitError),

    #[error(transparent)]
    InvalidQuery(#[from] InvalidQuery),

    #[error("Store is finalized and read-only")]
    ReadOnly,

    #[error("Full-text index was already finalized")]
    AlreadyFinalized,

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    /// True when the caller, not the store, is at fault.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, StorageError::InvalidQuery(_))
    }
}
