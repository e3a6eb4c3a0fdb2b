//! Ingestion errors
//!
//! Only stream-level and storage failures live here. Problems with a single
//! record are [`RecordRejection`](maildex_core::RecordRejection)s and never
//! abort a run.

use std::path::PathBuf;

use maildex_core::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Failed to open corpus {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path} at line {line}: {source}")]
    Read {
        path: PathBuf,
        line: usize,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Invalid pipeline configuration: {0}")]
    InvalidConfig(String),
}
