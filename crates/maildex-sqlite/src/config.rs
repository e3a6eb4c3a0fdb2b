//! SQLite connection configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const MEMORY_PATH: &str = ":memory:";

/// Configuration for opening an email store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Database file, or `:memory:`
    pub path: PathBuf,
    /// Write-ahead logging; lets readers proceed while the loader writes
    pub wal_mode: bool,
    pub foreign_keys: bool,
    pub busy_timeout_ms: u64,
    /// Negative values are KiB, positive values are pages (SQLite convention)
    pub cache_size: i64,
    /// Bytes of the file to memory-map for reads; 0 disables
    pub mmap_size: u64,
    /// Number of dedicated read-only connections
    pub read_connections: usize,
}

impl SqliteConfig {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Private in-memory database (tests); reads share the writer connection
    pub fn memory() -> Self {
        Self {
            path: PathBuf::from(MEMORY_PATH),
            wal_mode: false,
            mmap_size: 0,
            read_connections: 0,
            ..Self::default()
        }
    }

    pub fn is_memory(&self) -> bool {
        self.path.as_os_str() == MEMORY_PATH
    }

    #[must_use]
    pub fn with_read_connections(mut self, count: usize) -> Self {
        self.read_connections = count;
        self
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./maildex.db"),
            wal_mode: true,
            foreign_keys: true,
            busy_timeout_ms: 5000,
            cache_size: -64_000,
            mmap_size: 256 * 1024 * 1024,
            read_connections: num_cpus::get().clamp(1, 8),
        }
    }
}
