//! SQLite connection pool management
//!
//! One writer connection plus a fixed set of read-only connections, each
//! behind its own mutex. In WAL mode the readers see every committed batch
//! while the loader keeps writing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info};

use crate::config::SqliteConfig;
use crate::error::{SqliteError, SqliteResult};
use crate::schema;

/// How the writer connection is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Create the file and layout if missing
    ReadWrite,
    /// File must exist; every connection is read-only
    ReadOnly,
}

/// Thread-safe SQLite connection wrapper
#[derive(Clone)]
pub struct SqlitePool {
    writer: Arc<Mutex<Connection>>,
    readers: Arc<Vec<Mutex<Connection>>>,
    next_reader: Arc<AtomicUsize>,
    config: SqliteConfig,
    mode: OpenMode,
}

impl SqlitePool {
    /// Open (creating if needed) a read-write pool and apply the layout
    pub fn new(config: SqliteConfig) -> SqliteResult<Self> {
        Self::open_with_mode(config, OpenMode::ReadWrite)
    }

    /// Open an existing store for querying only
    pub fn open_read_only(config: SqliteConfig) -> SqliteResult<Self> {
        Self::open_with_mode(config, OpenMode::ReadOnly)
    }

    /// Create an in-memory pool for testing
    pub fn memory() -> SqliteResult<Self> {
        Self::new(SqliteConfig::memory())
    }

    fn open_with_mode(config: SqliteConfig, mode: OpenMode) -> SqliteResult<Self> {
        info!(path = ?config.path, ?mode, "Opening SQLite store");

        let connection_error = |e: &dyn std::fmt::Display| SqliteError::Connection {
            path: config.path.clone(),
            reason: e.to_string(),
        };

        let writer = if config.is_memory() {
            Connection::open_in_memory().map_err(|e| connection_error(&e))?
        } else {
            match mode {
                OpenMode::ReadWrite => {
                    if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                        std::fs::create_dir_all(parent).map_err(|e| connection_error(&e))?;
                    }
                    Connection::open(&config.path).map_err(|e| connection_error(&e))?
                }
                OpenMode::ReadOnly => open_reader(&config).map_err(|e| connection_error(&e))?,
            }
        };

        let mut pool = Self {
            writer: Arc::new(Mutex::new(writer)),
            readers: Arc::new(Vec::new()),
            next_reader: Arc::new(AtomicUsize::new(0)),
            config,
            mode,
        };

        pool.initialize()?;

        if !pool.config.is_memory() {
            let mut readers = Vec::with_capacity(pool.config.read_connections);
            for _ in 0..pool.config.read_connections {
                let conn = open_reader(&pool.config).map_err(|e| connection_error_for(&pool, &e))?;
                pool.configure_reader(&conn)?;
                readers.push(Mutex::new(conn));
            }
            debug!(readers = readers.len(), "Opened read connections");
            pool.readers = Arc::new(readers);
        }

        Ok(pool)
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Execute a closure with the writer connection
    pub fn with_connection<F, T>(&self, f: F) -> SqliteResult<T>
    where
        F: FnOnce(&Connection) -> SqliteResult<T>,
    {
        let conn = self.writer.lock();
        f(&conn)
    }

    /// Execute a closure with mutable access to the writer connection
    pub fn with_connection_mut<F, T>(&self, f: F) -> SqliteResult<T>
    where
        F: FnOnce(&mut Connection) -> SqliteResult<T>,
    {
        if self.mode == OpenMode::ReadOnly {
            return Err(SqliteError::ReadOnly);
        }
        let mut conn = self.writer.lock();
        f(&mut conn)
    }

    /// Execute a closure with a read connection.
    ///
    /// Takes the first idle reader, otherwise waits on one picked round-robin.
    /// Pools without readers (in-memory) fall back to the writer.
    pub fn with_reader<F, T>(&self, f: F) -> SqliteResult<T>
    where
        F: FnOnce(&Connection) -> SqliteResult<T>,
    {
        if self.readers.is_empty() {
            return self.with_connection(f);
        }

        for reader in self.readers.iter() {
            if let Some(conn) = reader.try_lock() {
                return f(&conn);
            }
        }

        let index = self.next_reader.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[index].lock();
        f(&conn)
    }

    /// Configure pragmas and check (or create) the layout
    fn initialize(&self) -> SqliteResult<()> {
        self.with_connection(|conn| {
            self.configure_pragmas(conn).map_err(|e| SqliteError::Connection {
                path: self.config.path.clone(),
                reason: e.to_string(),
            })?;

            match self.mode {
                OpenMode::ReadWrite => schema::ensure_layout(conn)?,
                OpenMode::ReadOnly => schema::check_layout(conn)?,
            }

            info!("SQLite store initialized");
            Ok(())
        })
    }

    /// Configure SQLite PRAGMA settings for the writer
    fn configure_pragmas(&self, conn: &Connection) -> SqliteResult<()> {
        debug!("Configuring SQLite pragmas");

        if self.config.wal_mode && self.mode == OpenMode::ReadWrite && !self.config.is_memory() {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
            conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        }

        if self.config.foreign_keys {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        }

        self.configure_common(conn)?;

        if self.mode == OpenMode::ReadOnly {
            conn.execute_batch("PRAGMA query_only = ON;")?;
        }

        Ok(())
    }

    fn configure_reader(&self, conn: &Connection) -> SqliteResult<()> {
        self.configure_common(conn)?;
        conn.execute_batch("PRAGMA query_only = ON;")?;
        Ok(())
    }

    fn configure_common(&self, conn: &Connection) -> SqliteResult<()> {
        conn.execute_batch(&format!(
            "PRAGMA busy_timeout = {};",
            self.config.busy_timeout_ms
        ))?;

        conn.execute_batch(&format!("PRAGMA cache_size = {};", self.config.cache_size))?;

        if self.config.mmap_size > 0 {
            conn.execute_batch(&format!("PRAGMA mmap_size = {};", self.config.mmap_size))?;
        }

        conn.execute_batch("PRAGMA temp_store = MEMORY;")?;
        Ok(())
    }

    /// Get database statistics
    pub fn stats(&self) -> SqliteResult<DbStats> {
        self.with_reader(|conn| {
            let page_count: i64 = conn.query_row("PRAGMA page_count;", [], |row| row.get(0))?;

            let page_size: i64 = conn.query_row("PRAGMA page_size;", [], |row| row.get(0))?;

            let freelist_count: i64 =
                conn.query_row("PRAGMA freelist_count;", [], |row| row.get(0))?;

            Ok(DbStats {
                page_count: page_count as u64,
                page_size: page_size as u64,
                freelist_count: freelist_count as u64,
                total_size_bytes: (page_count * page_size) as u64,
            })
        })
    }
}

fn open_reader(config: &SqliteConfig) -> rusqlite::Result<Connection> {
    Connection::open_with_flags(
        &config.path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX | OpenFlags::SQLITE_OPEN_URI,
    )
}

fn connection_error_for(pool: &SqlitePool, err: &rusqlite::Error) -> SqliteError {
    SqliteError::Connection {
        path: pool.config.path.clone(),
        reason: err.to_string(),
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DbStats {
    pub page_count: u64,
    pub page_size: u64,
    pub freelist_count: u64,
    pub total_size_bytes: u64,
}
