//! SQLite implementation of the email storage traits
//!
//! Write path: one transaction per `bulk_insert` batch, one savepoint per
//! email so a failing email never leaves half of its rows behind. The FTS5
//! index is kept in step by triggers, so committed rows are searchable at
//! once; `finalize_indexes` verifies and compacts it and flips the store to
//! read-only.

use std::path::PathBuf;

use async_trait::async_trait;
use rusqlite::{params, Connection};
use tracing::{debug, info, warn};

use maildex_core::{
    check_limits, BulkInsertReport, EmailEnvelope, EmailReader, EmailRecord, EmailWriter,
    RecordRejection, SearchQuery, SearchResult, StorageError, StorageResult, StoreInitError,
};

use crate::config::SqliteConfig;
use crate::connection::{DbStats, OpenMode, SqlitePool};
use crate::error::{SqliteError, SqliteResult};
use crate::query::{self, SnippetOptions};
use crate::schema;

/// Email store backed by one SQLite file
#[derive(Clone)]
pub struct SqliteEmailStore {
    pool: SqlitePool,
    snippet: SnippetOptions,
}

impl SqliteEmailStore {
    /// Create (or reopen for writing) a store at `config.path`.
    ///
    /// An existing file must carry this crate's layout; anything else fails
    /// with [`SqliteError::IncompatibleLayout`] and is left untouched.
    pub fn initialize(config: SqliteConfig) -> SqliteResult<Self> {
        Ok(Self::new(SqlitePool::new(config)?))
    }

    /// Open a finalized store for querying only
    pub fn open(config: SqliteConfig) -> SqliteResult<Self> {
        let path = config.path.clone();
        let pool = SqlitePool::open_read_only(config)?;
        if !pool.with_connection(schema::is_finalized)? {
            return Err(SqliteError::NotFinalized(path));
        }
        Ok(Self::new(pool))
    }

    /// In-memory store for tests
    pub fn memory() -> SqliteResult<Self> {
        Ok(Self::new(SqlitePool::memory()?))
    }

    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            snippet: SnippetOptions::default(),
        }
    }

    #[must_use]
    pub fn with_snippet_options(mut self, snippet: SnippetOptions) -> Self {
        self.snippet = snippet;
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn path(&self) -> &PathBuf {
        &self.pool.config().path
    }

    pub fn is_finalized(&self) -> SqliteResult<bool> {
        self.pool.with_connection(schema::is_finalized)
    }

    /// Insert one batch. Synchronous core of [`EmailWriter::bulk_insert`].
    pub fn insert_batch(&self, batch: &[EmailEnvelope]) -> SqliteResult<BulkInsertReport> {
        self.pool.with_connection_mut(|conn| {
            if schema::is_finalized(conn)? {
                return Err(SqliteError::ReadOnly);
            }
            insert_batch(conn, batch)
        })
    }

    /// Verify and compact the full-text index, then mark the store finalized.
    pub fn finalize(&self) -> SqliteResult<()> {
        self.pool.with_connection_mut(|conn| {
            if schema::is_finalized(conn)? {
                return Err(SqliteError::AlreadyFinalized);
            }

            info!("Finalizing full-text index");
            if let Err(e) = conn.execute(
                "INSERT INTO emails_fts (emails_fts) VALUES ('integrity-check')",
                [],
            ) {
                warn!(error = %e, "Full-text index failed integrity check, rebuilding");
                conn.execute("INSERT INTO emails_fts (emails_fts) VALUES ('rebuild')", [])?;
            }
            conn.execute("INSERT INTO emails_fts (emails_fts) VALUES ('optimize')", [])?;
            conn.execute_batch("ANALYZE;")?;
            schema::mark_finalized(conn)?;

            if self.pool.config().wal_mode && !self.pool.config().is_memory() {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
            }

            info!("Store finalized");
            Ok(())
        })
    }

    /// Keyword search. Synchronous core of [`EmailReader::search`].
    pub fn search_blocking(&self, query: &SearchQuery) -> SqliteResult<Vec<SearchResult>> {
        let validated = query.validate()?;
        self.pool
            .with_reader(|conn| query::search(conn, &validated, &self.snippet))
    }

    /// Fetch by id. Synchronous core of [`EmailReader::read`].
    pub fn read_blocking(&self, message_id: &str) -> SqliteResult<Option<EmailRecord>> {
        self.pool.with_reader(|conn| query::read(conn, message_id))
    }

    /// Row counts and file size
    pub fn stats(&self) -> SqliteResult<StoreStats> {
        let db = self.pool.stats()?;
        self.pool.with_reader(|conn| {
            let count = |table: &str| -> SqliteResult<u64> {
                let n: i64 =
                    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                        row.get(0)
                    })?;
                Ok(n as u64)
            };

            let date_range: (Option<String>, Option<String>) = conn.query_row(
                "SELECT MIN(date), MAX(date) FROM emails",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            Ok(StoreStats {
                emails: count("emails")?,
                recipients: count("recipients")?,
                distinct_addresses: {
                    let n: i64 = conn.query_row(
                        "SELECT COUNT(DISTINCT recipient_address) FROM recipients",
                        [],
                        |row| row.get(0),
                    )?;
                    n as u64
                },
                earliest: date_range.0,
                latest: date_range.1,
                finalized: schema::is_finalized(conn)?,
                db,
            })
        })
    }
}

/// Summary of a store's contents
#[derive(Debug, Clone)]
pub struct StoreStats {
    pub emails: u64,
    pub recipients: u64,
    pub distinct_addresses: u64,
    pub earliest: Option<String>,
    pub latest: Option<String>,
    pub finalized: bool,
    pub db: DbStats,
}

const INSERT_EMAIL: &str = "INSERT OR IGNORE INTO emails
    (message_id, subject, from_address, date, body, file_name)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

const INSERT_RECIPIENT: &str = "INSERT INTO recipients
    (email_id, recipient_address, recipient_type)
    VALUES (?1, ?2, ?3)";

fn insert_batch(conn: &mut Connection, batch: &[EmailEnvelope]) -> SqliteResult<BulkInsertReport> {
    let mut report = BulkInsertReport::default();
    let mut tx = conn.transaction()?;

    for envelope in batch {
        let email = &envelope.email;
        match check_limits(&email.body, envelope.recipients.len()) {
            Ok(()) => {}
            Err(rejection) => {
                debug!(message_id = %email.message_id, %rejection, "Skipping email");
                match rejection {
                    RecordRejection::BodyTooLong { .. } => report.skipped_too_long += 1,
                    _ => report.skipped_too_many_recipients += 1,
                }
                continue;
            }
        }

        let sp = tx.savepoint()?;
        let inserted = sp.prepare_cached(INSERT_EMAIL)?.execute(params![
            email.message_id,
            email.subject,
            email.from_address,
            email.date_string(),
            email.body,
            email.file_name,
        ])?;

        if inserted == 0 {
            debug!(message_id = %email.message_id, "Skipping duplicate message id");
            report.skipped_duplicate += 1;
            continue;
        }

        {
            let mut stmt = sp.prepare_cached(INSERT_RECIPIENT)?;
            for edge in &envelope.recipients {
                stmt.execute(params![email.message_id, edge.address, edge.kind.as_str()])?;
            }
        }

        sp.commit()?;
        report.accepted += 1;
    }

    tx.commit()?;
    debug!(
        accepted = report.accepted,
        skipped = report.skipped(),
        "Batch committed"
    );
    Ok(report)
}

/// Open a store for ingestion, mapping failures onto [`StoreInitError`]
pub fn create_email_store(config: SqliteConfig) -> Result<SqliteEmailStore, StoreInitError> {
    SqliteEmailStore::initialize(config).map_err(SqliteError::into_init_error)
}

/// Open a finalized store for querying, mapping failures onto [`StoreInitError`]
pub fn open_email_store(config: SqliteConfig) -> Result<SqliteEmailStore, StoreInitError> {
    SqliteEmailStore::open(config).map_err(SqliteError::into_init_error)
}

fn join_error(err: tokio::task::JoinError) -> StorageError {
    StorageError::Backend(format!("Blocking task failed: {}", err))
}

#[async_trait]
impl EmailWriter for SqliteEmailStore {
    async fn bulk_insert(&self, batch: Vec<EmailEnvelope>) -> StorageResult<BulkInsertReport> {
        if self.pool.mode() == OpenMode::ReadOnly {
            return Err(StorageError::ReadOnly);
        }
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.insert_batch(&batch))
            .await
            .map_err(join_error)?
            .map_err(Into::into)
    }

    async fn finalize_indexes(&self) -> StorageResult<()> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.finalize())
            .await
            .map_err(join_error)?
            .map_err(|e| match e {
                // A read-only handle can only come from `open`, which requires finalization
                SqliteError::ReadOnly => StorageError::AlreadyFinalized,
                other => other.into(),
            })
    }
}

#[async_trait]
impl EmailReader for SqliteEmailStore {
    async fn search(&self, query: &SearchQuery) -> StorageResult<Vec<SearchResult>> {
        let store = self.clone();
        let query = query.clone();
        tokio::task::spawn_blocking(move || store.search_blocking(&query))
            .await
            .map_err(join_error)?
            .map_err(Into::into)
    }

    async fn read(&self, message_id: &str) -> StorageResult<Option<EmailRecord>> {
        let store = self.clone();
        let message_id = message_id.to_string();
        tokio::task::spawn_blocking(move || store.read_blocking(&message_id))
            .await
            .map_err(join_error)?
            .map_err(Into::into)
    }
}
