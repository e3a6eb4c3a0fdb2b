//! Storage Abstraction
//!
//! The store is split along the one seam the system has: a single bulk writer
//! that runs to completion, then any number of readers.
//!
//! - [`EmailWriter`] - bulk load plus one-time index finalization
//! - [`EmailReader`] - filtered full-text search and single-record reads
//!
//! Backends (see `maildex-sqlite`) implement both; ingestion depends only on
//! the writer and the agent tools depend only on the reader.

pub mod error;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::query::SearchQuery;
use crate::types::{EmailEnvelope, EmailRecord, SearchResult};

pub use error::{StorageError, StorageResult, StoreInitError};

/// Per-batch outcome of [`EmailWriter::bulk_insert`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkInsertReport {
    pub accepted: u64,
    pub skipped_too_long: u64,
    pub skipped_too_many_recipients: u64,
    pub skipped_duplicate: u64,
}

impl BulkInsertReport {
    /// Fold another batch's counters into this one
    pub fn merge(&mut self, other: &BulkInsertReport) {
        self.accepted += other.accepted;
        self.skipped_too_long += other.skipped_too_long;
        self.skipped_too_many_recipients += other.skipped_too_many_recipients;
        self.skipped_duplicate += other.skipped_duplicate;
    }

    pub fn skipped(&self) -> u64 {
        self.skipped_too_long + self.skipped_too_many_recipients + self.skipped_duplicate
    }
}

/// Write side of the store. Exactly one writer exists, and only before finalization.
#[async_trait]
pub trait EmailWriter: Send + Sync {
    /// Insert each envelope atomically (row + edges + index entry).
    ///
    /// An envelope that violates a limit or repeats a stored `message_id` is
    /// skipped and counted; the rest of the batch proceeds.
    async fn bulk_insert(&self, batch: Vec<EmailEnvelope>) -> StorageResult<BulkInsertReport>;

    /// Make the full-text index queryable and consistent. Call once, after the
    /// last `bulk_insert`.
    async fn finalize_indexes(&self) -> StorageResult<()>;
}

/// Read side of the store. Never mutates; safe for concurrent use.
#[async_trait]
pub trait EmailReader: Send + Sync {
    /// Filtered full-text search, newest first.
    ///
    /// Fails only with [`StorageError::InvalidQuery`] for a malformed query or
    /// [`StorageError::Backend`] for a storage fault; no match is an empty `Vec`.
    async fn search(&self, query: &SearchQuery) -> StorageResult<Vec<SearchResult>>;

    /// Fetch one email with its recipients; `None` when the id is unknown.
    async fn read(&self, message_id: &str) -> StorageResult<Option<EmailRecord>>;
}
