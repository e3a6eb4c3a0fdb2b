//! Core types and abstractions for maildex
//!
//! maildex is the retrieval substrate behind an email-search agent: a durable
//! store of emails, a recipient index and a full-text index, queried through
//! two operations (`search`, `read`) that agent tools call many times per
//! episode.
//!
//! This crate holds everything that does not depend on a storage engine:
//!
//! - **Record model** ([`types`]): emails, recipient edges, raw corpus records
//! - **Query builder** ([`query`]): typed, validated, injection-safe search requests
//! - **Storage traits** ([`storage`]): [`EmailWriter`] for the one-time bulk
//!   load, [`EmailReader`] for the query path
//! - **Ingestion rules** ([`ingest`]): per-record limits and rejection kinds
//! - **Scenarios** ([`scenario`]): reproducible evaluation question sets
//! - **Tools** ([`tools`]): the agent-facing call surface bound to a scenario

pub mod ingest;
pub mod query;
pub mod scenario;
pub mod storage;
pub mod tools;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use ingest::{check_limits, RecordRejection, RejectionKind};
pub use query::{InvalidQuery, SearchQuery, ValidatedQuery, MAX_SEARCH_RESULTS};
pub use scenario::{Scenario, ScenarioError, ScenarioLoader, Shuffle, Split};
pub use storage::{
    BulkInsertReport, EmailReader, EmailWriter, StorageError, StorageResult, StoreInitError,
};
pub use tools::{FinalAnswer, InboxTools, ToolCall, ToolOutput};
pub use types::{
    Email, EmailEnvelope, EmailRecord, RawEmailRecord, RecipientEdge, RecipientKind, SearchResult,
    MAX_BODY_CHARS, MAX_RECIPIENTS,
};
