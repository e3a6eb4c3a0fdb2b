//! SQLite storage backend for maildex
//!
//! Implements [`EmailWriter`](maildex_core::EmailWriter) and
//! [`EmailReader`](maildex_core::EmailReader) over a single SQLite file.
//!
//! ## Features
//!
//! - **FTS5 Full-Text Search**: external-content index over subject and body,
//!   with highlighted snippets
//! - **Recipient index**: inbox scoping and `to` filters through indexed
//!   `EXISTS` lookups
//! - **WAL Mode**: a pool of read-only connections serves queries while the
//!   loader writes
//! - **Layout check**: files written by anything else are refused, not modified
//!
//! ## Usage
//!
//! ```rust,ignore
//! use maildex_sqlite::{create_email_store, open_email_store, SqliteConfig};
//! use maildex_core::{EmailReader, EmailWriter, SearchQuery};
//!
//! let store = create_email_store(SqliteConfig::new("./maildex.db"))?;
//! store.bulk_insert(batch).await?;
//! store.finalize_indexes().await?;
//!
//! let store = open_email_store(SqliteConfig::new("./maildex.db"))?;
//! let hits = store.search(&SearchQuery::new("bob@enron.com", ["budget"])).await?;
//! ```

pub mod config;
pub mod connection;
pub mod email_store;
pub mod error;
pub mod query;
pub mod schema;

// Re-exports
pub use config::SqliteConfig;
pub use connection::{DbStats, OpenMode, SqlitePool};
pub use email_store::{create_email_store, open_email_store, SqliteEmailStore, StoreStats};
pub use error::{SqliteError, SqliteResult};
pub use query::{compile_search, CompiledSearch, SnippetOptions};
