//! Ingestion Layer
//!
//! Loads a raw email corpus into a store exactly once.
//!
//! ## Architecture
//!
//! - `corpus`: record sources ([`JsonlCorpus`] for files, [`IterSource`] for
//!   in-memory records)
//! - `ingest_pipeline`: the orchestrator ([`IngestPipeline`]) that normalizes,
//!   filters, deduplicates, batches and finalizes
//!
//! The pipeline only sees the [`EmailWriter`](maildex_core::EmailWriter)
//! trait; the SQLite store is injected by the caller.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use maildex_pipeline::IngestPipeline;
//!
//! let pipeline = IngestPipeline::new(Arc::new(store));
//! let report = pipeline.ingest_path("corpus.jsonl").await?;
//! println!("{} accepted", report.accepted);
//! ```

pub mod corpus;
pub mod error;
pub mod ingest_pipeline;

pub use corpus::{IterSource, JsonlCorpus, RecordSource, SourceRecord};
pub use error::IngestError;
pub use ingest_pipeline::*;
