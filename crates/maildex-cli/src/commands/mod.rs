//! Subcommand implementations

pub mod ingest;
pub mod read;
pub mod scenarios;
pub mod search;
pub mod stats;
pub mod tool;
