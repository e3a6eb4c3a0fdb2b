//! Common test utilities for ingestion tests.

use std::path::PathBuf;

use serde_json::Value;
use tempfile::TempDir;

/// Write `records` as a JSON-lines corpus.
///
/// Returns the temp directory (which must be kept alive) and the file path.
pub fn write_corpus(records: &[Value]) -> std::io::Result<(TempDir, PathBuf)> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("corpus.jsonl");
    let body: String = records
        .iter()
        .map(|r| format!("{}\n", r))
        .collect();
    std::fs::write(&path, body)?;
    Ok((temp_dir, path))
}

/// Write `bytes` verbatim as a corpus file, for encodings JSON values cannot carry.
pub fn write_corpus_bytes(bytes: &[u8]) -> std::io::Result<(TempDir, PathBuf)> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("corpus.jsonl");
    std::fs::write(&path, bytes)?;
    Ok((temp_dir, path))
}
