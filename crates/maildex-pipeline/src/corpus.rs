//! Corpus sources
//!
//! A source yields raw records one at a time. The outer `Result` is fatal
//! (the stream itself broke); the inner one is a per-record rejection that the
//! pipeline counts and moves past.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use maildex_core::{RawEmailRecord, RecordRejection};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::error::IngestError;

/// One item from a source: a raw record or the reason it could not be read
pub type SourceRecord = Result<RawEmailRecord, RecordRejection>;

/// Stream of raw corpus records
#[async_trait]
pub trait RecordSource: Send {
    /// Next record, or `None` at end of stream
    async fn next_record(&mut self) -> Result<Option<SourceRecord>, IngestError>;
}

/// JSON-lines corpus, one raw email object per line
///
/// Lines are read as bytes; a line that is not UTF-8 is a rejection like any
/// other malformed line.
pub struct JsonlCorpus<R> {
    reader: R,
    buf: Vec<u8>,
    line_no: usize,
    origin: PathBuf,
}

impl JsonlCorpus<BufReader<File>> {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let path = path.as_ref();
        let file = File::open(path).await.map_err(|source| IngestError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::with_origin(BufReader::new(file), path))
    }
}

impl<R: AsyncBufRead + Unpin + Send> JsonlCorpus<R> {
    pub fn new(reader: R) -> Self {
        Self::with_origin(reader, Path::new("<stream>"))
    }

    fn with_origin(reader: R, origin: &Path) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line_no: 0,
            origin: origin.to_path_buf(),
        }
    }

    /// 1-based number of the last line read
    pub fn line_no(&self) -> usize {
        self.line_no
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> RecordSource for JsonlCorpus<R> {
    async fn next_record(&mut self) -> Result<Option<SourceRecord>, IngestError> {
        loop {
            self.buf.clear();
            let read = self
                .reader
                .read_until(b'\n', &mut self.buf)
                .await
                .map_err(|source| IngestError::Read {
                    path: self.origin.clone(),
                    line: self.line_no + 1,
                    source,
                })?;
            if read == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let line = match std::str::from_utf8(&self.buf) {
                Ok(line) => line,
                Err(e) => {
                    return Ok(Some(Err(RecordRejection::Malformed(format!(
                        "line {}: {}",
                        self.line_no, e
                    )))));
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            let record = serde_json::from_str::<RawEmailRecord>(line).map_err(|e| {
                RecordRejection::Malformed(format!("line {}: {}", self.line_no, e))
            });
            return Ok(Some(record));
        }
    }
}

/// In-memory source over already-parsed records
pub struct IterSource<I> {
    records: I,
}

impl<I> IterSource<I>
where
    I: Iterator<Item = RawEmailRecord> + Send,
{
    pub fn new(records: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            records: records.into_iter(),
        }
    }
}

#[async_trait]
impl<I> RecordSource for IterSource<I>
where
    I: Iterator<Item = RawEmailRecord> + Send,
{
    async fn next_record(&mut self) -> Result<Option<SourceRecord>, IngestError> {
        Ok(self.records.next().map(Ok))
    }
}
