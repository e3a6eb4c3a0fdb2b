//! Corpus Ingestion Orchestrator
//!
//! Turns a raw corpus (arbitrary order, untrusted quality) into store rows.
//!
//! ## Pipeline Architecture
//!
//! 1. **Normalize**: required fields, date parsing, recipient lists with
//!    null and blank entries dropped
//! 2. **Filter**: body length and recipient count limits
//! 3. **Deduplicate**: first record with a given `(subject, body, from)` wins
//! 4. **Store**: accepted envelopes are flushed to the [`EmailWriter`] in batches
//! 5. **Finalize**: once the stream is exhausted, the full-text index is
//!    finalized and the store becomes read-only
//!
//! Per-record problems are counted, never fatal. Only a broken stream or a
//! storage fault stops a run.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use maildex_core::types::parse_email_date;
use maildex_core::{
    check_limits, BulkInsertReport, Email, EmailEnvelope, EmailWriter, RawEmailRecord,
    RecipientKind, RecordRejection, RejectionKind,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::corpus::{JsonlCorpus, RecordSource};
use crate::error::IngestError;

/// Configuration for pipeline behavior
#[derive(Debug, Clone)]
pub struct IngestPipelineConfig {
    /// Envelopes per `bulk_insert` call (one transaction each)
    pub batch_size: usize,
    /// Records between progress reports; 0 disables them
    pub progress_interval: u64,
}

impl Default for IngestPipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            progress_interval: 10_000,
        }
    }
}

/// Final counters of an ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub records_read: u64,
    pub accepted: u64,
    /// Limits, missing fields, bad dates and malformed lines
    pub skipped_by_filter: u64,
    pub skipped_duplicate: u64,
    /// Breakdown of both skip counters
    pub rejections: BTreeMap<RejectionKind, u64>,
}

impl IngestReport {
    fn reject(&mut self, kind: RejectionKind, count: u64) {
        if count == 0 {
            return;
        }
        if kind == RejectionKind::Duplicate {
            self.skipped_duplicate += count;
        } else {
            self.skipped_by_filter += count;
        }
        *self.rejections.entry(kind).or_default() += count;
    }

    /// Fold a store batch report in; store-side skips count like pipeline ones
    fn absorb(&mut self, batch: &BulkInsertReport) {
        self.accepted += batch.accepted;
        self.reject(RejectionKind::BodyTooLong, batch.skipped_too_long);
        self.reject(
            RejectionKind::TooManyRecipients,
            batch.skipped_too_many_recipients,
        );
        self.reject(RejectionKind::Duplicate, batch.skipped_duplicate);
    }

    pub fn rejected(&self, kind: RejectionKind) -> u64 {
        self.rejections.get(&kind).copied().unwrap_or(0)
    }
}

/// Snapshot passed to the progress callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestProgress {
    pub records_read: u64,
    pub accepted: u64,
    pub skipped: u64,
    /// Envelopes waiting for the next flush
    pub pending: usize,
}

pub type ProgressCallback = Arc<dyn Fn(IngestProgress) + Send + Sync>;

/// Membership set over `(subject, body, from)`, keyed by a BLAKE3 digest
///
/// Message ids admitted earlier in the run are tracked too. A repeated id is
/// rejected before its content key is recorded, so content the store would
/// never hold cannot shadow a later record.
#[derive(Debug, Default)]
pub struct DedupSet {
    seen: HashSet<[u8; 32]>,
    ids: HashSet<[u8; 32]>,
}

impl DedupSet {
    /// Admit the email unless its id or content key was already admitted
    pub fn insert(&mut self, email: &Email) -> bool {
        let id = *blake3::hash(email.message_id.as_bytes()).as_bytes();
        if self.ids.contains(&id) {
            return false;
        }
        if !self
            .seen
            .insert(content_key(&email.subject, &email.body, &email.from_address))
        {
            return false;
        }
        self.ids.insert(id);
        true
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

fn content_key(subject: &str, body: &str, from: &str) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    // Length prefixes keep ("ab", "c") and ("a", "bc") apart
    for part in [subject, body, from] {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    *hasher.finalize().as_bytes()
}

/// Validate one raw record and split it into an envelope
pub fn normalize(raw: RawEmailRecord) -> Result<EmailEnvelope, RecordRejection> {
    let to = raw.addresses(RecipientKind::To);
    let cc = raw.addresses(RecipientKind::Cc);
    let bcc = raw.addresses(RecipientKind::Bcc);

    let message_id = required(raw.message_id, "message_id")?;
    let from_address = required(raw.from, "from")?;

    let raw_date = raw
        .date
        .filter(|d| !d.trim().is_empty())
        .ok_or(RecordRejection::MissingField("date"))?;
    let date = parse_email_date(&raw_date).ok_or(RecordRejection::InvalidDate(raw_date))?;

    let body = raw.body.unwrap_or_default();
    check_limits(&body, to.len() + cc.len() + bcc.len())?;

    let email = Email {
        message_id,
        subject: raw.subject.unwrap_or_default(),
        from_address,
        date,
        body,
        file_name: raw.file_name.unwrap_or_default(),
    };
    Ok(EmailEnvelope::from_lists(email, &to, &cc, &bcc))
}

/// Blank counts as missing; a present value is kept as written.
fn required(value: Option<String>, field: &'static str) -> Result<String, RecordRejection> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(RecordRejection::MissingField(field))
}

/// The ingestion orchestrator
///
/// ```text
/// IngestPipeline
///   ├─> RecordSource   (stream raw records)
///   ├─> normalize      (fields, dates, recipients, limits)
///   ├─> DedupSet       (content triple, first wins)
///   └─> EmailWriter    (batched bulk_insert, then finalize_indexes)
/// ```
pub struct IngestPipeline {
    writer: Arc<dyn EmailWriter>,
    config: IngestPipelineConfig,
    progress: Option<ProgressCallback>,
}

impl IngestPipeline {
    /// Create a new pipeline with default config
    pub fn new(writer: Arc<dyn EmailWriter>) -> Self {
        Self::with_config(writer, IngestPipelineConfig::default())
    }

    /// Create a new pipeline with custom configuration
    pub fn with_config(writer: Arc<dyn EmailWriter>, config: IngestPipelineConfig) -> Self {
        Self {
            writer,
            config,
            progress: None,
        }
    }

    /// Report progress every `progress_interval` records and once at the end
    #[must_use]
    pub fn on_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Ingest a JSON-lines corpus file and finalize the store
    pub async fn ingest_path(&self, path: impl AsRef<Path>) -> anyhow::Result<IngestReport> {
        let path = path.as_ref();
        let mut corpus = JsonlCorpus::open(path).await?;
        self.run(&mut corpus)
            .await
            .with_context(|| format!("Failed to ingest corpus '{}'", path.display()))
    }

    /// Consume `source` completely, then finalize the store
    pub async fn run<S>(&self, source: &mut S) -> Result<IngestReport, IngestError>
    where
        S: RecordSource + ?Sized,
    {
        if self.config.batch_size == 0 {
            return Err(IngestError::InvalidConfig(
                "batch_size must be at least 1".to_string(),
            ));
        }

        let start = std::time::Instant::now();
        info!(batch_size = self.config.batch_size, "Starting ingestion");

        let mut report = IngestReport::default();
        let mut dedup = DedupSet::default();
        let mut batch: Vec<EmailEnvelope> = Vec::with_capacity(self.config.batch_size);

        while let Some(item) = source.next_record().await? {
            report.records_read += 1;

            let outcome = item.and_then(normalize).and_then(|envelope| {
                if dedup.insert(&envelope.email) {
                    Ok(envelope)
                } else {
                    Err(RecordRejection::Duplicate)
                }
            });

            match outcome {
                Ok(envelope) => {
                    batch.push(envelope);
                    if batch.len() >= self.config.batch_size {
                        self.flush(&mut batch, &mut report).await?;
                    }
                }
                Err(rejection) => {
                    match &rejection {
                        RecordRejection::Malformed(_) => warn!(%rejection, "Skipping record"),
                        _ => debug!(%rejection, "Skipping record"),
                    }
                    report.reject(rejection.kind(), 1);
                }
            }

            if self.config.progress_interval > 0
                && report.records_read % self.config.progress_interval == 0
            {
                self.report_progress(&report, batch.len());
            }
        }

        self.flush(&mut batch, &mut report).await?;
        self.writer.finalize_indexes().await?;
        self.report_progress(&report, 0);

        info!(
            records_read = report.records_read,
            accepted = report.accepted,
            skipped_by_filter = report.skipped_by_filter,
            skipped_duplicate = report.skipped_duplicate,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Ingestion complete"
        );
        Ok(report)
    }

    async fn flush(
        &self,
        batch: &mut Vec<EmailEnvelope>,
        report: &mut IngestReport,
    ) -> Result<(), IngestError> {
        if batch.is_empty() {
            return Ok(());
        }
        let envelopes = std::mem::replace(batch, Vec::with_capacity(self.config.batch_size));
        let size = envelopes.len();
        let stored = self.writer.bulk_insert(envelopes).await?;
        debug!(
            size,
            accepted = stored.accepted,
            skipped = stored.skipped(),
            "Flushed batch"
        );
        report.absorb(&stored);
        Ok(())
    }

    fn report_progress(&self, report: &IngestReport, pending: usize) {
        let progress = IngestProgress {
            records_read: report.records_read,
            accepted: report.accepted,
            skipped: report.skipped_by_filter + report.skipped_duplicate,
            pending,
        };
        debug!(?progress, "Ingestion progress");
        if let Some(callback) = &self.progress {
            callback(progress);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::IterSource;
    use maildex_core::test_support::MemoryEmailStore;
    use std::sync::Mutex;

    fn raw(id: &str, subject: &str, body: &str, from: &str) -> RawEmailRecord {
        RawEmailRecord {
            message_id: Some(id.to_string()),
            subject: Some(subject.to_string()),
            from: Some(from.to_string()),
            to: Some(vec![Some("bob@enron.com".to_string())]),
            date: Some("2001-05-14 09:30:00".to_string()),
            body: Some(body.to_string()),
            ..RawEmailRecord::default()
        }
    }

    async fn run(records: Vec<RawEmailRecord>) -> (Arc<MemoryEmailStore>, IngestReport) {
        let store = Arc::new(MemoryEmailStore::default());
        let pipeline = IngestPipeline::with_config(
            store.clone(),
            IngestPipelineConfig {
                batch_size: 2,
                progress_interval: 0,
            },
        );
        let report = pipeline.run(&mut IterSource::new(records)).await.unwrap();
        (store, report)
    }

    #[test]
    fn normalize_requires_id_from_and_date() {
        let mut record = raw("<1>", "s", "b", "a@x");
        record.message_id = Some("   ".to_string());
        assert_eq!(
            normalize(record).unwrap_err(),
            RecordRejection::MissingField("message_id")
        );

        let mut record = raw("<1>", "s", "b", "a@x");
        record.from = None;
        assert_eq!(
            normalize(record).unwrap_err(),
            RecordRejection::MissingField("from")
        );

        let mut record = raw("<1>", "s", "b", "a@x");
        record.date = None;
        assert_eq!(
            normalize(record).unwrap_err(),
            RecordRejection::MissingField("date")
        );

        let mut record = raw("<1>", "s", "b", "a@x");
        record.date = Some("last tuesday".to_string());
        assert_eq!(
            normalize(record).unwrap_err(),
            RecordRejection::InvalidDate("last tuesday".to_string())
        );
    }

    #[test]
    fn normalize_keeps_sender_and_id_as_written() {
        let record = raw(" <1> ", "s", "b", "  alice@enron.com ");
        let envelope = normalize(record).unwrap();
        assert_eq!(envelope.email.message_id, " <1> ");
        assert_eq!(envelope.email.from_address, "  alice@enron.com ");
    }

    #[test]
    fn normalize_defaults_optional_text() {
        let record = RawEmailRecord {
            message_id: Some("<1>".to_string()),
            from: Some("a@x".to_string()),
            date: Some("2001-05-14T09:30:00.250".to_string()),
            ..RawEmailRecord::default()
        };
        let envelope = normalize(record).unwrap();
        assert_eq!(envelope.email.subject, "");
        assert_eq!(envelope.email.body, "");
        assert_eq!(envelope.email.date_string(), "2001-05-14 09:30:00");
        assert!(envelope.recipients.is_empty());
    }

    #[test]
    fn normalize_counts_recipients_after_dropping_blanks() {
        let mut record = raw("<1>", "s", "b", "a@x");
        let mut to: Vec<Option<String>> = (0..30).map(|i| Some(format!("u{}@x", i))).collect();
        to.push(None);
        to.push(Some("  ".to_string()));
        record.to = Some(to);
        assert_eq!(normalize(record).unwrap().recipients.len(), 30);

        let mut record = raw("<2>", "s", "b", "a@x");
        record.to = Some((0..31).map(|i| Some(format!("u{}@x", i))).collect());
        assert_eq!(
            normalize(record).unwrap_err(),
            RecordRejection::TooManyRecipients { count: 31 }
        );
    }

    #[test]
    fn content_key_separates_fields() {
        assert_ne!(content_key("ab", "c", "x"), content_key("a", "bc", "x"));
        assert_eq!(content_key("a", "b", "c"), content_key("a", "b", "c"));
    }

    #[tokio::test]
    async fn first_occurrence_of_content_triple_wins() {
        let (store, report) = run(vec![
            raw("<a>", "Meeting", "see you there", "alice@enron.com"),
            raw("<b>", "Meeting", "see you there", "alice@enron.com"),
            raw("<c>", "Meeting", "see you there", "carol@enron.com"),
        ])
        .await;

        assert_eq!(store.message_ids(), ["<a>", "<c>"]);
        assert_eq!(report.accepted, 2);
        assert_eq!(report.skipped_duplicate, 1);
        assert_eq!(report.skipped_by_filter, 0);
    }

    #[tokio::test]
    async fn filters_and_duplicates_are_counted_separately() {
        let mut no_from = raw("<nf>", "s", "b", "x");
        no_from.from = None;

        let (store, report) = run(vec![
            raw("<ok>", "s", "b", "alice@enron.com"),
            raw("<long>", "s", &"x".repeat(5001), "alice@enron.com"),
            no_from,
            raw("<dup>", "s", "b", "alice@enron.com"),
        ])
        .await;

        assert_eq!(store.message_ids(), ["<ok>"]);
        assert_eq!(report.records_read, 4);
        assert_eq!(report.accepted, 1);
        assert_eq!(report.skipped_by_filter, 2);
        assert_eq!(report.skipped_duplicate, 1);
        assert_eq!(report.rejected(RejectionKind::BodyTooLong), 1);
        assert_eq!(report.rejected(RejectionKind::MissingField), 1);
        assert!(store.is_finalized());
    }

    #[tokio::test]
    async fn repeated_message_id_is_a_duplicate() {
        let (store, report) = run(vec![
            raw("<same>", "first", "one", "alice@enron.com"),
            raw("<same>", "second", "two", "alice@enron.com"),
        ])
        .await;

        assert_eq!(store.message_ids(), ["<same>"]);
        assert_eq!(report.accepted, 1);
        assert_eq!(report.skipped_duplicate, 1);
        assert_eq!(report.rejected(RejectionKind::Duplicate), 1);
    }

    #[tokio::test]
    async fn content_of_a_skipped_id_does_not_shadow_later_records() {
        let (store, report) = run(vec![
            raw("<1>", "first", "one", "alice@enron.com"),
            raw("<1>", "second", "two", "alice@enron.com"),
            raw("<3>", "second", "two", "alice@enron.com"),
        ])
        .await;

        assert_eq!(store.message_ids(), ["<1>", "<3>"]);
        assert_eq!(report.accepted, 2);
        assert_eq!(report.skipped_duplicate, 1);
    }

    #[tokio::test]
    async fn ids_already_in_the_store_are_folded_in() {
        let store = Arc::new(MemoryEmailStore::default());
        let existing = normalize(raw("<old>", "earlier run", "kept", "alice@enron.com")).unwrap();
        store.bulk_insert(vec![existing]).await.unwrap();

        let report = IngestPipeline::new(store.clone())
            .run(&mut IterSource::new(vec![
                raw("<old>", "again", "different body", "alice@enron.com"),
                raw("<new>", "fresh", "body", "alice@enron.com"),
            ]))
            .await
            .unwrap();

        assert_eq!(store.message_ids(), ["<old>", "<new>"]);
        assert_eq!(report.accepted, 1);
        assert_eq!(report.skipped_duplicate, 1);
        assert_eq!(report.rejected(RejectionKind::Duplicate), 1);
    }

    #[test]
    fn dedup_set_tracks_ids_only_for_admitted_content() {
        let email = |id: &str, body: &str| {
            normalize(raw(id, "s", body, "alice@enron.com")).unwrap().email
        };
        let mut dedup = DedupSet::default();

        assert!(dedup.insert(&email("<1>", "one")));
        assert!(!dedup.insert(&email("<2>", "one")));
        // <2> was refused, so its id is still free
        assert!(dedup.insert(&email("<2>", "two")));
        assert!(!dedup.insert(&email("<2>", "three")));
        assert_eq!(dedup.len(), 2);
    }

    #[tokio::test]
    async fn progress_callback_fires_on_interval_and_at_end() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let pipeline = IngestPipeline::with_config(
            Arc::new(MemoryEmailStore::default()),
            IngestPipelineConfig {
                batch_size: 10,
                progress_interval: 2,
            },
        )
        .on_progress(Arc::new(move |p| sink.lock().unwrap().push(p)));

        let records = (0..5)
            .map(|i| raw(&format!("<{}>", i), "s", &format!("body {}", i), "a@x"))
            .collect::<Vec<_>>();
        pipeline.run(&mut IterSource::new(records)).await.unwrap();

        let seen = seen.lock().unwrap();
        let reads: Vec<u64> = seen.iter().map(|p| p.records_read).collect();
        assert_eq!(reads, [2, 4, 5]);
        assert_eq!(seen[0].pending, 2);
        assert_eq!(seen.last().unwrap().accepted, 5);
    }

    #[tokio::test]
    async fn zero_batch_size_is_rejected() {
        let pipeline = IngestPipeline::with_config(
            Arc::new(MemoryEmailStore::default()),
            IngestPipelineConfig {
                batch_size: 0,
                progress_interval: 0,
            },
        );
        let result = pipeline.run(&mut IterSource::new(Vec::new())).await;
        assert!(matches!(result, Err(IngestError::InvalidConfig(_))));
    }
}
