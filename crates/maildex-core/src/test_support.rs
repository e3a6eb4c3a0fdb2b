//! In-memory store for tests
//!
//! Implements both storage traits with plain vectors. Keyword matching is a
//! case-insensitive substring check, which is close enough to FTS5 for
//! exercising callers but is not a reference for tokenization.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::ingest::{check_limits, RecordRejection};
use crate::query::SearchQuery;
use crate::storage::{BulkInsertReport, EmailReader, EmailWriter, StorageError, StorageResult};
use crate::types::{EmailEnvelope, EmailRecord, RecipientKind, SearchResult};

#[derive(Debug, Default)]
struct MemoryState {
    records: Vec<EmailRecord>,
    finalized: bool,
    last_query: Option<SearchQuery>,
}

/// Vector-backed [`EmailWriter`] + [`EmailReader`]
#[derive(Debug, Default)]
pub struct MemoryEmailStore {
    state: Mutex<MemoryState>,
}

impl MemoryEmailStore {
    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Most recent query passed to `search`, valid or not
    pub fn last_query(&self) -> Option<SearchQuery> {
        self.lock().last_query.clone()
    }

    pub fn is_finalized(&self) -> bool {
        self.lock().finalized
    }

    /// Stored message ids in insertion order
    pub fn message_ids(&self) -> Vec<String> {
        self.lock()
            .records
            .iter()
            .map(|r| r.email.message_id.clone())
            .collect()
    }
}

#[async_trait]
impl EmailWriter for MemoryEmailStore {
    async fn bulk_insert(&self, batch: Vec<EmailEnvelope>) -> StorageResult<BulkInsertReport> {
        let mut state = self.lock();
        if state.finalized {
            return Err(StorageError::ReadOnly);
        }

        let mut report = BulkInsertReport::default();
        for envelope in batch {
            match check_limits(&envelope.email.body, envelope.recipients.len()) {
                Err(RecordRejection::BodyTooLong { .. }) => {
                    report.skipped_too_long += 1;
                    continue;
                }
                Err(_) => {
                    report.skipped_too_many_recipients += 1;
                    continue;
                }
                Ok(()) => {}
            }

            let id = &envelope.email.message_id;
            if state.records.iter().any(|r| &r.email.message_id == id) {
                report.skipped_duplicate += 1;
                continue;
            }

            let mut record = EmailRecord::new(envelope.email);
            for edge in envelope.recipients {
                record.push_recipient(edge.kind, edge.address);
            }
            state.records.push(record);
            report.accepted += 1;
        }
        Ok(report)
    }

    async fn finalize_indexes(&self) -> StorageResult<()> {
        let mut state = self.lock();
        if state.finalized {
            return Err(StorageError::AlreadyFinalized);
        }
        state.finalized = true;
        Ok(())
    }
}

#[async_trait]
impl EmailReader for MemoryEmailStore {
    async fn search(&self, query: &SearchQuery) -> StorageResult<Vec<SearchResult>> {
        let mut state = self.lock();
        state.last_query = Some(query.clone());

        let validated = query.validate()?;
        if !validated.has_terms() {
            return Ok(Vec::new());
        }
        let keywords: Vec<String> = query
            .keywords
            .iter()
            .filter(|k| crate::query::has_searchable_char(k))
            .map(|k| k.to_lowercase())
            .collect();
        let after = validated.sent_after_bound();
        let before = validated.sent_before_bound();

        let mut hits: Vec<&EmailRecord> = state
            .records
            .iter()
            .filter(|r| {
                let inbox = validated.inbox();
                r.email.from_address == inbox || has_recipient(r, inbox)
            })
            .filter(|r| {
                let text = format!("{} {}", r.email.subject, r.email.body).to_lowercase();
                keywords.iter().all(|k| text.contains(k.as_str()))
            })
            .filter(|r| validated.from_filter().map_or(true, |f| r.email.from_address == f))
            .filter(|r| validated.to_filter().map_or(true, |t| has_recipient(r, t)))
            .filter(|r| after.as_ref().map_or(true, |a| r.email.date_string() >= *a))
            .filter(|r| before.as_ref().map_or(true, |b| r.email.date_string() < *b))
            .collect();

        // Stable sort keeps insertion order among equal dates
        hits.sort_by(|a, b| b.email.date.cmp(&a.email.date));

        Ok(hits
            .into_iter()
            .take(validated.limit())
            .map(|r| SearchResult {
                message_id: r.email.message_id.clone(),
                snippet: r
                    .email
                    .body
                    .split_whitespace()
                    .take(15)
                    .collect::<Vec<_>>()
                    .join(" "),
            })
            .collect())
    }

    async fn read(&self, message_id: &str) -> StorageResult<Option<EmailRecord>> {
        Ok(self
            .lock()
            .records
            .iter()
            .find(|r| r.email.message_id == message_id)
            .cloned())
    }
}

fn has_recipient(record: &EmailRecord, address: &str) -> bool {
    RecipientKind::ALL
        .iter()
        .any(|kind| record.recipients(*kind).iter().any(|a| a == address))
}
