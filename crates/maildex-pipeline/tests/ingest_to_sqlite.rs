//! End-to-end: JSON-lines corpus → pipeline → SQLite store → search/read

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use maildex_core::{EmailReader, RejectionKind, SearchQuery};
use maildex_pipeline::{IngestPipeline, IngestPipelineConfig};
use maildex_sqlite::{create_email_store, open_email_store, SqliteConfig};
use serde_json::json;

use common::{write_corpus, write_corpus_bytes};

#[tokio::test]
async fn duplicate_content_is_stored_once_and_searchable() {
    let body_a = format!("Agenda attached. {}", "x".repeat(83));
    let (_corpus_dir, corpus) = write_corpus(&[
        json!({
            "message_id": "<A@enron>",
            "subject": "Team meeting",
            "from": "alice@x",
            "to": ["bob@x"],
            "date": "2001-05-14 09:30:00",
            "body": body_a,
            "file_name": "alice/inbox/1"
        }),
        json!({
            "message_id": "<B@enron>",
            "subject": "Team meeting",
            "from": "alice@x",
            "to": ["carol@x"],
            "date": "2001-05-15 09:30:00",
            "body": body_a,
            "file_name": "alice/inbox/2"
        }),
    ])
    .unwrap();

    let db_dir = tempfile::TempDir::new().unwrap();
    let db_path = db_dir.path().join("mail.db");
    let store = create_email_store(SqliteConfig::new(&db_path)).unwrap();

    let report = IngestPipeline::new(Arc::new(store))
        .ingest_path(&corpus)
        .await
        .unwrap();
    assert_eq!(report.accepted, 1);
    assert_eq!(report.skipped_duplicate, 1);
    assert_eq!(report.skipped_by_filter, 0);

    let store = open_email_store(SqliteConfig::new(&db_path)).unwrap();
    assert!(store.read("<B@enron>").await.unwrap().is_none());

    let hits = store
        .search(&SearchQuery::new("bob@x", ["meeting"]))
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].message_id, "<A@enron>");
    assert!(hits[0].snippet.to_lowercase().contains("meeting"));
}

#[tokio::test]
async fn round_trip_preserves_recipients_by_kind() {
    let (_corpus_dir, corpus) = write_corpus(&[json!({
        "message_id": "<1>",
        "subject": "Budget",
        "from": "alice@x",
        "to": ["bob@x", null, "", "dan@x"],
        "cc": ["carol@x"],
        "bcc": null,
        "date": "2001-02-03T04:05:06Z",
        "body": "numbers",
        "file_name": "f"
    })])
    .unwrap();

    let db_dir = tempfile::TempDir::new().unwrap();
    let config = SqliteConfig::new(db_dir.path().join("mail.db"));
    let store = Arc::new(create_email_store(config).unwrap());
    IngestPipeline::new(store.clone())
        .ingest_path(&corpus)
        .await
        .unwrap();

    let record = store.read("<1>").await.unwrap().unwrap();
    let set = |v: &[String]| v.iter().cloned().collect::<BTreeSet<_>>();
    assert_eq!(
        set(&record.to_addresses),
        BTreeSet::from(["bob@x".to_string(), "dan@x".to_string()])
    );
    assert_eq!(set(&record.cc_addresses), BTreeSet::from(["carol@x".to_string()]));
    assert!(record.bcc_addresses.is_empty());
    assert_eq!(record.email.date_string(), "2001-02-03 04:05:06");
}

#[tokio::test]
async fn nothing_over_limits_reaches_the_store() {
    let wide: Vec<String> = (0..31).map(|i| format!("u{}@x", i)).collect();
    let (_corpus_dir, corpus) = write_corpus(&[
        json!({"message_id": "<long>", "from": "a@x", "to": ["b@x"], "date": "2001-01-01 00:00:00", "body": "é".repeat(5001)}),
        json!({"message_id": "<edge>", "from": "a@x", "to": ["b@x"], "date": "2001-01-01 00:00:00", "body": "é".repeat(5000)}),
        json!({"message_id": "<wide>", "from": "a@x", "to": wide, "date": "2001-01-01 00:00:00", "body": "hi"}),
        json!({"subject": "no id", "from": "a@x", "date": "2001-01-01 00:00:00"}),
    ])
    .unwrap();

    let db_dir = tempfile::TempDir::new().unwrap();
    let store = Arc::new(create_email_store(SqliteConfig::new(db_dir.path().join("mail.db"))).unwrap());
    let report = IngestPipeline::with_config(
        store.clone(),
        IngestPipelineConfig {
            batch_size: 1,
            progress_interval: 0,
        },
    )
    .ingest_path(&corpus)
    .await
    .unwrap();

    assert_eq!(report.accepted, 1);
    assert_eq!(report.skipped_by_filter, 3);
    assert_eq!(report.rejected(RejectionKind::BodyTooLong), 1);
    assert_eq!(report.rejected(RejectionKind::TooManyRecipients), 1);
    assert_eq!(report.rejected(RejectionKind::MissingField), 1);

    let stats = store.stats().unwrap();
    assert_eq!(stats.emails, 1);
    assert!(stats.finalized);
}

#[tokio::test]
async fn missing_corpus_is_an_error() {
    let store = Arc::new(maildex_sqlite::SqliteEmailStore::memory().unwrap());
    let err = IngestPipeline::new(store)
        .ingest_path("/nonexistent/corpus.jsonl")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("corpus"));
}

#[tokio::test]
async fn non_utf8_line_is_skipped_and_the_run_finalizes() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(
        br#"{"message_id":"<1>","from":"a@x","to":["b@x"],"date":"2001-01-01 00:00:00","body":"gas deal"}"#,
    );
    bytes.push(b'\n');
    bytes.extend_from_slice(b"{\"message_id\":\"<2>\",\"body\":\"\xff\xfe\"}\n");
    bytes.extend_from_slice(
        br#"{"message_id":"<3>","from":"a@x","to":["b@x"],"date":"2001-01-02 00:00:00","body":"gas price"}"#,
    );
    bytes.push(b'\n');
    let (_corpus_dir, corpus) = write_corpus_bytes(&bytes).unwrap();

    let db_dir = tempfile::TempDir::new().unwrap();
    let config = SqliteConfig::new(db_dir.path().join("mail.db"));
    let store = Arc::new(create_email_store(config.clone()).unwrap());
    let report = IngestPipeline::new(store)
        .ingest_path(&corpus)
        .await
        .unwrap();

    assert_eq!(report.records_read, 3);
    assert_eq!(report.accepted, 2);
    assert_eq!(report.rejected(RejectionKind::Malformed), 1);

    let reader = open_email_store(config).unwrap();
    let hits = reader
        .search(&SearchQuery::new("b@x", ["gas"]))
        .await
        .unwrap();
    assert_eq!(hits.len(), 2);
}
