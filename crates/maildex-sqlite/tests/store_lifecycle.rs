//! Initialize / finalize / open transitions

use chrono::NaiveDate;
use maildex_core::{
    Email, EmailEnvelope, EmailReader, EmailWriter, SearchQuery, StorageError, StoreInitError,
};
use maildex_sqlite::{create_email_store, open_email_store, SqliteConfig, SqliteEmailStore};
use rusqlite::Connection;
use tempfile::TempDir;

fn envelope(id: &str) -> EmailEnvelope {
    EmailEnvelope::from_lists(
        Email {
            message_id: id.to_string(),
            subject: "Lunch".to_string(),
            from_address: "alice@enron.com".to_string(),
            date: NaiveDate::from_ymd_opt(2001, 7, 4)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            body: "tacos on friday".to_string(),
            file_name: String::new(),
        },
        &["bob@enron.com".to_string()],
        &[],
        &[],
    )
}

fn config(dir: &TempDir) -> SqliteConfig {
    SqliteConfig::new(dir.path().join("mail.db")).with_read_connections(1)
}

#[tokio::test]
async fn open_requires_finalized_store() {
    let dir = TempDir::new().unwrap();
    let store = create_email_store(config(&dir)).unwrap();
    store.bulk_insert(vec![envelope("<1>")]).await.unwrap();
    drop(store);

    let err = open_email_store(config(&dir)).err().unwrap();
    assert!(matches!(err, StoreInitError::NotFinalized(_)));
}

#[tokio::test]
async fn finalized_store_is_read_only() {
    let dir = TempDir::new().unwrap();
    let store = create_email_store(config(&dir)).unwrap();
    store.bulk_insert(vec![envelope("<1>")]).await.unwrap();
    store.finalize_indexes().await.unwrap();

    assert_eq!(
        store.finalize_indexes().await.unwrap_err(),
        StorageError::AlreadyFinalized
    );
    assert_eq!(
        store.bulk_insert(vec![envelope("<2>")]).await.unwrap_err(),
        StorageError::ReadOnly
    );
    drop(store);

    let reader = open_email_store(config(&dir)).unwrap();
    let hits = reader
        .search(&SearchQuery::new("bob@enron.com", ["tacos"]))
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(
        reader.bulk_insert(vec![envelope("<3>")]).await.unwrap_err(),
        StorageError::ReadOnly
    );
    assert_eq!(
        reader.finalize_indexes().await.unwrap_err(),
        StorageError::AlreadyFinalized
    );

    let stats = reader.stats().unwrap();
    assert!(stats.finalized);
    assert_eq!(stats.emails, 1);
}

#[tokio::test]
async fn reinitialize_keeps_existing_rows() {
    let dir = TempDir::new().unwrap();
    let store = create_email_store(config(&dir)).unwrap();
    store.bulk_insert(vec![envelope("<1>")]).await.unwrap();
    drop(store);

    let store = create_email_store(config(&dir)).unwrap();
    let report = store
        .bulk_insert(vec![envelope("<1>"), envelope("<2>")])
        .await
        .unwrap();
    assert_eq!(report.accepted, 1);
    assert_eq!(report.skipped_duplicate, 1);
}

#[test]
fn foreign_database_is_refused_untouched() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mail.db");
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE notes (id TEXT PRIMARY KEY); INSERT INTO notes VALUES ('keep');")
            .unwrap();
    }

    let err = create_email_store(SqliteConfig::new(&path)).err().unwrap();
    assert!(matches!(err, StoreInitError::IncompatibleLayout { .. }));

    let conn = Connection::open(&path).unwrap();
    let kept: String = conn
        .query_row("SELECT id FROM notes", [], |row| row.get(0))
        .unwrap();
    assert_eq!(kept, "keep");
    let emails: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE name = 'emails'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(emails, 0);
}

#[test]
fn unwritable_location_is_reported() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"file").unwrap();

    let err = create_email_store(SqliteConfig::new(blocker.join("mail.db")))
        .err()
        .unwrap();
    assert!(matches!(err, StoreInitError::Unwritable { .. }));
}

#[test]
fn open_missing_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let result = SqliteEmailStore::open(SqliteConfig::new(dir.path().join("absent.db")));
    assert!(result.is_err());
}
