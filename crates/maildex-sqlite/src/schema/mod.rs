//! Store layout: creation, version check and the finalized flag
//!
//! A store is a single SQLite file. `store_meta` records which layout wrote it
//! and whether the full-text index has been finalized; a file without that
//! table but with other tables in it belongs to something else and is
//! refused rather than overwritten.

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{SqliteError, SqliteResult};

/// Layout version - increment when changing the tables below
pub const LAYOUT_VERSION: i64 = 1;

const META_LAYOUT_VERSION: &str = "layout_version";
const META_FINALIZED: &str = "finalized";

/// Create the layout in an empty file, or verify the one that is there
pub fn ensure_layout(conn: &Connection) -> SqliteResult<()> {
    if table_exists(conn, "store_meta")? {
        return verify_version(conn);
    }

    let existing = user_tables(conn)?;
    if !existing.is_empty() {
        return Err(SqliteError::IncompatibleLayout {
            found: format!("unversioned tables [{}]", existing.join(", ")),
            expected: expected_layout(),
        });
    }

    info!(version = LAYOUT_VERSION, "Creating store layout");
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(LAYOUT_V1)
        .map_err(|e| SqliteError::Schema(format!("Failed to create layout: {}", e)))?;
    tx.execute(
        "INSERT INTO store_meta (key, value) VALUES (?1, ?2), (?3, '0')",
        rusqlite::params![META_LAYOUT_VERSION, LAYOUT_VERSION.to_string(), META_FINALIZED],
    )?;
    tx.commit()?;
    Ok(())
}

/// Verify an existing layout without creating anything
pub fn check_layout(conn: &Connection) -> SqliteResult<()> {
    if table_exists(conn, "store_meta")? {
        return verify_version(conn);
    }

    let existing = user_tables(conn)?;
    let found = if existing.is_empty() {
        "empty database".to_string()
    } else {
        format!("unversioned tables [{}]", existing.join(", "))
    };
    Err(SqliteError::IncompatibleLayout {
        found,
        expected: expected_layout(),
    })
}

pub fn is_finalized(conn: &Connection) -> SqliteResult<bool> {
    Ok(read_meta(conn, META_FINALIZED)?.as_deref() == Some("1"))
}

pub fn mark_finalized(conn: &Connection) -> SqliteResult<()> {
    conn.execute(
        "INSERT INTO store_meta (key, value) VALUES (?1, '1')
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        [META_FINALIZED],
    )?;
    Ok(())
}

fn verify_version(conn: &Connection) -> SqliteResult<()> {
    let found = read_meta(conn, META_LAYOUT_VERSION)?;
    debug!(?found, expected = LAYOUT_VERSION, "Checking store layout");

    match found.as_deref().map(str::parse::<i64>) {
        Some(Ok(version)) if version == LAYOUT_VERSION => Ok(()),
        _ => Err(SqliteError::IncompatibleLayout {
            found: found.map_or_else(
                || "no layout version".to_string(),
                |v| format!("maildex layout v{}", v),
            ),
            expected: expected_layout(),
        }),
    }
}

fn expected_layout() -> String {
    format!("maildex layout v{}", LAYOUT_VERSION)
}

fn read_meta(conn: &Connection, key: &str) -> SqliteResult<Option<String>> {
    Ok(conn
        .query_row("SELECT value FROM store_meta WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()?)
}

fn table_exists(conn: &Connection, name: &str) -> SqliteResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn user_tables(conn: &Connection) -> SqliteResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
         ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(names)
}

/// Layout v1
const LAYOUT_V1: &str = r#"
-- ============================================================================
-- TABLE: store_meta
-- ============================================================================
-- Layout version and finalized flag

CREATE TABLE store_meta (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
);

-- ============================================================================
-- TABLE: emails
-- ============================================================================
-- One row per accepted email; `id` is the full-text rowid

CREATE TABLE emails (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    message_id TEXT NOT NULL UNIQUE,
    subject TEXT NOT NULL DEFAULT '',
    from_address TEXT NOT NULL,
    date TEXT NOT NULL,  -- 'YYYY-MM-DD HH:MM:SS', sorts chronologically
    body TEXT NOT NULL DEFAULT '',
    file_name TEXT NOT NULL DEFAULT ''
);

CREATE INDEX idx_emails_from ON emails(from_address);
CREATE INDEX idx_emails_date ON emails(date);

-- ============================================================================
-- TABLE: recipients
-- ============================================================================
-- One row per (email, address, kind) edge

CREATE TABLE recipients (
    id INTEGER PRIMARY KEY,
    email_id TEXT NOT NULL REFERENCES emails(message_id) ON DELETE CASCADE,
    recipient_address TEXT NOT NULL,
    recipient_type TEXT NOT NULL CHECK (lower(recipient_type) IN ('to', 'cc', 'bcc'))
);

CREATE INDEX idx_recipients_address ON recipients(recipient_address);
CREATE INDEX idx_recipients_type ON recipients(recipient_type);
CREATE INDEX idx_recipients_email_id ON recipients(email_id);
CREATE INDEX idx_recipients_address_email ON recipients(recipient_address, email_id);

-- ============================================================================
-- FTS5: emails_fts
-- ============================================================================
-- External-content index over subject and body, kept in step by triggers

CREATE VIRTUAL TABLE emails_fts USING fts5(
    subject,
    body,
    content = 'emails',
    content_rowid = 'id'
);

CREATE TRIGGER emails_ai AFTER INSERT ON emails BEGIN
    INSERT INTO emails_fts (rowid, subject, body)
    VALUES (new.id, new.subject, new.body);
END;

CREATE TRIGGER emails_ad AFTER DELETE ON emails BEGIN
    INSERT INTO emails_fts (emails_fts, rowid, subject, body)
    VALUES ('delete', old.id, old.subject, old.body);
END;

CREATE TRIGGER emails_au AFTER UPDATE ON emails BEGIN
    INSERT INTO emails_fts (emails_fts, rowid, subject, body)
    VALUES ('delete', old.id, old.subject, old.body);
    INSERT INTO emails_fts (rowid, subject, body)
    VALUES (new.id, new.subject, new.body);
END;
"#;
