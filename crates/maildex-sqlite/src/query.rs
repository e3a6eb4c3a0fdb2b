//! Search and read against the store
//!
//! Every caller-supplied value travels as a bound parameter. The SQL text is
//! assembled only from fixed fragments chosen by which filters are present.

use rusqlite::types::{Type, Value};
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use maildex_core::types::parse_email_date;
use maildex_core::{Email, EmailRecord, RecipientKind, SearchResult, ValidatedQuery};

use crate::error::SqliteResult;

/// Highlight markup for search snippets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetOptions {
    pub open: String,
    pub close: String,
    pub ellipsis: String,
    /// Approximate snippet length in tokens (FTS5 caps this at 64)
    pub tokens: u8,
}

impl Default for SnippetOptions {
    fn default() -> Self {
        Self {
            open: "<b>".to_string(),
            close: "</b>".to_string(),
            ellipsis: " ... ".to_string(),
            tokens: 15,
        }
    }
}

/// SQL text plus its positional parameters
#[derive(Debug, Clone)]
pub struct CompiledSearch {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Translate a validated query into a single statement.
///
/// Expects [`ValidatedQuery::has_terms`]; [`search`] skips the statement otherwise.
pub fn compile_search(query: &ValidatedQuery<'_>, snippet: &SnippetOptions) -> CompiledSearch {
    let mut sql = String::from(
        "SELECT e.message_id, snippet(emails_fts, -1, ?, ?, ?, ?)
         FROM emails_fts
         JOIN emails e ON e.id = emails_fts.rowid
         WHERE emails_fts MATCH ?",
    );
    let mut params = vec![
        Value::Text(snippet.open.clone()),
        Value::Text(snippet.close.clone()),
        Value::Text(snippet.ellipsis.clone()),
        Value::Integer(i64::from(snippet.tokens)),
        Value::Text(query.match_expression().to_string()),
    ];

    // Inbox scope: sender, or any recipient edge of any kind
    sql.push_str(
        " AND (e.from_address = ?
               OR EXISTS (SELECT 1 FROM recipients r
                          WHERE r.recipient_address = ? AND r.email_id = e.message_id))",
    );
    params.push(Value::Text(query.inbox().to_string()));
    params.push(Value::Text(query.inbox().to_string()));

    if let Some(from) = query.from_filter() {
        sql.push_str(" AND e.from_address = ?");
        params.push(Value::Text(from.to_string()));
    }

    if let Some(to) = query.to_filter() {
        sql.push_str(
            " AND EXISTS (SELECT 1 FROM recipients r_to
                          WHERE r_to.recipient_address = ? AND r_to.email_id = e.message_id)",
        );
        params.push(Value::Text(to.to_string()));
    }

    if let Some(after) = query.sent_after_bound() {
        sql.push_str(" AND e.date >= ?");
        params.push(Value::Text(after));
    }

    if let Some(before) = query.sent_before_bound() {
        sql.push_str(" AND e.date < ?");
        params.push(Value::Text(before));
    }

    sql.push_str(" ORDER BY e.date DESC, e.id ASC LIMIT ?");
    params.push(Value::Integer(
        i64::try_from(query.limit()).unwrap_or(i64::MAX),
    ));

    CompiledSearch { sql, params }
}

pub fn search(
    conn: &Connection,
    query: &ValidatedQuery<'_>,
    snippet: &SnippetOptions,
) -> SqliteResult<Vec<SearchResult>> {
    if query.limit() == 0 || !query.has_terms() {
        return Ok(Vec::new());
    }

    let compiled = compile_search(query, snippet);
    debug!(
        match_expression = query.match_expression(),
        params = compiled.params.len(),
        "Executing search"
    );

    let mut stmt = conn.prepare_cached(&compiled.sql)?;
    let results = stmt
        .query_map(params_from_iter(compiled.params.iter()), |row| {
            Ok(SearchResult {
                message_id: row.get(0)?,
                snippet: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(results)
}

/// Fetch one email with its recipients; `None` for an unknown id.
pub fn read(conn: &Connection, message_id: &str) -> SqliteResult<Option<EmailRecord>> {
    let email = conn
        .prepare_cached(
            "SELECT message_id, subject, from_address, date, body, file_name
             FROM emails WHERE message_id = ?1",
        )?
        .query_row([message_id], |row| {
            let raw_date: String = row.get(3)?;
            let date = parse_email_date(&raw_date).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    3,
                    Type::Text,
                    format!("unparseable stored date {:?}", raw_date).into(),
                )
            })?;
            Ok(Email {
                message_id: row.get(0)?,
                subject: row.get(1)?,
                from_address: row.get(2)?,
                date,
                body: row.get(4)?,
                file_name: row.get(5)?,
            })
        })
        .optional()?;

    let Some(email) = email else {
        return Ok(None);
    };

    let mut record = EmailRecord::new(email);
    let mut stmt = conn.prepare_cached(
        "SELECT recipient_address, recipient_type FROM recipients
         WHERE email_id = ?1 ORDER BY id",
    )?;
    let edges = stmt
        .query_map([message_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    for (address, kind) in edges {
        match kind.parse::<RecipientKind>() {
            Ok(kind) => record.push_recipient(kind, address),
            Err(_) => warn!(message_id, kind = %kind, "Skipping recipient with unknown kind"),
        }
    }

    Ok(Some(record))
}
