//! Rendering for command results

use std::path::Path;

use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use maildex_core::{EmailRecord, Scenario, SearchResult};
use maildex_pipeline::IngestReport;
use maildex_sqlite::StoreStats;
use serde::Serialize;

use crate::cli::OutputFormat;

fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    table
}

fn json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn search_results(results: &[SearchResult], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json(results),
        OutputFormat::Table if results.is_empty() => Ok("No matching emails".to_string()),
        OutputFormat::Table => {
            let mut t = table(&["#", "Message ID", "Snippet"]);
            for (i, r) in results.iter().enumerate() {
                t.add_row(vec![(i + 1).to_string(), r.message_id.clone(), r.snippet.clone()]);
            }
            Ok(t.to_string())
        }
    }
}

pub fn email(record: Option<&EmailRecord>, format: OutputFormat) -> Result<String> {
    let Some(record) = record else {
        return match format {
            OutputFormat::Json => Ok("null".to_string()),
            OutputFormat::Table => Ok("Email not found".to_string()),
        };
    };

    match format {
        OutputFormat::Json => json(record),
        OutputFormat::Table => {
            let e = &record.email;
            let mut t = table(&["Field", "Value"]);
            t.add_row(vec!["Message ID", e.message_id.as_str()]);
            t.add_row(vec!["Date".to_string(), e.date_string()]);
            t.add_row(vec!["From", e.from_address.as_str()]);
            t.add_row(vec!["To".to_string(), record.to_addresses.join(", ")]);
            t.add_row(vec!["Cc".to_string(), record.cc_addresses.join(", ")]);
            t.add_row(vec!["Bcc".to_string(), record.bcc_addresses.join(", ")]);
            t.add_row(vec!["Subject", e.subject.as_str()]);
            t.add_row(vec!["File", e.file_name.as_str()]);
            Ok(format!("{}\n\n{}", t, e.body))
        }
    }
}

pub fn ingest_report(report: &IngestReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json(report),
        OutputFormat::Table => {
            let mut t = table(&["Counter", "Count"]);
            t.add_row(vec!["records read".to_string(), report.records_read.to_string()]);
            t.add_row(vec!["accepted".to_string(), report.accepted.to_string()]);
            t.add_row(vec![
                "skipped by filter".to_string(),
                report.skipped_by_filter.to_string(),
            ]);
            t.add_row(vec![
                "skipped as duplicate".to_string(),
                report.skipped_duplicate.to_string(),
            ]);
            for (kind, count) in &report.rejections {
                t.add_row(vec![format!("  {:?}", kind), count.to_string()]);
            }
            Ok(t.to_string())
        }
    }
}

pub fn scenarios(rows: &[Scenario], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json(rows),
        OutputFormat::Table => {
            let mut t = table(&["ID", "Inbox", "Date", "Messages", "Question"]);
            for s in rows {
                t.add_row(vec![
                    s.id.clone(),
                    s.inbox_address.clone(),
                    s.query_date.to_string(),
                    s.message_ids.len().to_string(),
                    s.question.clone(),
                ]);
            }
            Ok(format!("{}\n{} scenarios", t, rows.len()))
        }
    }
}

#[derive(Serialize)]
struct StatsView<'a> {
    emails: u64,
    recipients: u64,
    distinct_addresses: u64,
    earliest: Option<&'a str>,
    latest: Option<&'a str>,
    finalized: bool,
    size_bytes: u64,
    database: String,
}

pub fn stats(stats: &StoreStats, database: &Path, format: OutputFormat) -> Result<String> {
    let view = StatsView {
        emails: stats.emails,
        recipients: stats.recipients,
        distinct_addresses: stats.distinct_addresses,
        earliest: stats.earliest.as_deref(),
        latest: stats.latest.as_deref(),
        finalized: stats.finalized,
        size_bytes: stats.db.total_size_bytes,
        database: database.display().to_string(),
    };

    match format {
        OutputFormat::Json => json(&view),
        OutputFormat::Table => {
            let mut t = table(&["Metric", "Value"]);
            t.add_row(vec!["emails".to_string(), view.emails.to_string()]);
            t.add_row(vec!["recipient edges".to_string(), view.recipients.to_string()]);
            t.add_row(vec![
                "distinct recipients".to_string(),
                view.distinct_addresses.to_string(),
            ]);
            t.add_row(vec![
                "date range".to_string(),
                format!(
                    "{} .. {}",
                    view.earliest.unwrap_or("-"),
                    view.latest.unwrap_or("-")
                ),
            ]);
            t.add_row(vec!["finalized".to_string(), view.finalized.to_string()]);
            t.add_row(vec![
                "size".to_string(),
                format!("{:.1} MiB", view.size_bytes as f64 / (1024.0 * 1024.0)),
            ]);
            t.add_row(vec!["database".to_string(), view.database.clone()]);
            Ok(t.to_string())
        }
    }
}
