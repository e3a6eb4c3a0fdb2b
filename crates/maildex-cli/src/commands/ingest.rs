use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use maildex_pipeline::{IngestPipeline, IngestPipelineConfig, IngestProgress};
use maildex_sqlite::create_email_store;
use tracing::info;

use crate::cli::OutputFormat;
use crate::config::CliConfig;
use crate::output;

pub async fn execute(
    config: &CliConfig,
    corpus: &Path,
    batch_size: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let store = create_email_store(config.sqlite_config()).with_context(|| {
        format!(
            "Failed to create store at '{}'",
            config.database_path().display()
        )
    })?;
    info!(db = %config.database_path().display(), corpus = %corpus.display(), "Ingesting");

    let ingest = &config.settings.ingest;
    let pipeline_config = IngestPipelineConfig {
        batch_size: batch_size.unwrap_or(ingest.batch_size),
        progress_interval: ingest.progress_interval,
    };

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg:.cyan} [{elapsed_precise}]")?,
    );
    pb.set_message("Reading corpus...");
    pb.enable_steady_tick(Duration::from_millis(100));

    let bar = pb.clone();
    let pipeline = IngestPipeline::with_config(Arc::new(store), pipeline_config).on_progress(
        Arc::new(move |p: IngestProgress| {
            bar.set_message(format!(
                "{} read, {} stored, {} skipped",
                p.records_read, p.accepted, p.skipped
            ));
        }),
    );

    let result = pipeline.ingest_path(corpus).await;
    pb.finish_and_clear();
    let report = result?;

    println!("{}", output::ingest_report(&report, format)?);
    Ok(())
}
