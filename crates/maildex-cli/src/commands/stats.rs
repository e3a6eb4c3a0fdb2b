use anyhow::{Context, Result};
use maildex_sqlite::{SqliteEmailStore, SqlitePool};

use crate::cli::OutputFormat;
use crate::config::CliConfig;
use crate::output;

/// Works on unfinalized stores too, so an interrupted ingest can be inspected.
pub async fn execute(config: &CliConfig, format: OutputFormat) -> Result<()> {
    let pool = SqlitePool::open_read_only(config.sqlite_config())
        .with_context(|| format!("Failed to open store '{}'", config.database_path().display()))?;
    let store = SqliteEmailStore::new(pool);

    let stats = tokio::task::spawn_blocking(move || store.stats()).await??;

    println!(
        "{}",
        output::stats(&stats, config.database_path(), format)?
    );
    Ok(())
}
