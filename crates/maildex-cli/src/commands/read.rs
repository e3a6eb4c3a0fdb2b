use anyhow::{Context, Result};
use maildex_core::EmailReader;
use maildex_sqlite::open_email_store;

use crate::cli::OutputFormat;
use crate::config::CliConfig;
use crate::output;

pub async fn execute(config: &CliConfig, message_id: &str, format: OutputFormat) -> Result<()> {
    let store = open_email_store(config.sqlite_config())
        .with_context(|| format!("Failed to open store '{}'", config.database_path().display()))?;

    let record = store.read(message_id).await?;
    println!("{}", output::email(record.as_ref(), format)?);
    Ok(())
}
