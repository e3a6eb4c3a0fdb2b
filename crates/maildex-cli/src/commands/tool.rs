use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use maildex_core::scenario::{find, read_scenarios};
use maildex_core::{InboxTools, ToolCall};
use maildex_sqlite::open_email_store;

use crate::config::CliConfig;

/// Run one tool call against a scenario's inbox and print the output as JSON.
pub async fn execute(
    config: &CliConfig,
    scenarios: &Path,
    scenario_id: &str,
    call: &str,
) -> Result<()> {
    let call: ToolCall = serde_json::from_str(call).context("Tool call is not valid JSON")?;

    let rows = read_scenarios(scenarios)
        .with_context(|| format!("Failed to read scenarios from '{}'", scenarios.display()))?;
    let scenario = find(&rows, scenario_id)
        .cloned()
        .ok_or_else(|| anyhow!("No scenario with id '{}'", scenario_id))?;

    let store = open_email_store(config.sqlite_config())
        .with_context(|| format!("Failed to open store '{}'", config.database_path().display()))?
        .with_snippet_options(config.snippet_options());

    let tools = InboxTools::new(Arc::new(store), scenario);
    let output = tools.dispatch(call).await?;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
