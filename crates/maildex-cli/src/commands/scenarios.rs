use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use maildex_core::{ScenarioLoader, Shuffle, Split};
use tracing::debug;

use crate::cli::OutputFormat;
use crate::config::CliConfig;
use crate::output;

/// Flags of the `scenarios` subcommand, before config fallbacks
#[derive(Debug, Clone, Default)]
pub struct ScenarioArgs {
    pub file: Option<PathBuf>,
    pub split: Split,
    pub max_messages: Option<usize>,
    pub all_messages: bool,
    pub seed: Option<u64>,
    pub shuffle: bool,
    pub limit: Option<usize>,
}

impl ScenarioArgs {
    /// Resolve flags against the `[scenarios]` config section.
    pub fn resolve(self, config: &CliConfig) -> Result<(PathBuf, ScenarioLoader)> {
        let defaults = &config.settings.scenarios;

        let Some(path) = self.file.or_else(|| defaults.path.clone()) else {
            bail!("No scenario file given and [scenarios] path is not set");
        };

        let max_messages = if self.all_messages {
            None
        } else {
            self.max_messages.or(defaults.max_messages)
        };

        let shuffle = match (self.seed.or(defaults.seed), self.shuffle) {
            (_, true) => Shuffle::Random,
            (Some(seed), false) => Shuffle::Seeded(seed),
            (None, false) => Shuffle::None,
        };

        let loader = ScenarioLoader::new(self.split)
            .max_messages(max_messages)
            .shuffle(shuffle)
            .limit(self.limit.or(defaults.limit));
        Ok((path, loader))
    }
}

pub async fn execute(config: &CliConfig, args: ScenarioArgs, format: OutputFormat) -> Result<()> {
    let (path, loader) = args.resolve(config)?;
    debug!(path = %path.display(), ?loader, "Loading scenarios");

    let rows = tokio::task::spawn_blocking({
        let path = path.clone();
        move || loader.load(&path)
    })
    .await?
    .with_context(|| format!("Failed to load scenarios from '{}'", path.display()))?;

    println!("{}", output::scenarios(&rows, format)?);
    Ok(())
}
