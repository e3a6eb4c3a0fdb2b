use anyhow::Result;
use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use maildex_cli::cli::{Cli, Commands};
use maildex_cli::commands;
use maildex_cli::commands::scenarios::ScenarioArgs;
use maildex_cli::commands::search::SearchArgs;
use maildex_cli::config::CliConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = CliConfig::load(cli.config.as_deref(), cli.db.clone()).await?;

    // Priority: --log-level, then --verbose, then RUST_LOG, then config
    let filter = if let Some(level) = cli.log_level {
        EnvFilter::default().add_directive(LevelFilter::from(level).into())
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.settings.logging.level))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Some(source) = &config.source {
        tracing::debug!(path = %source.display(), "Loaded config");
    }

    let format = cli.format;
    match cli.command {
        Commands::Ingest { corpus, batch_size } => {
            commands::ingest::execute(&config, &corpus, batch_size, format).await
        }
        Commands::Search {
            inbox,
            keywords,
            from,
            to,
            after,
            before,
            limit,
        } => {
            let args = SearchArgs {
                inbox,
                keywords,
                from,
                to,
                after,
                before,
                limit,
            };
            commands::search::execute(&config, args, format).await
        }
        Commands::Read { message_id } => {
            commands::read::execute(&config, &message_id, format).await
        }
        Commands::Scenarios {
            file,
            split,
            max_messages,
            all_messages,
            seed,
            shuffle,
            limit,
        } => {
            let args = ScenarioArgs {
                file,
                split: split.into(),
                max_messages,
                all_messages,
                seed,
                shuffle,
                limit,
            };
            commands::scenarios::execute(&config, args, format).await
        }
        Commands::Stats => commands::stats::execute(&config, format).await,
        Commands::Tool {
            scenarios,
            scenario_id,
            call,
        } => commands::tool::execute(&config, &scenarios, &scenario_id, &call).await,
    }
}
