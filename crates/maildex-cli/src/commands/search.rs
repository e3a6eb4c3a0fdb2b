use anyhow::{Context, Result};
use chrono::NaiveDate;
use maildex_core::{EmailReader, SearchQuery};
use maildex_sqlite::open_email_store;

use crate::cli::OutputFormat;
use crate::config::CliConfig;
use crate::output;

/// Filters for one search call
#[derive(Debug, Clone)]
pub struct SearchArgs {
    pub inbox: String,
    pub keywords: Vec<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub after: Option<NaiveDate>,
    pub before: Option<NaiveDate>,
    pub limit: Option<usize>,
}

impl SearchArgs {
    pub fn into_query(self, default_limit: usize) -> SearchQuery {
        let mut query = SearchQuery::new(self.inbox, self.keywords)
            .max_results(self.limit.unwrap_or(default_limit));
        if let Some(from) = self.from {
            query = query.from_addr(from);
        }
        if let Some(to) = self.to {
            query = query.to_addr(to);
        }
        if let Some(after) = self.after {
            query = query.sent_after(after);
        }
        if let Some(before) = self.before {
            query = query.sent_before(before);
        }
        query
    }
}

pub async fn execute(config: &CliConfig, args: SearchArgs, format: OutputFormat) -> Result<()> {
    let store = open_email_store(config.sqlite_config())
        .with_context(|| format!("Failed to open store '{}'", config.database_path().display()))?
        .with_snippet_options(config.snippet_options());

    let query = args.into_query(config.settings.search.default_max_results);
    let results = store.search(&query).await?;

    println!("{}", output::search_results(&results, format)?);
    Ok(())
}
