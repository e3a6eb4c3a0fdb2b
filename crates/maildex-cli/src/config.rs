//! Effective CLI configuration: file, then environment, then flags

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use maildex_config::{ConfigLoader, MaildexConfig};
use maildex_sqlite::{SnippetOptions, SqliteConfig};

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub settings: MaildexConfig,
    /// File the settings came from, if any
    pub source: Option<PathBuf>,
}

impl CliConfig {
    pub async fn load(config_path: Option<&Path>, db_override: Option<PathBuf>) -> Result<Self> {
        let (mut settings, source) = ConfigLoader::load(config_path)
            .await
            .context("Failed to load configuration")?;

        settings.apply_env_overrides(|key| std::env::var(key).ok());
        if let Some(db) = db_override {
            settings.storage.path = db;
        }

        Ok(Self { settings, source })
    }

    pub fn database_path(&self) -> &Path {
        &self.settings.storage.path
    }

    pub fn sqlite_config(&self) -> SqliteConfig {
        let storage = &self.settings.storage;
        SqliteConfig {
            path: storage.path.clone(),
            wal_mode: storage.wal_mode,
            busy_timeout_ms: storage.busy_timeout_ms,
            cache_size: storage.cache_size,
            mmap_size: storage.mmap_size,
            read_connections: storage.read_connections,
            ..SqliteConfig::default()
        }
    }

    pub fn snippet_options(&self) -> SnippetOptions {
        let search = &self.settings.search;
        SnippetOptions {
            open: search.snippet_open.clone(),
            close: search.snippet_close.clone(),
            ellipsis: search.snippet_ellipsis.clone(),
            tokens: search.snippet_tokens,
        }
    }
}
