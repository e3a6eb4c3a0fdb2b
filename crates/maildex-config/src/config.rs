//! Configuration sections
//!
//! Every section is `#[serde(default)]`, so an empty file (or no file) is a
//! complete configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable that overrides `storage.path`
pub const DB_PATH_ENV: &str = "MAILDEX_DB";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaildexConfig {
    pub storage: StorageConfig,
    pub ingest: IngestConfig,
    pub search: SearchConfig,
    pub scenarios: ScenariosConfig,
    pub logging: LoggingConfig,
}

/// Database file and SQLite tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub path: PathBuf,
    pub wal_mode: bool,
    pub busy_timeout_ms: u64,
    /// SQLite `cache_size`; negative is KiB
    pub cache_size: i64,
    pub mmap_size: u64,
    pub read_connections: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./maildex.db"),
            wal_mode: true,
            busy_timeout_ms: 5000,
            cache_size: -64_000,
            mmap_size: 256 * 1024 * 1024,
            read_connections: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub batch_size: usize,
    /// Records between progress reports; 0 disables them
    pub progress_interval: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            progress_interval: 10_000,
        }
    }
}

/// Snippet markup and result defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub snippet_open: String,
    pub snippet_close: String,
    pub snippet_ellipsis: String,
    pub snippet_tokens: u8,
    pub default_max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            snippet_open: "<b>".to_string(),
            snippet_close: "</b>".to_string(),
            snippet_ellipsis: " ... ".to_string(),
            snippet_tokens: 15,
            default_max_results: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenariosConfig {
    /// Default scenario file for `mdx scenarios` and `mdx tool`
    pub path: Option<PathBuf>,
    pub max_messages: Option<usize>,
    pub seed: Option<u64>,
    pub limit: Option<usize>,
}

impl Default for ScenariosConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_messages: Some(1),
            seed: None,
            limit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `maildex_sqlite=debug`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl MaildexConfig {
    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ingest.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "ingest.batch_size must be at least 1".to_string(),
            ));
        }
        if self.storage.read_connections == 0 {
            return Err(ConfigError::Invalid(
                "storage.read_connections must be at least 1".to_string(),
            ));
        }
        if !(1..=64).contains(&self.search.snippet_tokens) {
            return Err(ConfigError::Invalid(format!(
                "search.snippet_tokens must be between 1 and 64, got {}",
                self.search.snippet_tokens
            )));
        }
        if self.search.default_max_results > 10 {
            return Err(ConfigError::Invalid(format!(
                "search.default_max_results must be at most 10, got {}",
                self.search.default_max_results
            )));
        }
        Ok(())
    }

    /// Apply `MAILDEX_DB` from `lookup` (normally `std::env::var`)
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(DB_PATH_ENV).filter(|p| !p.trim().is_empty()) {
            tracing::debug!(path = %path, "Database path from {}", DB_PATH_ENV);
            self.storage.path = PathBuf::from(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn defaults_are_valid() {
        MaildexConfig::default().validate().unwrap();
    }

    #[test_case(|c: &mut MaildexConfig| c.ingest.batch_size = 0 ; "zero batch size")]
    #[test_case(|c: &mut MaildexConfig| c.storage.read_connections = 0 ; "zero readers")]
    #[test_case(|c: &mut MaildexConfig| c.search.snippet_tokens = 0 ; "zero snippet tokens")]
    #[test_case(|c: &mut MaildexConfig| c.search.snippet_tokens = 65 ; "too many snippet tokens")]
    #[test_case(|c: &mut MaildexConfig| c.search.default_max_results = 11 ; "result cap")]
    fn invalid_values_are_rejected(tweak: fn(&mut MaildexConfig)) {
        let mut config = MaildexConfig::default();
        tweak(&mut config);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn env_override_replaces_path() {
        let mut config = MaildexConfig::default();
        config.apply_env_overrides(|key| {
            (key == DB_PATH_ENV).then(|| "/tmp/other.db".to_string())
        });
        assert_eq!(config.storage.path, PathBuf::from("/tmp/other.db"));
    }

    #[test]
    fn blank_env_override_is_ignored() {
        let mut config = MaildexConfig::default();
        config.apply_env_overrides(|_| Some("  ".to_string()));
        assert_eq!(config.storage.path, PathBuf::from("./maildex.db"));
    }
}
