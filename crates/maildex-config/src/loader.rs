//! Config file discovery and loading

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::MaildexConfig;
use crate::error::ConfigError;

/// Loads [`MaildexConfig`] from TOML
pub struct ConfigLoader;

impl ConfigLoader {
    /// Default config path: `$XDG_CONFIG_HOME/maildex/config.toml`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".config")
            })
            .join("maildex")
            .join("config.toml")
    }

    /// Load and validate a specific file. A missing file is an error.
    pub async fn load_from_file(path: impl AsRef<Path>) -> Result<MaildexConfig, ConfigError> {
        let path = path.as_ref();
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(path.to_path_buf()))
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config = Self::parse(&content, path)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load `explicit` if given, else the default path if it exists, else defaults.
    ///
    /// Returns the config and the file it came from, if any.
    pub async fn load(
        explicit: Option<&Path>,
    ) -> Result<(MaildexConfig, Option<PathBuf>), ConfigError> {
        if let Some(path) = explicit {
            return Ok((Self::load_from_file(path).await?, Some(path.to_path_buf())));
        }

        let default = Self::default_path();
        match Self::load_from_file(&default).await {
            Ok(config) => Ok((config, Some(default))),
            Err(ConfigError::NotFound(_)) => {
                debug!(path = %default.display(), "No config file, using defaults");
                Ok((MaildexConfig::default(), None))
            }
            Err(e) => Err(e),
        }
    }

    /// Parse and validate TOML text; `origin` is only used in errors
    pub fn parse(content: &str, origin: &Path) -> Result<MaildexConfig, ConfigError> {
        let config: MaildexConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }
}
