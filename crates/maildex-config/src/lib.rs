//! # maildex configuration
//!
//! TOML configuration for the maildex tools. Every section has defaults, so a
//! missing or empty file is valid.
//!
//! ```toml
//! [storage]
//! path = "/data/enron.db"
//! read_connections = 8
//!
//! [ingest]
//! batch_size = 2000
//!
//! [search]
//! snippet_tokens = 20
//!
//! [scenarios]
//! path = "/data/questions.jsonl"
//! max_messages = 1
//! seed = 42
//!
//! [logging]
//! level = "info"
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use maildex_config::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (config, _source) = ConfigLoader::load(None).await?;
//!     println!("{}", config.storage.path.display());
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod loader;

pub use config::*;
pub use error::ConfigError;
pub use loader::ConfigLoader;
