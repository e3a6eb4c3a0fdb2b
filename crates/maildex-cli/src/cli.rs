use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use maildex_core::Split;
use tracing_subscriber::filter::LevelFilter;

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    Info,
    /// Debug messages (default for --verbose)
    Debug,
    /// Trace-level messages (most verbose)
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Output format for listing commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "mdx")]
#[command(about = "mdx - build and query a full-text email store")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level (off, error, warn, info, debug, trace)
    /// If not specified, uses RUST_LOG, then the config file value
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (defaults to ~/.config/maildex/config.toml)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file (overrides MAILDEX_DB and the config file)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load a JSON-lines corpus into a new store and finalize it
    Ingest {
        /// Corpus file, one raw email object per line
        corpus: PathBuf,

        /// Emails per transaction (overrides config)
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Keyword search within one inbox
    Search {
        /// Address whose mailbox is searched (sender or any recipient)
        #[arg(long)]
        inbox: String,

        /// Keyword; repeat for more (all must match)
        #[arg(short = 'k', long = "keyword", required = true)]
        keywords: Vec<String>,

        /// Only mail sent by this address
        #[arg(long)]
        from: Option<String>,

        /// Only mail with this address as a recipient
        #[arg(long)]
        to: Option<String>,

        /// Sent on or after this day (YYYY-MM-DD)
        #[arg(long)]
        after: Option<NaiveDate>,

        /// Sent before this day (YYYY-MM-DD)
        #[arg(long)]
        before: Option<NaiveDate>,

        /// Maximum results (at most 10)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print one email with its recipients
    Read {
        message_id: String,
    },

    /// Load, filter and shuffle an evaluation question set
    Scenarios {
        /// Scenario file (.jsonl or .json); defaults to [scenarios] path
        file: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = SplitArg::Train)]
        split: SplitArg,

        /// Keep scenarios citing at most this many emails
        #[arg(long, conflicts_with = "all_messages")]
        max_messages: Option<usize>,

        /// Disable the message count filter
        #[arg(long)]
        all_messages: bool,

        /// Deterministic shuffle seed
        #[arg(long, conflicts_with = "shuffle")]
        seed: Option<u64>,

        /// Unseeded shuffle
        #[arg(long)]
        shuffle: bool,

        /// Keep only the first N after filtering and shuffling
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show store statistics
    Stats,

    /// Run one agent tool call in the context of a scenario
    Tool {
        /// Scenario file (.jsonl or .json)
        scenarios: PathBuf,

        /// Scenario id
        scenario_id: String,

        /// Tool call as JSON, e.g. '{"tool":"search_inbox","keywords":["gas"]}'
        call: String,
    },
}

/// `--split` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SplitArg {
    Train,
    Test,
}

impl From<SplitArg> for Split {
    fn from(split: SplitArg) -> Self {
        match split {
            SplitArg::Train => Split::Train,
            SplitArg::Test => Split::Test,
        }
    }
}
