//! Evaluation scenarios
//!
//! A scenario is a question about one inbox, its ground-truth answer and the
//! message ids that justify it. Scenarios are produced independently of the
//! store and may reference ids the store does not contain.
//!
//! [`ScenarioLoader`] applies its options in a fixed order: filter by
//! `max_messages`, then shuffle, then truncate to `limit`, so `limit` always
//! bounds the returned set.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::types::parse_email_date;

/// Dataset split
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    #[default]
    Train,
    Test,
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Split::Train => f.write_str("train"),
            Split::Test => f.write_str("test"),
        }
    }
}

impl FromStr for Split {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "train" => Ok(Split::Train),
            "test" => Ok(Split::Test),
            other => Err(format!("unknown split: {other}")),
        }
    }
}

/// An evaluation question. Read-only to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub question: String,
    pub answer: String,
    pub inbox_address: String,
    /// Searches on behalf of this scenario only see mail sent before this day
    #[serde(deserialize_with = "lenient_date")]
    pub query_date: NaiveDate,
    /// Ground-truth email references, in order
    #[serde(default)]
    pub message_ids: Vec<String>,
    #[serde(default)]
    pub how_realistic: f64,
    #[serde(default)]
    pub split: Option<Split>,
}

/// Ordering applied between filtering and limiting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Shuffle {
    /// Keep file order
    #[default]
    None,
    /// Same seed, same order, on every run and platform
    Seeded(u64),
    /// Fresh order each run
    Random,
}

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Failed to read scenarios from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid scenario in {path} (line {line}): {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Loads and prepares a reproducible scenario set
#[derive(Debug, Clone)]
pub struct ScenarioLoader {
    split: Split,
    max_messages: Option<usize>,
    shuffle: Shuffle,
    limit: Option<usize>,
}

impl Default for ScenarioLoader {
    fn default() -> Self {
        Self {
            split: Split::Train,
            max_messages: Some(1),
            shuffle: Shuffle::None,
            limit: None,
        }
    }
}

impl ScenarioLoader {
    pub fn new(split: Split) -> Self {
        Self {
            split,
            ..Self::default()
        }
    }

    /// Keep only scenarios referencing at most `max` messages (`None` keeps all)
    #[must_use]
    pub fn max_messages(mut self, max: Option<usize>) -> Self {
        self.max_messages = max;
        self
    }

    #[must_use]
    pub fn shuffle(mut self, shuffle: Shuffle) -> Self {
        self.shuffle = shuffle;
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn split(&self) -> Split {
        self.split
    }

    pub fn max_messages_filter(&self) -> Option<usize> {
        self.max_messages
    }

    pub fn shuffle_mode(&self) -> Shuffle {
        self.shuffle
    }

    /// Read `path` and prepare the scenario set.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Vec<Scenario>, ScenarioError> {
        let path = path.as_ref();
        info!(path = %path.display(), split = %self.split, "Loading scenarios");

        let rows = read_scenarios(path)?;
        let scenarios = self.prepare(rows);

        info!(count = scenarios.len(), "Loaded scenarios");
        Ok(scenarios)
    }

    /// Filter, shuffle and limit already-parsed rows.
    ///
    /// Rows tagged with a different split are dropped; untagged rows are
    /// assigned this loader's split.
    pub fn prepare(&self, rows: Vec<Scenario>) -> Vec<Scenario> {
        let total = rows.len();
        let mut scenarios: Vec<Scenario> = rows
            .into_iter()
            .filter(|s| s.split.map_or(true, |split| split == self.split))
            .filter(|s| self.max_messages.map_or(true, |max| s.message_ids.len() <= max))
            .map(|mut s| {
                s.split = Some(self.split);
                s
            })
            .collect();
        debug!(total, kept = scenarios.len(), "Filtered scenarios");

        match self.shuffle {
            Shuffle::None => {}
            Shuffle::Seeded(seed) => {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                scenarios.shuffle(&mut rng);
            }
            Shuffle::Random => scenarios.shuffle(&mut rand::rng()),
        }

        if let Some(limit) = self.limit {
            scenarios.truncate(limit);
        }

        scenarios
    }
}

/// Find a scenario by id
pub fn find<'a>(scenarios: &'a [Scenario], id: &str) -> Option<&'a Scenario> {
    scenarios.iter().find(|s| s.id == id)
}

/// Parse a `.jsonl` file (one scenario per line) or a `.json` array.
pub fn read_scenarios(path: &Path) -> Result<Vec<Scenario>, ScenarioError> {
    let io_err = |source| ScenarioError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(io_err)?;
    let reader = BufReader::new(file);

    let is_json_array = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json_array {
        return serde_json::from_reader(reader).map_err(|source| ScenarioError::Parse {
            path: path.to_path_buf(),
            line: source.line(),
            source,
        });
    }

    let mut scenarios = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(io_err)?;
        if line.trim().is_empty() {
            continue;
        }
        let scenario = serde_json::from_str(&line).map_err(|source| ScenarioError::Parse {
            path: path.to_path_buf(),
            line: index + 1,
            source,
        })?;
        scenarios.push(scenario);
    }
    Ok(scenarios)
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
    })
}

fn lenient_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
    let raw = String::deserialize(deserializer)?;
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .ok()
        .or_else(|| parse_email_date(&raw).map(|dt| dt.date()))
        .ok_or_else(|| serde::de::Error::custom(format!("invalid query_date: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn scenario(id: usize, messages: usize) -> Scenario {
        Scenario {
            id: id.to_string(),
            question: format!("question {id}"),
            answer: format!("answer {id}"),
            inbox_address: "jeff.dasovich@enron.com".to_string(),
            query_date: NaiveDate::from_ymd_opt(2001, 6, 1).unwrap(),
            message_ids: (0..messages).map(|m| format!("<{id}.{m}@enron>")).collect(),
            how_realistic: 0.8,
            split: None,
        }
    }

    fn ids(scenarios: &[Scenario]) -> Vec<String> {
        scenarios.iter().map(|s| s.id.clone()).collect()
    }

    #[test]
    fn filter_keeps_scenarios_within_message_cap() {
        let rows = vec![scenario(1, 1), scenario(2, 2), scenario(3, 0)];
        let kept = ScenarioLoader::new(Split::Train)
            .max_messages(Some(1))
            .prepare(rows);
        assert_eq!(ids(&kept), vec!["1", "3"]);
        assert!(kept.iter().all(|s| s.split == Some(Split::Train)));
    }

    #[test]
    fn seeded_shuffle_is_reproducible() {
        let rows: Vec<Scenario> = (0..50).map(|i| scenario(i, 1)).collect();
        let loader = ScenarioLoader::new(Split::Train).shuffle(Shuffle::Seeded(42));

        let first = ids(&loader.prepare(rows.clone()));
        let second = ids(&loader.prepare(rows.clone()));
        assert_eq!(first, second);
        assert_ne!(first, ids(&rows), "seeded shuffle should reorder 50 rows");
    }

    #[test]
    fn limit_applies_after_filter_and_shuffle() {
        let rows: Vec<Scenario> = (0..20).map(|i| scenario(i, i % 3)).collect();
        let loader = ScenarioLoader::new(Split::Train)
            .max_messages(Some(1))
            .shuffle(Shuffle::Seeded(7))
            .limit(Some(5));

        let limited = loader.prepare(rows.clone());
        assert_eq!(limited.len(), 5);
        assert!(limited.iter().all(|s| s.message_ids.len() <= 1));

        // The limited set is a prefix of the unlimited shuffled set
        let full = loader.clone().limit(None).prepare(rows);
        assert_eq!(ids(&limited), ids(&full[..5]));
    }

    #[test]
    fn rows_from_other_split_are_dropped() {
        let mut test_row = scenario(1, 1);
        test_row.split = Some(Split::Test);
        let kept = ScenarioLoader::new(Split::Train).prepare(vec![test_row, scenario(2, 1)]);
        assert_eq!(ids(&kept), vec!["2"]);
    }

    #[test]
    fn reads_jsonl_with_numeric_ids() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("scenarios.jsonl");
        let mut file = File::create(&path).unwrap();
        writeln!(
            file,
            r#"{{"id": 7, "question": "q", "answer": "a", "inbox_address": "x@enron.com", "query_date": "2001-05-10", "message_ids": ["<m1>"], "how_realistic": 0.5}}"#
        )
        .unwrap();
        writeln!(file).unwrap();
        writeln!(
            file,
            r#"{{"id": "s-8", "question": "q", "answer": "a", "inbox_address": "x@enron.com", "query_date": "2001-05-11 00:00:00", "message_ids": []}}"#
        )
        .unwrap();

        let rows = read_scenarios(&path).unwrap();
        assert_eq!(ids(&rows), vec!["7", "s-8"]);
        assert_eq!(rows[1].query_date, NaiveDate::from_ymd_opt(2001, 5, 11).unwrap());
        assert!(find(&rows, "s-8").is_some());
        assert!(find(&rows, "nope").is_none());
    }

    #[test]
    fn parse_error_reports_line() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.jsonl");
        std::fs::write(&path, "\n{not json}\n").unwrap();

        match read_scenarios(&path) {
            Err(ScenarioError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
