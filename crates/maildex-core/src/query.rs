//! Typed search query
//!
//! A [`SearchQuery`] is a plain struct of optional filters plus the required
//! inbox and keyword list. [`SearchQuery::validate`] enforces the agent-facing
//! preconditions and renders the keywords into an FTS5 match expression in
//! which every keyword is a quoted string literal, so nothing a caller types
//! can be read as query syntax. Keywords the tokenizer would reduce to
//! nothing are dropped; if none survive the query is valid but matches no
//! email.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Hard cap on `max_results`. An agent guardrail, not a performance limit.
pub const MAX_SEARCH_RESULTS: usize = 10;

/// Caller violated a search precondition. Never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidQuery {
    #[error("No keywords provided for search")]
    EmptyKeywords,

    #[error("max_results must be less than or equal to {cap}, got {requested}")]
    TooManyResults { requested: usize, cap: usize },
}

fn default_max_results() -> usize {
    MAX_SEARCH_RESULTS
}

/// Filtered full-text search request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Mailbox the search is scoped to (sender or any recipient)
    pub inbox: String,
    /// Conjunctive keyword list
    pub keywords: Vec<String>,
    #[serde(default)]
    pub from_addr: Option<String>,
    #[serde(default)]
    pub to_addr: Option<String>,
    /// Inclusive lower bound, day granularity
    #[serde(default)]
    pub sent_after: Option<NaiveDate>,
    /// Exclusive upper bound, day granularity
    #[serde(default)]
    pub sent_before: Option<NaiveDate>,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl SearchQuery {
    pub fn new<I, S>(inbox: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inbox: inbox.into(),
            keywords: keywords.into_iter().map(Into::into).collect(),
            from_addr: None,
            to_addr: None,
            sent_after: None,
            sent_before: None,
            max_results: MAX_SEARCH_RESULTS,
        }
    }

    #[must_use]
    pub fn from_addr(mut self, addr: impl Into<String>) -> Self {
        self.from_addr = Some(addr.into());
        self
    }

    #[must_use]
    pub fn to_addr(mut self, addr: impl Into<String>) -> Self {
        self.to_addr = Some(addr.into());
        self
    }

    #[must_use]
    pub fn sent_after(mut self, date: NaiveDate) -> Self {
        self.sent_after = Some(date);
        self
    }

    #[must_use]
    pub fn sent_before(mut self, date: NaiveDate) -> Self {
        self.sent_before = Some(date);
        self
    }

    #[must_use]
    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Check preconditions and render the match expression.
    pub fn validate(&self) -> Result<ValidatedQuery<'_>, InvalidQuery> {
        if self.keywords.is_empty() {
            return Err(InvalidQuery::EmptyKeywords);
        }

        if self.max_results > MAX_SEARCH_RESULTS {
            return Err(InvalidQuery::TooManyResults {
                requested: self.max_results,
                cap: MAX_SEARCH_RESULTS,
            });
        }

        let terms: Vec<String> = self
            .keywords
            .iter()
            .filter(|keyword| {
                let searchable = has_searchable_char(keyword);
                if !searchable {
                    debug!(keyword = %keyword, "Dropping keyword without searchable characters");
                }
                searchable
            })
            .map(|keyword| quote_fts_term(keyword))
            .collect();

        Ok(ValidatedQuery {
            query: self,
            match_expression: terms.join(" AND "),
        })
    }
}

/// A query that passed [`SearchQuery::validate`]
#[derive(Debug, Clone)]
pub struct ValidatedQuery<'a> {
    query: &'a SearchQuery,
    match_expression: String,
}

impl<'a> ValidatedQuery<'a> {
    /// FTS5 expression; bind it as a parameter, never splice it into SQL.
    /// Empty when [`has_terms`](Self::has_terms) is false.
    pub fn match_expression(&self) -> &str {
        &self.match_expression
    }

    /// False when every keyword was dropped; such a query matches nothing.
    pub fn has_terms(&self) -> bool {
        !self.match_expression.is_empty()
    }

    pub fn inbox(&self) -> &'a str {
        &self.query.inbox
    }

    pub fn from_filter(&self) -> Option<&'a str> {
        non_blank(self.query.from_addr.as_deref())
    }

    pub fn to_filter(&self) -> Option<&'a str> {
        non_blank(self.query.to_addr.as_deref())
    }

    /// Inclusive lower bound in stored timestamp form
    pub fn sent_after_bound(&self) -> Option<String> {
        self.query.sent_after.map(day_start)
    }

    /// Exclusive upper bound in stored timestamp form
    pub fn sent_before_bound(&self) -> Option<String> {
        self.query.sent_before.map(day_start)
    }

    pub fn limit(&self) -> usize {
        self.query.max_results
    }
}

/// Render `term` as an FTS5 string literal.
pub fn quote_fts_term(term: &str) -> String {
    format!("\"{}\"", term.replace('"', "\"\""))
}

/// Whether the default FTS5 tokenizer would produce at least one token.
pub fn has_searchable_char(term: &str) -> bool {
    term.chars().any(char::is_alphanumeric)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn day_start(date: NaiveDate) -> String {
    format!("{} 00:00:00", date.format("%Y-%m-%d"))
}
