//! Record model
//!
//! Typed representations of an ingested email, its recipient edges, and the
//! raw corpus line they are built from.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Longest accepted body, counted in Unicode scalar values.
pub const MAX_BODY_CHARS: usize = 5000;

/// Largest accepted `to + cc + bcc` count for one email.
pub const MAX_RECIPIENTS: usize = 30;

/// Storage format of [`Email::date`]. Lexicographic order equals time order.
pub const EMAIL_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Recipient edge type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientKind {
    To,
    Cc,
    Bcc,
}

impl RecipientKind {
    pub const ALL: [RecipientKind; 3] = [RecipientKind::To, RecipientKind::Cc, RecipientKind::Bcc];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecipientKind::To => "to",
            RecipientKind::Cc => "cc",
            RecipientKind::Bcc => "bcc",
        }
    }
}

impl fmt::Display for RecipientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecipientKind {
    type Err = String;

    /// Case-insensitive: stored tags written by other tools may be upper-cased.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "to" => Ok(RecipientKind::To),
            "cc" => Ok(RecipientKind::Cc),
            "bcc" => Ok(RecipientKind::Bcc),
            other => Err(format!("unknown recipient kind: {other}")),
        }
    }
}

/// An ingested email. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    /// Globally unique primary key
    pub message_id: String,
    pub subject: String,
    pub from_address: String,
    /// Second precision
    #[serde(with = "email_date")]
    pub date: NaiveDateTime,
    pub body: String,
    /// Provenance tag from the source corpus
    pub file_name: String,
}

impl Email {
    /// Body length in characters, the unit [`MAX_BODY_CHARS`] is expressed in.
    pub fn body_chars(&self) -> usize {
        self.body.chars().count()
    }

    /// Date rendered in [`EMAIL_DATE_FORMAT`]
    pub fn date_string(&self) -> String {
        self.date.format(EMAIL_DATE_FORMAT).to_string()
    }
}

/// One `(email, address, kind)` edge. Duplicate tuples are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecipientEdge {
    pub email_id: String,
    pub address: String,
    pub kind: RecipientKind,
}

impl RecipientEdge {
    pub fn new(email_id: impl Into<String>, address: impl Into<String>, kind: RecipientKind) -> Self {
        Self {
            email_id: email_id.into(),
            address: address.into(),
            kind,
        }
    }
}

/// Unit of work for `bulk_insert`: one email and all of its edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailEnvelope {
    pub email: Email,
    pub recipients: Vec<RecipientEdge>,
}

impl EmailEnvelope {
    /// Build an envelope from per-kind address lists, splitting them into typed edges.
    pub fn from_lists(email: Email, to: &[String], cc: &[String], bcc: &[String]) -> Self {
        let mut recipients = Vec::with_capacity(to.len() + cc.len() + bcc.len());
        for (kind, list) in [
            (RecipientKind::To, to),
            (RecipientKind::Cc, cc),
            (RecipientKind::Bcc, bcc),
        ] {
            recipients.extend(
                list.iter()
                    .map(|addr| RecipientEdge::new(&email.message_id, addr, kind)),
            );
        }
        Self { email, recipients }
    }
}

/// Full email as returned by `read`: the stored row plus recipients grouped by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailRecord {
    #[serde(flatten)]
    pub email: Email,
    #[serde(default)]
    pub to_addresses: Vec<String>,
    #[serde(default)]
    pub cc_addresses: Vec<String>,
    #[serde(default)]
    pub bcc_addresses: Vec<String>,
}

impl EmailRecord {
    pub fn new(email: Email) -> Self {
        Self {
            email,
            to_addresses: Vec::new(),
            cc_addresses: Vec::new(),
            bcc_addresses: Vec::new(),
        }
    }

    /// Append an address to the list for `kind`
    pub fn push_recipient(&mut self, kind: RecipientKind, address: String) {
        match kind {
            RecipientKind::To => self.to_addresses.push(address),
            RecipientKind::Cc => self.cc_addresses.push(address),
            RecipientKind::Bcc => self.bcc_addresses.push(address),
        }
    }

    pub fn recipients(&self, kind: RecipientKind) -> &[String] {
        match kind {
            RecipientKind::To => &self.to_addresses,
            RecipientKind::Cc => &self.cc_addresses,
            RecipientKind::Bcc => &self.bcc_addresses,
        }
    }
}

/// One search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub message_id: String,
    /// Excerpt with highlight markers around matched terms
    pub snippet: String,
}

/// One line of the source corpus, before validation.
///
/// Every field is optional here so that a missing value becomes a counted
/// rejection instead of a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEmailRecord {
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default, rename = "from")]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub cc: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub bcc: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

impl RawEmailRecord {
    /// Address list for `kind` with null and blank entries dropped.
    pub fn addresses(&self, kind: RecipientKind) -> Vec<String> {
        let list = match kind {
            RecipientKind::To => &self.to,
            RecipientKind::Cc => &self.cc,
            RecipientKind::Bcc => &self.bcc,
        };
        list.iter()
            .flatten()
            .flatten()
            .map(|addr| addr.trim())
            .filter(|addr| !addr.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Parse a corpus timestamp, truncating to whole seconds.
///
/// Accepts RFC 3339 (converted to UTC), `YYYY-MM-DD HH:MM:SS` and the `T`
/// separated form, with or without fractional seconds.
pub fn parse_email_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let parsed = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.naive_utc())
        .ok()
        .or_else(|| {
            [
                EMAIL_DATE_FORMAT,
                "%Y-%m-%dT%H:%M:%S",
                "%Y-%m-%d %H:%M:%S%.f",
                "%Y-%m-%dT%H:%M:%S%.f",
            ]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        })?;

    Some(parsed.with_nanosecond(0).unwrap_or(parsed))
}

/// Serde adapter for [`Email::date`]
pub mod email_date {
    use super::{parse_email_date, EMAIL_DATE_FORMAT};
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(EMAIL_DATE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_email_date(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid email date: {raw}")))
    }
}
