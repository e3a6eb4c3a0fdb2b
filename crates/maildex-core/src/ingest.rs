//! Per-record ingestion rules shared by the pipeline and the store

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{MAX_BODY_CHARS, MAX_RECIPIENTS};

/// Why a raw record did not make it into the store. Non-fatal; aggregated into counters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordRejection {
    #[error("body has {chars} characters (limit {})", MAX_BODY_CHARS)]
    BodyTooLong { chars: usize },

    #[error("{count} recipients (limit {})", MAX_RECIPIENTS)]
    TooManyRecipients { count: usize },

    #[error("duplicate of an earlier record")]
    Duplicate,

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("unparseable date `{0}`")]
    InvalidDate(String),

    #[error("malformed record: {0}")]
    Malformed(String),
}

impl RecordRejection {
    pub fn kind(&self) -> RejectionKind {
        match self {
            RecordRejection::BodyTooLong { .. } => RejectionKind::BodyTooLong,
            RecordRejection::TooManyRecipients { .. } => RejectionKind::TooManyRecipients,
            RecordRejection::Duplicate => RejectionKind::Duplicate,
            RecordRejection::MissingField(_) => RejectionKind::MissingField,
            RecordRejection::InvalidDate(_) => RejectionKind::InvalidDate,
            RecordRejection::Malformed(_) => RejectionKind::Malformed,
        }
    }
}

/// Fieldless discriminant of [`RecordRejection`], used as a counter key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    BodyTooLong,
    TooManyRecipients,
    Duplicate,
    MissingField,
    InvalidDate,
    Malformed,
}

/// Apply the body-length and recipient-count limits. Longer records are
/// rejected, never truncated.
pub fn check_limits(body: &str, recipient_count: usize) -> Result<(), RecordRejection> {
    let chars = body.chars().count();
    if chars > MAX_BODY_CHARS {
        return Err(RecordRejection::BodyTooLong { chars });
    }
    if recipient_count > MAX_RECIPIENTS {
        return Err(RecordRejection::TooManyRecipients {
            count: recipient_count,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_are_inclusive() {
        assert!(check_limits(&"a".repeat(MAX_BODY_CHARS), MAX_RECIPIENTS).is_ok());
    }

    #[test]
    fn body_counted_in_characters_not_bytes() {
        // 5000 two-byte characters is 10000 bytes but still within the limit
        assert!(check_limits(&"é".repeat(MAX_BODY_CHARS), 0).is_ok());
        assert_eq!(
            check_limits(&"é".repeat(MAX_BODY_CHARS + 1), 0),
            Err(RecordRejection::BodyTooLong {
                chars: MAX_BODY_CHARS + 1
            })
        );
    }

    #[test]
    fn body_checked_before_recipients() {
        let err = check_limits(&"a".repeat(MAX_BODY_CHARS + 1), MAX_RECIPIENTS + 1).unwrap_err();
        assert_eq!(err.kind(), RejectionKind::BodyTooLong);
    }

    #[test]
    fn too_many_recipients() {
        assert_eq!(
            check_limits("short", 31).unwrap_err(),
            RecordRejection::TooManyRecipients { count: 31 }
        );
    }
}
