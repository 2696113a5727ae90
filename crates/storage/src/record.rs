use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a stored idempotency record.
///
/// "Absent" is not a variant: a missing or expired row is the absent state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdempotencyStatus {
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
}

impl IdempotencyStatus {
    /// The string persisted by durable backends.
    pub fn as_str(&self) -> &'static str {
        match self {
            IdempotencyStatus::InProgress => "in progress",
            IdempotencyStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for IdempotencyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a persisted status string is not one we recognise.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown idempotency status: {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for IdempotencyStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in progress" => Ok(IdempotencyStatus::InProgress),
            "completed" => Ok(IdempotencyStatus::Completed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// One idempotency record, identified by (use_case, key).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub use_case: String,
    pub key: String,
    pub status: IdempotencyStatus,
    /// Serialized use case result. Only present once the record is Completed.
    pub result_data: Option<serde_json::Value>,
    /// Absolute expiry, epoch milliseconds.
    pub expiration: i64,
    /// RFC 3339 timestamp string. Informational only.
    pub created_at: String,
}

impl IdempotencyRecord {
    /// A fresh InProgress record, as written by Begin.
    pub fn in_progress(
        use_case: impl Into<String>,
        key: impl Into<String>,
        expiration: i64,
        created_at: impl Into<String>,
    ) -> Self {
        Self {
            use_case: use_case.into(),
            key: key.into(),
            status: IdempotencyStatus::InProgress,
            result_data: None,
            expiration,
            created_at: created_at.into(),
        }
    }

    /// An expired record is logically absent, whatever its stored status.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms >= self.expiration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_match_persisted_form() {
        assert_eq!(IdempotencyStatus::InProgress.as_str(), "in progress");
        assert_eq!(
            "completed".parse::<IdempotencyStatus>(),
            Ok(IdempotencyStatus::Completed)
        );
        assert_eq!(
            "unknown".parse::<IdempotencyStatus>(),
            Err(UnknownStatus("unknown".to_string()))
        );
    }

    #[test]
    fn status_serializes_with_spaces() {
        let json = serde_json::to_string(&IdempotencyStatus::InProgress).unwrap();
        assert_eq!(json, "\"in progress\"");
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let record = IdempotencyRecord::in_progress("uc", "k", 1_000, "2026-01-01T00:00:00Z");
        assert!(!record.is_expired(999));
        assert!(record.is_expired(1_000));
        assert!(record.is_expired(1_001));
    }
}
