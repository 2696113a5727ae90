use idem_storage::StorageError;

/// Failure to turn an input into an idempotency key.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("input could not be serialized for key derivation: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("key derivation for use case {use_case} produced an empty key")]
    EmptyKey { use_case: String },

    /// Raised by caller-supplied derivation functions.
    #[error("custom key derivation failed: {0}")]
    Custom(String),
}

/// An [`IdempotencyConfig`](crate::IdempotencyConfig) that cannot uphold
/// at-most-once execution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A zero TTL makes every record expired as soon as it is written.
    #[error("{field} must be greater than zero")]
    ZeroTtl { field: &'static str },
}

/// Everything `Idempotency` can fail with.
///
/// Conditional-write failures never appear here: they are turned into
/// [`BeginOutcome`](crate::BeginOutcome) variants or into the not-found
/// variants below.
#[derive(Debug, thiserror::Error)]
pub enum IdempotencyError {
    /// Begin lost the insert race, but the winning record was gone (deleted
    /// or expired) by the time it was read. A fresh Begin should succeed.
    #[error("idempotency record {use_case}/{key} disappeared before it could be read")]
    UnknownKey { use_case: String, key: String },

    /// Complete found no record: Begin was never called, or the record
    /// expired and was purged first. Only the bookkeeping failed; the use
    /// case itself may well have succeeded.
    #[error("idempotency record not found: {use_case}/{key}")]
    RecordNotFound { use_case: String, key: String },

    /// Abort's delete failed inside the backend. Missing rows never cause
    /// this; treat it as a backend consistency alarm.
    #[error("unable to remove idempotency record {use_case}/{key}: {source}")]
    UnableToRemove {
        use_case: String,
        key: String,
        #[source]
        source: StorageError,
    },

    /// The backend call itself failed (timeout, throttling, transport).
    #[error("persistence failure on {use_case}/{key}: {source}")]
    Persistence {
        use_case: String,
        key: String,
        #[source]
        source: StorageError,
    },

    #[error(transparent)]
    Key(#[from] KeyError),

    /// The coordinator was built with a configuration that fails
    /// [`IdempotencyConfig::validate`](crate::IdempotencyConfig::validate).
    #[error("invalid idempotency configuration: {0}")]
    Config(#[from] ConfigError),

    /// A result payload could not be converted to or from JSON.
    #[error("result payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IdempotencyError {
    /// True when retrying the whole Begin cycle is expected to succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            IdempotencyError::UnknownKey { .. } | IdempotencyError::RecordNotFound { .. }
        )
    }

    pub(crate) fn persistence(use_case: &str, key: &str, source: StorageError) -> Self {
        IdempotencyError::Persistence {
            use_case: use_case.to_string(),
            key: key.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_not_found_variants_are_retryable() {
        let unknown = IdempotencyError::UnknownKey {
            use_case: "uc".into(),
            key: "k".into(),
        };
        let missing = IdempotencyError::RecordNotFound {
            use_case: "uc".into(),
            key: "k".into(),
        };
        let backend =
            IdempotencyError::persistence("uc", "k", StorageError::Backend("timeout".into()));
        assert!(unknown.is_retryable());
        assert!(missing.is_retryable());
        assert!(!backend.is_retryable());
    }

    #[test]
    fn persistence_message_keeps_backend_text() {
        let err = IdempotencyError::persistence(
            "orders",
            "abc",
            StorageError::Backend("ProvisionedThroughputExceededException".into()),
        );
        let msg = err.to_string();
        assert!(msg.contains("orders/abc"), "{msg}");
        assert!(msg.contains("ProvisionedThroughputExceededException"), "{msg}");
    }
}
