/// All errors that can be returned by an IdempotencyStore implementation.
///
/// A failed insert precondition is not an error: `insert_if_absent` reports
/// it as `Ok(false)`.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No record with the given (use_case, key) exists.
    #[error("idempotency record not found: {use_case}/{key}")]
    RecordNotFound { use_case: String, key: String },

    /// A stored row could not be decoded into an `IdempotencyRecord`.
    #[error("malformed idempotency record {use_case}/{key}: {message}")]
    MalformedRecord {
        use_case: String,
        key: String,
        message: String,
    },

    /// A backend-specific failure (timeout, throttling, transport, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn not_found(use_case: &str, key: &str) -> Self {
        StorageError::RecordNotFound {
            use_case: use_case.to_string(),
            key: key.to_string(),
        }
    }
}
