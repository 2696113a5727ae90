use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::{IdempotencyRecord, IdempotencyStatus};

/// The storage trait for idempotency backends.
///
/// An `IdempotencyStore` holds one record per (use_case, key). The
/// coordinator in `idem-core` keeps no state between calls, so every
/// guarantee of the protocol rests on the contract below.
///
/// ## Conditional insert
///
/// `insert_if_absent` is the correctness-critical primitive. It must be a
/// single atomic operation against the backend, linearizable per
/// (use_case, key): of any number of concurrent calls for one identity
/// while no active record exists, exactly one returns `Ok(true)`.
///
/// A row whose `expiration` is at or before `now_ms` counts as absent. The
/// precondition must evaluate this itself; it may not rely on a background
/// expiry sweep having removed the row.
///
/// ## Expiry on reads
///
/// `get` and `update` see expired rows exactly like live ones. Interpreting
/// expiry is the caller's job.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` so a store can be shared
/// across tasks behind an `Arc`.
#[async_trait]
pub trait IdempotencyStore: Send + Sync + 'static {
    /// Insert `record` if no active record exists for its (use_case, key).
    ///
    /// Returns `Ok(false)` when the precondition fails. That outcome is not
    /// an error. An overwritten expired row is replaced entirely,
    /// including any previous `result_data`.
    async fn insert_if_absent(
        &self,
        record: &IdempotencyRecord,
        now_ms: i64,
    ) -> Result<bool, StorageError>;

    /// Read the stored record.
    ///
    /// Returns `Err(StorageError::RecordNotFound)` if no row exists.
    async fn get(&self, use_case: &str, key: &str) -> Result<IdempotencyRecord, StorageError>;

    /// Set status, result and expiration on an existing record.
    ///
    /// Conditional on the row existing. Returns
    /// `Err(StorageError::RecordNotFound)` otherwise.
    async fn update(
        &self,
        use_case: &str,
        key: &str,
        status: IdempotencyStatus,
        result_data: Option<&serde_json::Value>,
        expiration: i64,
    ) -> Result<(), StorageError>;

    /// Remove the record. Deleting a missing row succeeds.
    async fn delete(&self, use_case: &str, key: &str) -> Result<(), StorageError>;
}

#[async_trait]
impl<S: IdempotencyStore> IdempotencyStore for std::sync::Arc<S> {
    async fn insert_if_absent(
        &self,
        record: &IdempotencyRecord,
        now_ms: i64,
    ) -> Result<bool, StorageError> {
        (**self).insert_if_absent(record, now_ms).await
    }

    async fn get(&self, use_case: &str, key: &str) -> Result<IdempotencyRecord, StorageError> {
        (**self).get(use_case, key).await
    }

    async fn update(
        &self,
        use_case: &str,
        key: &str,
        status: IdempotencyStatus,
        result_data: Option<&serde_json::Value>,
        expiration: i64,
    ) -> Result<(), StorageError> {
        (**self)
            .update(use_case, key, status, result_data, expiration)
            .await
    }

    async fn delete(&self, use_case: &str, key: &str) -> Result<(), StorageError> {
        (**self).delete(use_case, key).await
    }
}
