//! Error taxonomy: how store outcomes surface through the coordinator.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use idem_core::{
    BeginOutcome, ConfigError, ExecuteError, Idempotency, IdempotencyConfig, IdempotencyError,
    IdempotencyRecord, IdempotencyStatus, IdempotencyStore, InMemoryStore, KeyDeriver, KeyError,
    ManualClock, StorageError,
};
use serde_json::{json, Value};

const T0: i64 = 1_767_225_600_000;

/// Which store call should fail with a backend error.
#[derive(Debug, Clone, Copy, PartialEq)]
enum FailOn {
    Insert,
    Get,
    Update,
    Delete,
}

/// Wraps an `InMemoryStore`, failing one kind of call with a backend error.
struct FaultyStore {
    inner: InMemoryStore,
    fail_on: FailOn,
    calls: Arc<AtomicUsize>,
}

impl FaultyStore {
    fn new(fail_on: FailOn) -> Self {
        Self {
            inner: InMemoryStore::new(),
            fail_on,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn check(&self, op: FailOn) -> Result<(), StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on == op {
            return Err(StorageError::Backend(format!(
                "ThrottlingException during {op:?}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl IdempotencyStore for FaultyStore {
    async fn insert_if_absent(
        &self,
        record: &IdempotencyRecord,
        now_ms: i64,
    ) -> Result<bool, StorageError> {
        self.check(FailOn::Insert)?;
        self.inner.insert_if_absent(record, now_ms).await
    }

    async fn get(&self, use_case: &str, key: &str) -> Result<IdempotencyRecord, StorageError> {
        self.check(FailOn::Get)?;
        self.inner.get(use_case, key).await
    }

    async fn update(
        &self,
        use_case: &str,
        key: &str,
        status: IdempotencyStatus,
        result_data: Option<&Value>,
        expiration: i64,
    ) -> Result<(), StorageError> {
        self.check(FailOn::Update)?;
        self.inner
            .update(use_case, key, status, result_data, expiration)
            .await
    }

    async fn delete(&self, use_case: &str, key: &str) -> Result<(), StorageError> {
        self.check(FailOn::Delete)?;
        self.inner.delete(use_case, key).await
    }
}

/// Refuses every insert and then finds nothing: the record a concurrent
/// caller held was deleted between our insert and our read.
struct VanishingStore;

#[async_trait]
impl IdempotencyStore for VanishingStore {
    async fn insert_if_absent(
        &self,
        _record: &IdempotencyRecord,
        _now_ms: i64,
    ) -> Result<bool, StorageError> {
        Ok(false)
    }

    async fn get(&self, use_case: &str, key: &str) -> Result<IdempotencyRecord, StorageError> {
        Err(StorageError::not_found(use_case, key))
    }

    async fn update(
        &self,
        use_case: &str,
        key: &str,
        _status: IdempotencyStatus,
        _result_data: Option<&Value>,
        _expiration: i64,
    ) -> Result<(), StorageError> {
        Err(StorageError::not_found(use_case, key))
    }

    async fn delete(&self, _use_case: &str, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Refuses every insert, then returns a row that expired in the meantime.
struct ExpiringStore;

#[async_trait]
impl IdempotencyStore for ExpiringStore {
    async fn insert_if_absent(
        &self,
        _record: &IdempotencyRecord,
        _now_ms: i64,
    ) -> Result<bool, StorageError> {
        Ok(false)
    }

    async fn get(&self, use_case: &str, key: &str) -> Result<IdempotencyRecord, StorageError> {
        Ok(IdempotencyRecord::in_progress(
            use_case,
            key,
            T0,
            "2026-01-01T00:00:00Z",
        ))
    }

    async fn update(
        &self,
        _use_case: &str,
        _key: &str,
        _status: IdempotencyStatus,
        _result_data: Option<&Value>,
        _expiration: i64,
    ) -> Result<(), StorageError> {
        Ok(())
    }

    async fn delete(&self, _use_case: &str, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }
}

fn with_store<S: IdempotencyStore>(store: S) -> Idempotency<S, ManualClock> {
    Idempotency::with_clock(store, IdempotencyConfig::default(), ManualClock::new(T0))
}

fn input() -> Value {
    json!({"name": "John Doe Dorian", "age": 43})
}

// ──────────────────────────────────────────────
// Persistence failures propagate verbatim
// ──────────────────────────────────────────────

#[tokio::test]
async fn insert_failure_is_persistence_error() {
    let idem = with_store(FaultyStore::new(FailOn::Insert));
    let err = idem.begin::<_, Value>("uc", &input()).await.unwrap_err();
    match err {
        IdempotencyError::Persistence { use_case, source, .. } => {
            assert_eq!(use_case, "uc");
            assert!(
                matches!(source, StorageError::Backend(ref m) if m.contains("ThrottlingException"))
            );
        }
        other => panic!("expected Persistence, got {other:?}"),
    }
}

#[tokio::test]
async fn read_failure_after_lost_race_is_persistence_error() {
    let idem = with_store(FaultyStore::new(FailOn::Get));
    idem.begin::<_, Value>("uc", &input()).await.unwrap();

    let err = idem.begin::<_, Value>("uc", &input()).await.unwrap_err();
    assert!(matches!(err, IdempotencyError::Persistence { .. }), "{err:?}");
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn update_failure_is_persistence_error() {
    let idem = with_store(FaultyStore::new(FailOn::Update));
    idem.begin::<_, Value>("uc", &input()).await.unwrap();

    let err = idem
        .complete("uc", &input(), &json!({"id": 1}))
        .await
        .unwrap_err();
    assert!(matches!(err, IdempotencyError::Persistence { .. }), "{err:?}");
}

#[tokio::test]
async fn delete_failure_is_unable_to_remove() {
    let idem = with_store(FaultyStore::new(FailOn::Delete));
    idem.begin::<_, Value>("uc", &input()).await.unwrap();

    let err = idem.abort("uc", &input()).await.unwrap_err();
    match err {
        IdempotencyError::UnableToRemove { use_case, key, .. } => {
            assert_eq!(use_case, "uc");
            assert_eq!(key, idem.derive_key("uc", &input()).unwrap());
        }
        other => panic!("expected UnableToRemove, got {other:?}"),
    }
}

#[tokio::test]
async fn execute_propagates_completion_failure_without_aborting() {
    let store = FaultyStore::new(FailOn::Update);
    let calls = store.calls.clone();
    let idem = with_store(store);

    let err = idem
        .execute("uc", &input(), || async {
            Ok::<_, std::io::Error>(json!({"id": 1}))
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ExecuteError::Idempotency(IdempotencyError::Persistence { .. })
    ));
    // insert + update only: no delete was attempted.
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // The record stays InProgress, blocking duplicates until it expires.
    assert_eq!(
        idem.begin::<_, Value>("uc", &input()).await.unwrap(),
        BeginOutcome::AlreadyInProgress
    );
}

// ──────────────────────────────────────────────
// Not-found conditions
// ──────────────────────────────────────────────

#[tokio::test]
async fn vanished_record_is_unknown_key() {
    let idem = with_store(VanishingStore);
    let err = idem.begin::<_, Value>("uc", &input()).await.unwrap_err();
    assert!(matches!(err, IdempotencyError::UnknownKey { .. }), "{err:?}");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn record_expired_between_insert_and_read_is_unknown_key() {
    let idem = with_store(ExpiringStore);
    let err = idem.begin::<_, Value>("uc", &input()).await.unwrap_err();
    assert!(matches!(err, IdempotencyError::UnknownKey { .. }), "{err:?}");
}

#[tokio::test]
async fn complete_without_begin_is_record_not_found() {
    let idem = with_store(InMemoryStore::new());
    let err = idem
        .complete("uc", &input(), &json!({"id": 1}))
        .await
        .unwrap_err();
    match err {
        IdempotencyError::RecordNotFound { use_case, .. } => assert_eq!(use_case, "uc"),
        other => panic!("expected RecordNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn abort_without_begin_succeeds() {
    let idem = with_store(InMemoryStore::new());
    idem.abort("uc", &input()).await.unwrap();
}

// ──────────────────────────────────────────────
// Key and payload errors
// ──────────────────────────────────────────────

#[tokio::test]
async fn failing_custom_deriver_touches_no_store() {
    let store = FaultyStore::new(FailOn::Insert);
    let calls = store.calls.clone();
    let config = IdempotencyConfig::new().with_key_deriver(KeyDeriver::custom(|_, _| {
        Err(KeyError::Custom("no request id".into()))
    }));
    let idem = Idempotency::with_clock(store, config, ManualClock::new(T0));

    let err = idem.begin::<_, Value>("uc", &input()).await.unwrap_err();
    assert!(matches!(err, IdempotencyError::Key(KeyError::Custom(_))), "{err:?}");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cached_result_of_wrong_shape_is_serialization_error() {
    let idem = with_store(InMemoryStore::new());
    idem.begin::<_, Value>("uc", &input()).await.unwrap();
    idem.complete("uc", &input(), &json!("not a number"))
        .await
        .unwrap();

    let err = idem.begin::<_, u64>("uc", &input()).await.unwrap_err();
    assert!(matches!(err, IdempotencyError::Serialization(_)), "{err:?}");
}

// ──────────────────────────────────────────────
// Configuration
// ──────────────────────────────────────────────

#[tokio::test]
async fn zero_in_progress_ttl_never_admits_a_duplicate() {
    let config = IdempotencyConfig::new().with_in_progress_ttl(Duration::ZERO);
    let idem = Idempotency::with_clock(InMemoryStore::new(), config, ManualClock::new(1_000));

    for _ in 0..2 {
        let err = idem.begin::<_, Value>("uc", &1).await.unwrap_err();
        assert!(
            matches!(
                err,
                IdempotencyError::Config(ConfigError::ZeroTtl {
                    field: "in_progress_ttl"
                })
            ),
            "{err:?}"
        );
    }
    assert!(idem.store().is_empty().await);
}

#[tokio::test]
async fn zero_completed_ttl_rejects_completion() {
    let config = IdempotencyConfig::new().with_completed_ttl(Duration::ZERO);
    let idem = Idempotency::with_clock(InMemoryStore::new(), config, ManualClock::new(T0));

    let err = idem
        .complete("uc", &input(), &json!({"id": 1}))
        .await
        .unwrap_err();
    assert!(matches!(err, IdempotencyError::Config(_)), "{err:?}");
}
