use std::future::Future;

use super::{live_record, TestResult, NOW};
use crate::{IdempotencyStatus, IdempotencyStore, StorageError};

pub(super) async fn run_delete_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: IdempotencyStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "delete",
            "delete_removes_record",
            delete_removes_record(factory).await,
        ),
        TestResult::from_result(
            "delete",
            "delete_nonexistent_succeeds",
            delete_nonexistent_succeeds(factory).await,
        ),
        TestResult::from_result(
            "delete",
            "delete_twice_succeeds",
            delete_twice_succeeds(factory).await,
        ),
        TestResult::from_result(
            "delete",
            "delete_frees_identity_for_insert",
            delete_frees_identity_for_insert(factory).await,
        ),
        TestResult::from_result(
            "delete",
            "delete_removes_completed_record",
            delete_removes_completed_record(factory).await,
        ),
    ]
}

async fn delete_removes_record<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: IdempotencyStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.insert_if_absent(&live_record("orders", "k-1"), NOW)
        .await
        .map_err(|e| format!("insert: {e}"))?;
    s.delete("orders", "k-1")
        .await
        .map_err(|e| format!("delete: {e}"))?;
    match s.get("orders", "k-1").await {
        Err(StorageError::RecordNotFound { .. }) => Ok(()),
        other => Err(format!(
            "expected RecordNotFound after delete, got {:?}",
            other
        )),
    }
}

async fn delete_nonexistent_succeeds<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: IdempotencyStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.delete("orders", "never-written")
        .await
        .map_err(|e| format!("delete of missing row must succeed: {e}"))
}

async fn delete_twice_succeeds<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: IdempotencyStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.insert_if_absent(&live_record("orders", "k-1"), NOW)
        .await
        .map_err(|e| format!("insert: {e}"))?;
    s.delete("orders", "k-1")
        .await
        .map_err(|e| format!("first delete: {e}"))?;
    s.delete("orders", "k-1")
        .await
        .map_err(|e| format!("second delete: {e}"))
}

async fn delete_frees_identity_for_insert<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: IdempotencyStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.insert_if_absent(&live_record("orders", "k-1"), NOW)
        .await
        .map_err(|e| format!("insert: {e}"))?;
    s.delete("orders", "k-1")
        .await
        .map_err(|e| format!("delete: {e}"))?;
    let inserted = s
        .insert_if_absent(&live_record("orders", "k-1"), NOW)
        .await
        .map_err(|e| format!("re-insert: {e}"))?;
    if !inserted {
        return Err("insert after delete returned false".into());
    }
    Ok(())
}

async fn delete_removes_completed_record<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: IdempotencyStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let record = live_record("orders", "k-1");
    s.insert_if_absent(&record, NOW)
        .await
        .map_err(|e| format!("insert: {e}"))?;
    s.update(
        "orders",
        "k-1",
        IdempotencyStatus::Completed,
        Some(&serde_json::json!({"id": 7})),
        record.expiration,
    )
    .await
    .map_err(|e| format!("update: {e}"))?;
    s.delete("orders", "k-1")
        .await
        .map_err(|e| format!("delete: {e}"))?;
    let inserted = s
        .insert_if_absent(&live_record("orders", "k-1"), NOW)
        .await
        .map_err(|e| format!("re-insert: {e}"))?;
    if !inserted {
        return Err("insert after deleting a completed record returned false".into());
    }
    Ok(())
}
