use std::future::Future;

use super::{live_record, TestResult, NOW, TTL_MS};
use crate::{IdempotencyStatus, IdempotencyStore, StorageError};

pub(super) async fn run_update_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: IdempotencyStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "update",
            "update_attaches_result_and_status",
            update_attaches_result_and_status(factory).await,
        ),
        TestResult::from_result(
            "update",
            "update_refreshes_expiration",
            update_refreshes_expiration(factory).await,
        ),
        TestResult::from_result(
            "update",
            "update_nonexistent_returns_record_not_found",
            update_nonexistent_returns_record_not_found(factory).await,
        ),
        TestResult::from_result(
            "update",
            "update_does_not_create_rows",
            update_does_not_create_rows(factory).await,
        ),
    ]
}

// ── 1. Completion stores the result payload verbatim ────────────────────────

async fn update_attaches_result_and_status<S, F, Fut>(factory: &F) -> Result<(), String>
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

    let result = serde_json::json!({"id": 1, "name": "John Doe Dorian", "age": 43});
    s.update(
        "orders",
        "k-1",
        IdempotencyStatus::Completed,
        Some(&result),
        record.expiration,
    )
    .await
    .map_err(|e| format!("update: {e}"))?;

    let stored = s
        .get("orders", "k-1")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if stored.status != IdempotencyStatus::Completed {
        return Err(format!("expected Completed, got {:?}", stored.status));
    }
    if stored.result_data.as_ref() != Some(&result) {
        return Err(format!(
            "expected result_data {result}, got {:?}",
            stored.result_data
        ));
    }
    if stored.created_at != record.created_at {
        return Err("update must not touch created_at".into());
    }
    Ok(())
}

// ── 2. Completed records carry their own retention window ───────────────────

async fn update_refreshes_expiration<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: IdempotencyStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.insert_if_absent(&live_record("orders", "k-1"), NOW)
        .await
        .map_err(|e| format!("insert: {e}"))?;

    let retained_until = NOW + 100 * TTL_MS;
    s.update(
        "orders",
        "k-1",
        IdempotencyStatus::Completed,
        Some(&serde_json::json!("done")),
        retained_until,
    )
    .await
    .map_err(|e| format!("update: {e}"))?;

    let stored = s
        .get("orders", "k-1")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if stored.expiration != retained_until {
        return Err(format!(
            "expected expiration {retained_until}, got {}",
            stored.expiration
        ));
    }
    Ok(())
}

// ── 3. Updating a missing row is RecordNotFound ─────────────────────────────

async fn update_nonexistent_returns_record_not_found<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: IdempotencyStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let result = s
        .update(
            "orders",
            "ghost",
            IdempotencyStatus::Completed,
            Some(&serde_json::json!(null)),
            NOW + TTL_MS,
        )
        .await;
    match result {
        Err(StorageError::RecordNotFound { use_case, key }) => {
            if use_case != "orders" || key != "ghost" {
                return Err(format!(
                    "expected orders/ghost in error, got {use_case}/{key}"
                ));
            }
            Ok(())
        }
        other => Err(format!("expected RecordNotFound, got {:?}", other)),
    }
}

// ── 4. A failed update leaves nothing behind ────────────────────────────────

async fn update_does_not_create_rows<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: IdempotencyStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let _ = s
        .update(
            "orders",
            "ghost",
            IdempotencyStatus::Completed,
            None,
            NOW + TTL_MS,
        )
        .await;
    match s.get("orders", "ghost").await {
        Err(StorageError::RecordNotFound { .. }) => Ok(()),
        other => Err(format!(
            "expected RecordNotFound after failed update, got {:?}",
            other
        )),
    }
}
