use std::future::Future;

use super::{live_record, make_record, TestResult, NOW};
use crate::{IdempotencyStatus, IdempotencyStore, StorageError};

pub(super) async fn run_read_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: IdempotencyStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "read",
            "get_returns_inserted_fields",
            get_returns_inserted_fields(factory).await,
        ),
        TestResult::from_result(
            "read",
            "get_nonexistent_returns_record_not_found",
            get_nonexistent_returns_record_not_found(factory).await,
        ),
        TestResult::from_result(
            "read",
            "get_returns_expired_rows",
            get_returns_expired_rows(factory).await,
        ),
    ]
}

// ── 1. Every field written by insert comes back from get ────────────────────

async fn get_returns_inserted_fields<S, F, Fut>(factory: &F) -> Result<(), String>
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

    let stored = s
        .get("orders", "k-1")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if stored.use_case != "orders" || stored.key != "k-1" {
        return Err(format!(
            "identity mismatch: got {}/{}",
            stored.use_case, stored.key
        ));
    }
    if stored.status != IdempotencyStatus::InProgress {
        return Err(format!("expected InProgress, got {:?}", stored.status));
    }
    if stored.result_data.is_some() {
        return Err(format!(
            "expected no result_data, got {:?}",
            stored.result_data
        ));
    }
    if stored.expiration != record.expiration {
        return Err(format!(
            "expected expiration {}, got {}",
            record.expiration, stored.expiration
        ));
    }
    if stored.created_at != record.created_at {
        return Err(format!(
            "expected created_at {}, got {}",
            record.created_at, stored.created_at
        ));
    }
    Ok(())
}

// ── 2. RecordNotFound carries the requested identity ────────────────────────

async fn get_nonexistent_returns_record_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: IdempotencyStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.get("payments", "missing").await {
        Err(StorageError::RecordNotFound { use_case, key }) => {
            if use_case != "payments" || key != "missing" {
                return Err(format!(
                    "expected payments/missing in error, got {use_case}/{key}"
                ));
            }
            Ok(())
        }
        other => Err(format!("expected RecordNotFound, got {:?}", other)),
    }
}

// ── 3. Reads do not hide expired rows; interpreting expiry is the caller's job

async fn get_returns_expired_rows<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: IdempotencyStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    // Written at NOW - 10s with a 5s lifetime, so already expired at NOW.
    let record = make_record("orders", "old", NOW - 5_000);
    s.insert_if_absent(&record, NOW - 10_000)
        .await
        .map_err(|e| format!("insert: {e}"))?;

    let stored = s
        .get("orders", "old")
        .await
        .map_err(|e| format!("get of expired row: {e}"))?;
    if !stored.is_expired(NOW) {
        return Err("expected stored row to be expired at NOW".into());
    }
    Ok(())
}
