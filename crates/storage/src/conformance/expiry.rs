use std::future::Future;

use super::{live_record, make_record, TestResult, NOW, TTL_MS};
use crate::{IdempotencyStatus, IdempotencyStore};

pub(super) async fn run_expiry_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: IdempotencyStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "expiry",
            "expired_in_progress_row_is_insertable",
            expired_in_progress_row_is_insertable(factory).await,
        ),
        TestResult::from_result(
            "expiry",
            "expired_completed_row_is_insertable",
            expired_completed_row_is_insertable(factory).await,
        ),
        TestResult::from_result(
            "expiry",
            "row_expiring_exactly_now_is_insertable",
            row_expiring_exactly_now_is_insertable(factory).await,
        ),
        TestResult::from_result(
            "expiry",
            "row_expiring_after_now_blocks_insert",
            row_expiring_after_now_blocks_insert(factory).await,
        ),
    ]
}

// ── 1. An abandoned InProgress row stops blocking once its TTL passes ───────

async fn expired_in_progress_row_is_insertable<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: IdempotencyStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let stale = make_record("orders", "k-1", NOW - 1);
    s.insert_if_absent(&stale, NOW - TTL_MS)
        .await
        .map_err(|e| format!("stale insert: {e}"))?;

    let fresh = live_record("orders", "k-1");
    let inserted = s
        .insert_if_absent(&fresh, NOW)
        .await
        .map_err(|e| format!("fresh insert: {e}"))?;
    if !inserted {
        return Err("insert over an expired InProgress row returned false".into());
    }
    let stored = s
        .get("orders", "k-1")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if stored.expiration != fresh.expiration {
        return Err(format!(
            "expected overwritten expiration {}, got {}",
            fresh.expiration, stored.expiration
        ));
    }
    Ok(())
}

// ── 2. Overwriting an expired Completed row drops its old result ────────────

async fn expired_completed_row_is_insertable<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: IdempotencyStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.insert_if_absent(&make_record("orders", "k-1", NOW - 1), NOW - TTL_MS)
        .await
        .map_err(|e| format!("stale insert: {e}"))?;
    s.update(
        "orders",
        "k-1",
        IdempotencyStatus::Completed,
        Some(&serde_json::json!({"stale": true})),
        NOW - 1,
    )
    .await
    .map_err(|e| format!("update: {e}"))?;

    let inserted = s
        .insert_if_absent(&live_record("orders", "k-1"), NOW)
        .await
        .map_err(|e| format!("fresh insert: {e}"))?;
    if !inserted {
        return Err("insert over an expired Completed row returned false".into());
    }
    let stored = s
        .get("orders", "k-1")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if stored.status != IdempotencyStatus::InProgress {
        return Err(format!("expected InProgress, got {:?}", stored.status));
    }
    if stored.result_data.is_some() {
        return Err(format!(
            "expected stale result to be cleared, got {:?}",
            stored.result_data
        ));
    }
    Ok(())
}

// ── 3. Expiry is inclusive: expiration == now counts as expired ─────────────

async fn row_expiring_exactly_now_is_insertable<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: IdempotencyStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.insert_if_absent(&make_record("orders", "k-1", NOW), NOW - TTL_MS)
        .await
        .map_err(|e| format!("first insert: {e}"))?;
    let inserted = s
        .insert_if_absent(&live_record("orders", "k-1"), NOW)
        .await
        .map_err(|e| format!("second insert: {e}"))?;
    if !inserted {
        return Err("row with expiration == now must be treated as absent".into());
    }
    Ok(())
}

// ── 4. One millisecond before expiry the row is still live ──────────────────

async fn row_expiring_after_now_blocks_insert<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: IdempotencyStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.insert_if_absent(&make_record("orders", "k-1", NOW + 1), NOW - TTL_MS)
        .await
        .map_err(|e| format!("first insert: {e}"))?;
    let inserted = s
        .insert_if_absent(&live_record("orders", "k-1"), NOW)
        .await
        .map_err(|e| format!("second insert: {e}"))?;
    if inserted {
        return Err("row with expiration > now must block insert".into());
    }
    Ok(())
}
