use std::future::Future;

use super::{live_record, TestResult, NOW};
use crate::{IdempotencyStatus, IdempotencyStore};

pub(super) async fn run_insert_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: IdempotencyStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "insert",
            "insert_into_empty_store_succeeds",
            insert_into_empty_store_succeeds(factory).await,
        ),
        TestResult::from_result(
            "insert",
            "duplicate_live_insert_returns_false",
            duplicate_live_insert_returns_false(factory).await,
        ),
        TestResult::from_result(
            "insert",
            "refused_insert_leaves_record_untouched",
            refused_insert_leaves_record_untouched(factory).await,
        ),
        TestResult::from_result(
            "insert",
            "insert_over_live_completed_record_returns_false",
            insert_over_live_completed_record_returns_false(factory).await,
        ),
        TestResult::from_result(
            "insert",
            "use_cases_are_independent_namespaces",
            use_cases_are_independent_namespaces(factory).await,
        ),
    ]
}

// ── 1. First insert on an empty store wins ──────────────────────────────────

async fn insert_into_empty_store_succeeds<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: IdempotencyStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let inserted = s
        .insert_if_absent(&live_record("orders", "k-1"), NOW)
        .await
        .map_err(|e| format!("insert: {e}"))?;
    if !inserted {
        return Err("expected insert into empty store to return true".into());
    }
    Ok(())
}

// ── 2. Second insert while the first is live is a precondition failure ──────

async fn duplicate_live_insert_returns_false<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: IdempotencyStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.insert_if_absent(&live_record("orders", "k-1"), NOW)
        .await
        .map_err(|e| format!("first insert: {e}"))?;
    match s.insert_if_absent(&live_record("orders", "k-1"), NOW).await {
        Ok(false) => Ok(()),
        Ok(true) => Err("duplicate insert of a live record returned true".into()),
        Err(e) => Err(format!(
            "duplicate insert must return Ok(false), not an error: {e}"
        )),
    }
}

// ── 3. A refused insert must not overwrite the existing row ─────────────────

async fn refused_insert_leaves_record_untouched<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: IdempotencyStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let original = live_record("orders", "k-1");
    s.insert_if_absent(&original, NOW)
        .await
        .map_err(|e| format!("first insert: {e}"))?;

    let mut intruder = live_record("orders", "k-1");
    intruder.expiration = original.expiration + 1_000_000;
    intruder.created_at = "2030-01-01T00:00:00Z".to_string();
    s.insert_if_absent(&intruder, NOW)
        .await
        .map_err(|e| format!("second insert: {e}"))?;

    let stored = s
        .get("orders", "k-1")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if stored.expiration != original.expiration {
        return Err(format!(
            "expiration changed from {} to {}",
            original.expiration, stored.expiration
        ));
    }
    if stored.created_at != original.created_at {
        return Err(format!(
            "created_at changed from {} to {}",
            original.created_at, stored.created_at
        ));
    }
    Ok(())
}

// ── 4. A live Completed row blocks insertion just like an InProgress one ────

async fn insert_over_live_completed_record_returns_false<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
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
        Some(&serde_json::json!({"id": 1})),
        record.expiration,
    )
    .await
    .map_err(|e| format!("update: {e}"))?;

    let inserted = s
        .insert_if_absent(&live_record("orders", "k-1"), NOW)
        .await
        .map_err(|e| format!("second insert: {e}"))?;
    if inserted {
        return Err("insert over a live completed record returned true".into());
    }
    Ok(())
}

// ── 5. The same key under two use cases identifies two records ──────────────

async fn use_cases_are_independent_namespaces<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: IdempotencyStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let first = s
        .insert_if_absent(&live_record("orders", "shared"), NOW)
        .await
        .map_err(|e| format!("insert orders: {e}"))?;
    let second = s
        .insert_if_absent(&live_record("refunds", "shared"), NOW)
        .await
        .map_err(|e| format!("insert refunds: {e}"))?;
    if !(first && second) {
        return Err(format!(
            "expected both inserts to succeed, got orders={first} refunds={second}"
        ));
    }
    Ok(())
}
