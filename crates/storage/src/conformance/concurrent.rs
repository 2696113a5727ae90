use std::future::Future;
use std::sync::Arc;

use super::{live_record, make_record, TestResult, NOW, TTL_MS};
use crate::{IdempotencyStore, StorageError};

/// Number of concurrent tasks to spawn in each test.
const N: usize = 10;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: IdempotencyStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "concurrent",
        "concurrent_inserts_exactly_one_wins",
        concurrent_inserts_exactly_one_wins(factory).await,
    ));
    results.push(TestResult::from_result(
        "concurrent",
        "concurrent_inserts_over_expired_row_exactly_one_wins",
        concurrent_inserts_over_expired_row_exactly_one_wins(factory).await,
    ));
    results.push(TestResult::from_result(
        "concurrent",
        "concurrent_inserts_different_keys_all_succeed",
        concurrent_inserts_different_keys_all_succeed(factory).await,
    ));

    results
}

/// Spawn `N` tasks that each try to insert the same live record, returning
/// how many of them won.
async fn race_inserts<S: IdempotencyStore>(storage: &Arc<S>) -> Result<usize, String> {
    let mut handles = Vec::new();
    for _ in 0..N {
        let s = storage.clone();
        handles.push(tokio::spawn(async move {
            s.insert_if_absent(&live_record("orders", "contested"), NOW)
                .await
        }));
    }

    let mut winners = 0usize;
    for handle in handles {
        let won = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e: StorageError| format!("storage error: {e}"))?;
        if won {
            winners += 1;
        }
    }
    Ok(winners)
}

// ── Concurrent insert: exactly one wins ─────────────────────────────────────

/// N tasks race `insert_if_absent` on one identity against an empty store.
/// Exactly one must observe `true`; every other task gets `false`.
///
/// This exercises real concurrency: `tokio::spawn` creates parallel tasks
/// that race against the backend's conditional write.
async fn concurrent_inserts_exactly_one_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: IdempotencyStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    let winners = race_inserts(&storage).await?;
    if winners != 1 {
        return Err(format!("expected exactly 1 winner, got {winners}"));
    }
    Ok(())
}

// ── Concurrent insert over an expired row: still exactly one wins ───────────

async fn concurrent_inserts_over_expired_row_exactly_one_wins<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: IdempotencyStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    storage
        .insert_if_absent(&make_record("orders", "contested", NOW - 1), NOW - TTL_MS)
        .await
        .map_err(|e| format!("stale insert: {e}"))?;

    let winners = race_inserts(&storage).await?;
    if winners != 1 {
        return Err(format!(
            "expected exactly 1 winner over expired row, got {winners}"
        ));
    }
    Ok(())
}

// ── Concurrent inserts on distinct keys never interfere ─────────────────────

async fn concurrent_inserts_different_keys_all_succeed<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: IdempotencyStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);

    let mut handles = Vec::new();
    for i in 0..N {
        let s = storage.clone();
        handles.push(tokio::spawn(async move {
            s.insert_if_absent(&live_record("orders", &format!("key-{i}")), NOW)
                .await
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let won = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e| format!("storage error on key-{i}: {e}"))?;
        if !won {
            return Err(format!("insert for key-{i} returned false"));
        }
    }
    Ok(())
}
