//! Conformance test suite for `IdempotencyStore` implementations.
//!
//! This module provides a backend-agnostic test suite that any
//! `IdempotencyStore` implementation can run to verify correctness. The
//! suite covers:
//!
//! - **Insert**: first insert wins, live duplicates are refused
//! - **Read**: stored fields come back unchanged, missing rows are reported
//! - **Update**: completion attaches a result, missing rows are reported
//! - **Delete**: removal frees the identity, deleting twice is fine
//! - **Expiry**: expired rows are insertable without any sweep having run
//! - **Concurrency**: racing inserts on one identity produce a single winner
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory function that
//! creates a fresh, empty storage instance for each test:
//!
//! ```ignore
//! use idem_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn dynamodb_conformance() {
//!     let report = run_conformance_suite(|| async {
//!         create_test_dynamodb_store().await
//!     }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod concurrent;
mod delete;
mod expiry;
mod insert;
mod read;
mod update;

use std::fmt;
use std::future::Future;

use crate::record::IdempotencyRecord;
use crate::IdempotencyStore;

/// Reference "now" used by every conformance test, epoch milliseconds.
const NOW: i64 = 1_767_225_600_000;

/// Default lifetime given to records created by the suite.
const TTL_MS: i64 = 60_000;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "insert", "expiry", "concurrent").
    pub category: String,
    /// Test name (e.g. "insert_into_empty_store_succeeds").
    pub name: String,
    /// Whether the test passed.
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn pass(category: &str, name: &str) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: true,
            message: None,
        }
    }

    fn fail(category: &str, name: &str, msg: String) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: false,
            message: Some(msg),
        }
    }

    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self::pass(category, name),
            Err(msg) => Self::fail(category, name, msg),
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a storage backend.
///
/// The `factory` function is called once per test to create a fresh, empty
/// storage instance, ensuring test isolation.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: IdempotencyStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(insert::run_insert_tests(&factory).await);
    results.extend(read::run_read_tests(&factory).await);
    results.extend(update::run_update_tests(&factory).await);
    results.extend(delete::run_delete_tests(&factory).await);
    results.extend(expiry::run_expiry_tests(&factory).await);
    results.extend(concurrent::run_concurrent_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn make_record(use_case: &str, key: &str, expiration: i64) -> IdempotencyRecord {
    IdempotencyRecord::in_progress(use_case, key, expiration, "2026-01-01T00:00:00Z")
}

fn live_record(use_case: &str, key: &str) -> IdempotencyRecord {
    make_record(use_case, key, NOW + TTL_MS)
}
