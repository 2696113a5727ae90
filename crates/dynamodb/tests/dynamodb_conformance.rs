//! Conformance suite against a real DynamoDB endpoint.
//!
//! Ignored by default. Run against DynamoDB Local with:
//!
//! ```text
//! docker run -p 8000:8000 amazon/dynamodb-local
//! IDEM_DYNAMODB_ENDPOINT=http://localhost:8000 AWS_REGION=us-east-1 \
//!   AWS_ACCESS_KEY_ID=local AWS_SECRET_ACCESS_KEY=local \
//!   cargo test -p idem-dynamodb -- --ignored
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use idem_dynamodb::{table, DynamoDbConfig, DynamoDbStore};
use idem_storage::conformance::run_conformance_suite;

static TABLE_SEQ: AtomicUsize = AtomicUsize::new(0);

fn local_config() -> DynamoDbConfig {
    DynamoDbConfig {
        table: "unused".to_string(),
        region: Some(std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string())),
        endpoint: Some(
            std::env::var("IDEM_DYNAMODB_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
        ),
    }
}

/// A store over a freshly created, empty table.
async fn fresh_store() -> DynamoDbStore {
    let client = local_config().client().await;
    let name = format!(
        "idem-conformance-{}-{}",
        std::process::id(),
        TABLE_SEQ.fetch_add(1, Ordering::SeqCst)
    );
    table::recreate_table(&client, &name)
        .await
        .unwrap_or_else(|e| panic!("failed to create table {name}: {e}"));
    DynamoDbStore::new(client, name)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires a DynamoDB endpoint (IDEM_DYNAMODB_ENDPOINT)"]
async fn dynamodb_store_passes_conformance_suite() {
    let report = run_conformance_suite(fresh_store).await;
    assert_eq!(report.failed, 0, "{report}");
}

#[tokio::test]
#[ignore = "requires a DynamoDB endpoint (IDEM_DYNAMODB_ENDPOINT)"]
async fn delete_table_reports_missing_table() {
    let client = local_config().client().await;
    let existed = table::delete_table(&client, "idem-never-created")
        .await
        .unwrap();
    assert!(!existed);
}
