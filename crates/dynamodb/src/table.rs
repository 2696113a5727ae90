//! Table provisioning for the DynamoDB backend.
//!
//! The store never creates tables on its own; these helpers are for setup
//! scripts, local development and tests.

use std::time::Duration;

use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType,
    TableStatus, TimeToLiveSpecification,
};
use aws_sdk_dynamodb::Client;
use idem_storage::StorageError;
use tracing::info;

use crate::item::{PK, SK, TTL};
use crate::store::backend;

const ACTIVE_POLL_INTERVAL: Duration = Duration::from_millis(250);
const ACTIVE_POLL_ATTEMPTS: u32 = 120;

/// Create the idempotency table (`PK` hash, `SK` range, on-demand billing),
/// wait for it to become active and enable native TTL on `ttl`.
pub async fn create_table(client: &Client, table: &str) -> Result<(), StorageError> {
    client
        .create_table()
        .table_name(table)
        .attribute_definitions(
            AttributeDefinition::builder()
                .attribute_name(PK)
                .attribute_type(ScalarAttributeType::S)
                .build()
                .map_err(backend)?,
        )
        .attribute_definitions(
            AttributeDefinition::builder()
                .attribute_name(SK)
                .attribute_type(ScalarAttributeType::S)
                .build()
                .map_err(backend)?,
        )
        .key_schema(
            KeySchemaElement::builder()
                .attribute_name(PK)
                .key_type(KeyType::Hash)
                .build()
                .map_err(backend)?,
        )
        .key_schema(
            KeySchemaElement::builder()
                .attribute_name(SK)
                .key_type(KeyType::Range)
                .build()
                .map_err(backend)?,
        )
        .billing_mode(BillingMode::PayPerRequest)
        .send()
        .await
        .map_err(backend)?;

    wait_until_active(client, table).await?;

    client
        .update_time_to_live()
        .table_name(table)
        .time_to_live_specification(
            TimeToLiveSpecification::builder()
                .attribute_name(TTL)
                .enabled(true)
                .build()
                .map_err(backend)?,
        )
        .send()
        .await
        .map_err(backend)?;

    info!(table, "idempotency table created");
    Ok(())
}

/// Delete the table. Returns `Ok(false)` if it did not exist.
pub async fn delete_table(client: &Client, table: &str) -> Result<bool, StorageError> {
    match client.delete_table().table_name(table).send().await {
        Ok(_) => {
            info!(table, "idempotency table deleted");
            Ok(true)
        }
        Err(err)
            if err
                .as_service_error()
                .is_some_and(|e| e.is_resource_not_found_exception()) =>
        {
            Ok(false)
        }
        Err(err) => Err(backend(err)),
    }
}

/// Drop the table if present, then create it afresh.
pub async fn recreate_table(client: &Client, table: &str) -> Result<(), StorageError> {
    if delete_table(client, table).await? {
        wait_until_deleted(client, table).await?;
    }
    create_table(client, table).await
}

async fn wait_until_active(client: &Client, table: &str) -> Result<(), StorageError> {
    for _ in 0..ACTIVE_POLL_ATTEMPTS {
        let output = client
            .describe_table()
            .table_name(table)
            .send()
            .await
            .map_err(backend)?;
        if output.table().and_then(|t| t.table_status()) == Some(&TableStatus::Active) {
            return Ok(());
        }
        tokio::time::sleep(ACTIVE_POLL_INTERVAL).await;
    }
    Err(StorageError::Backend(format!(
        "table {table} did not become active"
    )))
}

async fn wait_until_deleted(client: &Client, table: &str) -> Result<(), StorageError> {
    for _ in 0..ACTIVE_POLL_ATTEMPTS {
        match client.describe_table().table_name(table).send().await {
            Ok(_) => tokio::time::sleep(ACTIVE_POLL_INTERVAL).await,
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception()) =>
            {
                return Ok(());
            }
            Err(err) => return Err(backend(err)),
        }
    }
    Err(StorageError::Backend(format!(
        "table {table} was not deleted in time"
    )))
}
