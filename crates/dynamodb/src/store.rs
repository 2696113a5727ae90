use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use idem_storage::{IdempotencyRecord, IdempotencyStatus, IdempotencyStore, StorageError};
use tracing::debug;

use crate::config::DynamoDbConfig;
use crate::item::{
    number, primary_key, record_from_item, ttl_seconds, CREATED_AT, EXPIRATION, RESULT_DATA,
    STATUS, TTL,
};

/// Insertable when the row is absent or already expired.
const INSERT_CONDITION: &str = "attribute_not_exists(PK) OR #expiration <= :now";
const UPDATE_CONDITION: &str = "attribute_exists(PK)";

/// Idempotency records in a DynamoDB table.
///
/// Safe to share between any number of processes: the conditional writes
/// are evaluated atomically by DynamoDB per item.
#[derive(Debug, Clone)]
pub struct DynamoDbStore {
    client: Client,
    table: String,
}

impl DynamoDbStore {
    pub fn new(client: Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    /// Build a client from `config` and wrap its table.
    pub async fn connect(config: &DynamoDbConfig) -> Self {
        Self::new(config.client().await, config.table.clone())
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

/// Any SDK failure other than a conditional-check failure, with its full
/// error chain.
pub(crate) fn backend<E>(err: E) -> StorageError
where
    E: std::error::Error,
{
    StorageError::Backend(DisplayErrorContext(err).to_string())
}

#[async_trait]
impl IdempotencyStore for DynamoDbStore {
    async fn insert_if_absent(
        &self,
        record: &IdempotencyRecord,
        now_ms: i64,
    ) -> Result<bool, StorageError> {
        let result = self
            .client
            .update_item()
            .table_name(&self.table)
            .set_key(Some(primary_key(&record.use_case, &record.key)))
            .update_expression(
                "SET #status = :status, #expiration = :expiration, #createdAt = :createdAt, #ttl = :ttl REMOVE #resultData",
            )
            .condition_expression(INSERT_CONDITION)
            .expression_attribute_names("#status", STATUS)
            .expression_attribute_names("#expiration", EXPIRATION)
            .expression_attribute_names("#createdAt", CREATED_AT)
            .expression_attribute_names("#ttl", TTL)
            .expression_attribute_names("#resultData", RESULT_DATA)
            .expression_attribute_values(
                ":status",
                AttributeValue::S(record.status.as_str().to_string()),
            )
            .expression_attribute_values(":expiration", number(record.expiration))
            .expression_attribute_values(
                ":createdAt",
                AttributeValue::S(record.created_at.clone()),
            )
            .expression_attribute_values(":ttl", number(ttl_seconds(record.expiration)))
            .expression_attribute_values(":now", number(now_ms))
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                debug!(use_case = %record.use_case, key = %record.key, "insert condition failed");
                Ok(false)
            }
            Err(err) => Err(backend(err)),
        }
    }

    async fn get(&self, use_case: &str, key: &str) -> Result<IdempotencyRecord, StorageError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table)
            .set_key(Some(primary_key(use_case, key)))
            .consistent_read(true)
            .send()
            .await
            .map_err(backend)?;

        match output.item() {
            Some(item) => record_from_item(use_case, key, item),
            None => Err(StorageError::not_found(use_case, key)),
        }
    }

    async fn update(
        &self,
        use_case: &str,
        key: &str,
        status: IdempotencyStatus,
        result_data: Option<&serde_json::Value>,
        expiration: i64,
    ) -> Result<(), StorageError> {
        let mut request = self
            .client
            .update_item()
            .table_name(&self.table)
            .set_key(Some(primary_key(use_case, key)))
            .condition_expression(UPDATE_CONDITION)
            .expression_attribute_names("#status", STATUS)
            .expression_attribute_names("#expiration", EXPIRATION)
            .expression_attribute_names("#ttl", TTL)
            .expression_attribute_names("#resultData", RESULT_DATA)
            .expression_attribute_values(
                ":status",
                AttributeValue::S(status.as_str().to_string()),
            )
            .expression_attribute_values(":expiration", number(expiration))
            .expression_attribute_values(":ttl", number(ttl_seconds(expiration)));

        request = match result_data {
            Some(data) => {
                let json = serde_json::to_string(data).map_err(|e| {
                    StorageError::Backend(format!("result payload encoding failed: {e}"))
                })?;
                request
                    .update_expression(
                        "SET #status = :status, #resultData = :resultData, #expiration = :expiration, #ttl = :ttl",
                    )
                    .expression_attribute_values(":resultData", AttributeValue::S(json))
            }
            None => request.update_expression(
                "SET #status = :status, #expiration = :expiration, #ttl = :ttl REMOVE #resultData",
            ),
        };

        match request.send().await {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                Err(StorageError::not_found(use_case, key))
            }
            Err(err) => Err(backend(err)),
        }
    }

    async fn delete(&self, use_case: &str, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_item()
            .table_name(&self.table)
            .set_key(Some(primary_key(use_case, key)))
            .send()
            .await
            .map(|_| ())
            .map_err(backend)
    }
}
