use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use idem_storage::{IdempotencyRecord, IdempotencyStatus, StorageError};

pub(crate) const PK: &str = "PK";
pub(crate) const SK: &str = "SK";
pub(crate) const STATUS: &str = "status";
pub(crate) const EXPIRATION: &str = "expiration";
pub(crate) const CREATED_AT: &str = "createdAt";
pub(crate) const RESULT_DATA: &str = "resultData";
/// Epoch seconds, read by DynamoDB's native TTL sweep.
pub(crate) const TTL: &str = "ttl";

pub(crate) type Item = HashMap<String, AttributeValue>;

pub(crate) fn primary_key(use_case: &str, key: &str) -> Item {
    HashMap::from([
        (PK.to_string(), AttributeValue::S(use_case.to_string())),
        (SK.to_string(), AttributeValue::S(key.to_string())),
    ])
}

pub(crate) fn number(n: i64) -> AttributeValue {
    AttributeValue::N(n.to_string())
}

/// Expiry in whole epoch seconds, rounded up so the native sweep never
/// removes a row before its millisecond expiration.
pub(crate) fn ttl_seconds(expiration_ms: i64) -> i64 {
    expiration_ms.div_euclid(1000) + i64::from(expiration_ms.rem_euclid(1000) != 0)
}

/// Decode a stored item.
pub(crate) fn record_from_item(
    use_case: &str,
    key: &str,
    item: &Item,
) -> Result<IdempotencyRecord, StorageError> {
    let malformed = |message: String| StorageError::MalformedRecord {
        use_case: use_case.to_string(),
        key: key.to_string(),
        message,
    };
    let status = item
        .get(STATUS)
        .ok_or_else(|| malformed(format!("missing attribute {STATUS}")))?
        .as_s()
        .map_err(|_| malformed(format!("attribute {STATUS} is not a string")))?
        .parse::<IdempotencyStatus>()
        .map_err(|e| malformed(e.to_string()))?;

    let expiration = item
        .get(EXPIRATION)
        .ok_or_else(|| malformed(format!("missing attribute {EXPIRATION}")))?
        .as_n()
        .map_err(|_| malformed(format!("attribute {EXPIRATION} is not a number")))?
        .parse::<i64>()
        .map_err(|e| malformed(format!("attribute {EXPIRATION}: {e}")))?;

    // Informational only; rows written by other tools may lack it.
    let created_at = item
        .get(CREATED_AT)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .unwrap_or_default();

    let result_data = match item.get(RESULT_DATA) {
        None | Some(AttributeValue::Null(_)) => None,
        Some(AttributeValue::S(json)) => Some(
            serde_json::from_str(json)
                .map_err(|e| malformed(format!("attribute {RESULT_DATA}: {e}")))?,
        ),
        Some(_) => return Err(malformed(format!("attribute {RESULT_DATA} is not a string"))),
    };

    Ok(IdempotencyRecord {
        use_case: use_case.to_string(),
        key: key.to_string(),
        status,
        result_data,
        expiration,
        created_at,
    })
}
