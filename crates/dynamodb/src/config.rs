use aws_config::{BehaviorVersion, Region};
use serde::{Deserialize, Serialize};

/// Connection settings for the DynamoDB backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamoDbConfig {
    /// Table holding idempotency records.
    pub table: String,
    /// AWS region. Falls back to the default provider chain when unset.
    pub region: Option<String>,
    /// Endpoint override, e.g. `http://localhost:8000` for DynamoDB Local.
    pub endpoint: Option<String>,
}

impl Default for DynamoDbConfig {
    fn default() -> Self {
        Self {
            table: "idempotency".to_string(),
            region: None,
            endpoint: None,
        }
    }
}

impl DynamoDbConfig {
    /// Build a client from these settings and the ambient AWS credentials.
    pub async fn client(&self) -> aws_sdk_dynamodb::Client {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &self.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &self.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;
        aws_sdk_dynamodb::Client::new(&sdk_config)
    }
}
