use async_trait::async_trait;
use clap::ValueEnum;
use idem_core::{
    IdempotencyRecord, IdempotencyStatus, IdempotencyStore, InMemoryStore, StorageError,
};
use idem_dynamodb::DynamoDbStore;
use serde_json::Value;

use crate::settings::Settings;

/// Store selected with `--backend`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum Backend {
    /// Process-local store; nothing survives the command
    Memory,
    /// The table named in the `[dynamodb]` settings
    Dynamodb,
}

/// One of the concrete stores, chosen at startup.
#[derive(Debug, Clone)]
pub(crate) enum AnyStore {
    Memory(InMemoryStore),
    DynamoDb(DynamoDbStore),
}

impl AnyStore {
    pub async fn open(backend: Backend, settings: &Settings) -> Self {
        match backend {
            Backend::Memory => AnyStore::Memory(InMemoryStore::new()),
            Backend::Dynamodb => {
                AnyStore::DynamoDb(DynamoDbStore::connect(&settings.dynamodb).await)
            }
        }
    }
}

#[async_trait]
impl IdempotencyStore for AnyStore {
    async fn insert_if_absent(
        &self,
        record: &IdempotencyRecord,
        now_ms: i64,
    ) -> Result<bool, StorageError> {
        match self {
            AnyStore::Memory(s) => s.insert_if_absent(record, now_ms).await,
            AnyStore::DynamoDb(s) => s.insert_if_absent(record, now_ms).await,
        }
    }

    async fn get(&self, use_case: &str, key: &str) -> Result<IdempotencyRecord, StorageError> {
        match self {
            AnyStore::Memory(s) => s.get(use_case, key).await,
            AnyStore::DynamoDb(s) => s.get(use_case, key).await,
        }
    }

    async fn update(
        &self,
        use_case: &str,
        key: &str,
        status: IdempotencyStatus,
        result_data: Option<&Value>,
        expiration: i64,
    ) -> Result<(), StorageError> {
        match self {
            AnyStore::Memory(s) => s.update(use_case, key, status, result_data, expiration).await,
            AnyStore::DynamoDb(s) => s.update(use_case, key, status, result_data, expiration).await,
        }
    }

    async fn delete(&self, use_case: &str, key: &str) -> Result<(), StorageError> {
        match self {
            AnyStore::Memory(s) => s.delete(use_case, key).await,
            AnyStore::DynamoDb(s) => s.delete(use_case, key).await,
        }
    }
}
