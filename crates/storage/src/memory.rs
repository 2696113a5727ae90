use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::record::{IdempotencyRecord, IdempotencyStatus};
use crate::traits::IdempotencyStore;

type Identity = (String, String);

/// Process-local reference backend.
///
/// The check-and-set in `insert_if_absent` runs under one write lock, so it
/// is atomic with respect to every caller in this process. It cannot
/// coordinate across processes: never point several independent processes
/// at the same logical use case through this store.
///
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    records: Arc<RwLock<HashMap<Identity, IdempotencyRecord>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every row expired at `now_ms`, returning how many were removed.
    ///
    /// Plays the part of a durable backend's native TTL sweep. Correctness
    /// never depends on it having run.
    pub async fn purge_expired(&self, now_ms: i64) -> usize {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| !record.is_expired(now_ms));
        before - records.len()
    }

    /// Number of stored rows, expired ones included.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

fn identity(use_case: &str, key: &str) -> Identity {
    (use_case.to_string(), key.to_string())
}

#[async_trait]
impl IdempotencyStore for InMemoryStore {
    async fn insert_if_absent(
        &self,
        record: &IdempotencyRecord,
        now_ms: i64,
    ) -> Result<bool, StorageError> {
        let mut records = self.records.write().await;
        let id = identity(&record.use_case, &record.key);
        if let Some(existing) = records.get(&id) {
            if !existing.is_expired(now_ms) {
                return Ok(false);
            }
        }
        records.insert(id, record.clone());
        Ok(true)
    }

    async fn get(&self, use_case: &str, key: &str) -> Result<IdempotencyRecord, StorageError> {
        let records = self.records.read().await;
        records
            .get(&identity(use_case, key))
            .cloned()
            .ok_or_else(|| StorageError::not_found(use_case, key))
    }

    async fn update(
        &self,
        use_case: &str,
        key: &str,
        status: IdempotencyStatus,
        result_data: Option<&serde_json::Value>,
        expiration: i64,
    ) -> Result<(), StorageError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&identity(use_case, key))
            .ok_or_else(|| StorageError::not_found(use_case, key))?;
        record.status = status;
        record.result_data = result_data.cloned();
        record.expiration = expiration;
        Ok(())
    }

    async fn delete(&self, use_case: &str, key: &str) -> Result<(), StorageError> {
        self.records.write().await.remove(&identity(use_case, key));
        Ok(())
    }
}
