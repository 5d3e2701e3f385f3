//! In-memory report store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::errors::DomainResult;
use crate::domain::ports::ReportStore;

/// Report store backed by a map. Used in tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryReportStore {
    records: RwLock<HashMap<String, serde_json::Value>>,
}

impl InMemoryReportStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record stored under `key`, if any.
    pub async fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.records.read().await.get(key).cloned()
    }

    /// Stored keys in sorted order.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.records.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether nothing was stored.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    async fn put(&self, key: &str, record: &serde_json::Value) -> DomainResult<()> {
        self.records
            .write()
            .await
            .insert(key.to_string(), record.clone());
        Ok(())
    }
}
