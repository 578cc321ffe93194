//! In-process history store, for tests and throwaway runs.

use std::collections::HashMap;

use async_trait::async_trait;
use portdq_core::{InspectionId, InspectionResult};
use tokio::sync::RwLock;

use super::trait_::{sort_chronologically, HistoryStore, Result, StorageError};

/// History kept in memory; lost when the process exits.
#[derive(Default)]
pub struct MemoryStorage {
    results: RwLock<HashMap<String, Vec<InspectionResult>>>,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryStorage {
    async fn append(&self, result: &InspectionResult) -> Result<()> {
        let mut results = self.results.write().await;
        let entries = results.entry(result.data_type_id.clone()).or_default();
        if entries.iter().any(|r| r.inspection_id == result.inspection_id) {
            return Err(StorageError::Conflict(format!(
                "{}/{}",
                result.data_type_id, result.inspection_id
            )));
        }
        entries.push(result.clone());
        sort_chronologically(entries);
        Ok(())
    }

    async fn load(&self, data_type_id: &str, id: InspectionId) -> Result<Option<InspectionResult>> {
        Ok(self
            .results
            .read()
            .await
            .get(data_type_id)
            .and_then(|entries| entries.iter().find(|r| r.inspection_id == id).cloned()))
    }

    async fn list(&self, data_type_id: &str) -> Result<Vec<InspectionResult>> {
        Ok(self
            .results
            .read()
            .await
            .get(data_type_id)
            .cloned()
            .unwrap_or_default())
    }
}
