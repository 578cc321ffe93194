//! History store abstraction.

use async_trait::async_trait;
use portdq_core::{InspectionId, InspectionResult, Time};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Record already exists; history is append-only
    #[error("Already stored: {0}")]
    Conflict(String),

    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Database backend error
    #[error("Database error: {0}")]
    Database(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Append-only store of inspection results, keyed by
/// `(data_type_id, inspection_id)`.
///
/// Every append is atomic: readers see the whole record or none of it.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append a result. Appending an existing key is a [`StorageError::Conflict`].
    async fn append(&self, result: &InspectionResult) -> Result<()>;

    /// Load one result.
    async fn load(&self, data_type_id: &str, id: InspectionId) -> Result<Option<InspectionResult>>;

    /// All results of a data type, oldest first.
    async fn list(&self, data_type_id: &str) -> Result<Vec<InspectionResult>>;

    /// Most recent result of a data type.
    async fn latest(&self, data_type_id: &str) -> Result<Option<InspectionResult>> {
        Ok(self.list(data_type_id).await?.pop())
    }

    /// Results created in `[from, to)`, oldest first.
    async fn list_between(
        &self,
        data_type_id: &str,
        from: Time,
        to: Time,
    ) -> Result<Vec<InspectionResult>> {
        Ok(self
            .list(data_type_id)
            .await?
            .into_iter()
            .filter(|r| r.created_at >= from && r.created_at < to)
            .collect())
    }
}

/// Order results oldest first, breaking ties by id.
pub(crate) fn sort_chronologically(results: &mut [InspectionResult]) {
    results.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.inspection_id.cmp(&b.inspection_id))
    });
}

/// Reject ids that cannot be used as a single path segment.
pub(crate) fn check_data_type_id(id: &str) -> Result<()> {
    if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\']) {
        return Err(StorageError::Other(format!("invalid data type id '{id}'")));
    }
    Ok(())
}
