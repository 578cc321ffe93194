//! JSON file history store.
//!
//! Each inspection result is one file at
//! `<root>/history/<data_type_id>/<inspection_id>.json`. Files are written to a
//! temporary name and renamed into place, so a reader never sees a partial
//! record.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use portdq_core::{InspectionId, InspectionResult};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::trait_::{check_data_type_id, sort_chronologically, HistoryStore, Result, StorageError};

/// File-based JSON history store.
pub struct JsonStorage {
    root: PathBuf,
    append_lock: Arc<Mutex<()>>,
}

impl JsonStorage {
    /// Create storage rooted at `root`, creating the `history/` directory.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join("history")).await?;

        Ok(Self {
            root,
            append_lock: Arc::new(Mutex::new(())),
        })
    }

    fn data_type_dir(&self, data_type_id: &str) -> PathBuf {
        self.root.join("history").join(data_type_id)
    }

    fn result_path(&self, data_type_id: &str, id: InspectionId) -> PathBuf {
        self.data_type_dir(data_type_id).join(format!("{}.json", id))
    }
}

#[async_trait]
impl HistoryStore for JsonStorage {
    async fn append(&self, result: &InspectionResult) -> Result<()> {
        check_data_type_id(&result.data_type_id)?;
        let _guard = self.append_lock.lock().await;

        let path = self.result_path(&result.data_type_id, result.inspection_id);
        if fs::try_exists(&path).await? {
            return Err(StorageError::Conflict(format!(
                "{}/{}",
                result.data_type_id, result.inspection_id
            )));
        }

        fs::create_dir_all(self.data_type_dir(&result.data_type_id)).await?;
        let json = serde_json::to_string_pretty(result)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json.as_bytes()).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!(
            data_type = %result.data_type_id,
            inspection = %result.inspection_id,
            "Appended inspection result"
        );
        Ok(())
    }

    async fn load(&self, data_type_id: &str, id: InspectionId) -> Result<Option<InspectionResult>> {
        check_data_type_id(data_type_id)?;
        read_json(&self.result_path(data_type_id, id)).await
    }

    async fn list(&self, data_type_id: &str) -> Result<Vec<InspectionResult>> {
        check_data_type_id(data_type_id)?;
        let mut results: Vec<InspectionResult> = list_dir(&self.data_type_dir(data_type_id)).await?;
        sort_chronologically(&mut results);
        Ok(results)
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn list_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut rd = match fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(items),
        Err(e) => return Err(e.into()),
    };
    while let Some(entry) = rd.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        match read_json(&path).await {
            Ok(Some(item)) => items.push(item),
            Ok(None) => {}
            Err(e) => warn!("Skipping unreadable history file {}: {}", path.display(), e),
        }
    }
    Ok(items)
}
