//! SQLite history store.
//!
//! One append-only table keyed by `(data_type_id, inspection_id)`, with the
//! full result stored as JSON and `created_at` indexed for bucketing queries.

use async_trait::async_trait;
use chrono::SecondsFormat;
use portdq_core::{InspectionId, InspectionResult, Time};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;

use super::trait_::{HistoryStore, Result, StorageError};

/// SQLite storage implementation.
#[derive(Clone)]
pub struct SqliteStorage {
    /// Database connection pool
    pool: sqlx::SqlitePool,
}

impl SqliteStorage {
    /// Open (or create) a database file.
    pub async fn new_from_path(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(db_err)?;

        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Create an in-memory SQLite storage for testing.
    pub async fn in_memory() -> Result<Self> {
        // A single connection, since every in-memory connection is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(db_err)?;

        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS inspection_history (
                data_type_id TEXT NOT NULL,
                inspection_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (data_type_id, inspection_id)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_history_created
             ON inspection_history(data_type_id, created_at)",
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    fn decode_rows(rows: Vec<sqlx::sqlite::SqliteRow>) -> Result<Vec<InspectionResult>> {
        rows.iter()
            .map(|row| -> Result<InspectionResult> {
                let data: String = row.try_get("data").map_err(db_err)?;
                Ok(serde_json::from_str(&data)?)
            })
            .collect()
    }
}

/// Fixed-width UTC timestamps so text ordering matches time ordering.
fn timestamp(t: &Time) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn db_err(e: sqlx::Error) -> StorageError {
    StorageError::Database(e.to_string())
}

#[async_trait]
impl HistoryStore for SqliteStorage {
    async fn append(&self, result: &InspectionResult) -> Result<()> {
        let data = serde_json::to_string(result)?;

        // A single INSERT is atomic; the primary key forbids rewriting history.
        let outcome = sqlx::query(
            "INSERT INTO inspection_history (data_type_id, inspection_id, created_at, data)
            VALUES (?, ?, ?, ?)",
        )
        .bind(&result.data_type_id)
        .bind(result.inspection_id.to_string())
        .bind(timestamp(&result.created_at))
        .bind(data)
        .execute(&self.pool)
        .await;

        match outcome {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(StorageError::Conflict(
                format!("{}/{}", result.data_type_id, result.inspection_id),
            )),
            Err(e) => Err(db_err(e)),
        }
    }

    async fn load(&self, data_type_id: &str, id: InspectionId) -> Result<Option<InspectionResult>> {
        let row = sqlx::query(
            "SELECT data FROM inspection_history WHERE data_type_id = ? AND inspection_id = ?",
        )
        .bind(data_type_id)
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some(row) => {
                let data: String = row.try_get("data").map_err(db_err)?;
                Ok(Some(serde_json::from_str(&data)?))
            }
            None => Ok(None),
        }
    }

    async fn list(&self, data_type_id: &str) -> Result<Vec<InspectionResult>> {
        let rows = sqlx::query(
            "SELECT data FROM inspection_history WHERE data_type_id = ?
             ORDER BY created_at, inspection_id",
        )
        .bind(data_type_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Self::decode_rows(rows)
    }

    async fn latest(&self, data_type_id: &str) -> Result<Option<InspectionResult>> {
        let row = sqlx::query(
            "SELECT data FROM inspection_history WHERE data_type_id = ?
             ORDER BY created_at DESC, inspection_id DESC LIMIT 1",
        )
        .bind(data_type_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(Self::decode_rows(row.into_iter().collect())?.pop())
    }

    async fn list_between(
        &self,
        data_type_id: &str,
        from: Time,
        to: Time,
    ) -> Result<Vec<InspectionResult>> {
        let rows = sqlx::query(
            "SELECT data FROM inspection_history
             WHERE data_type_id = ? AND created_at >= ? AND created_at < ?
             ORDER BY created_at, inspection_id",
        )
        .bind(data_type_id)
        .bind(timestamp(&from))
        .bind(timestamp(&to))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Self::decode_rows(rows)
    }
}
