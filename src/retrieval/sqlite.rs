//! SQLite-backed similarity store

use crate::retrieval::document::Document;
use crate::retrieval::store::{rank, ScoredDocument, SimilarityStore, StoreError, StoredEntry};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

const DATABASE_FILE: &str = "store.db";

/// Persistent store; every collection lives in the same database file
pub struct SqliteStore {
    pool: SqlitePool,
    collection: String,
}

impl SqliteStore {
    /// Open (creating if needed) the store under `directory`
    pub async fn open(directory: impl AsRef<Path>, collection: impl Into<String>) -> Result<Self, StoreError> {
        let directory = directory.as_ref();
        std::fs::create_dir_all(directory).map_err(|e| {
            StoreError::Database(format!("cannot create {}: {}", directory.display(), e))
        })?;

        let options = SqliteConnectOptions::new()
            .filename(directory.join(DATABASE_FILE))
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        Self::with_pool(pool, collection.into()).await
    }

    /// Store that lives only as long as the process
    pub async fn in_memory(collection: impl Into<String>) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::with_pool(pool, collection.into()).await
    }

    /// Default location under the user's local data directory
    pub fn default_directory() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("promptchain")
            .join("vectors")
    }

    async fn with_pool(pool: SqlitePool, collection: String) -> Result<Self, StoreError> {
        let store = Self { pool, collection };
        store.init().await?;
        Ok(store)
    }

    async fn init(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                text TEXT NOT NULL,
                metadata TEXT NOT NULL,
                vector TEXT NOT NULL,
                dimension INTEGER NOT NULL,
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

fn corrupt(id: &str, e: serde_json::Error) -> StoreError {
    StoreError::Corrupt {
        id: id.to_string(),
        message: e.to_string(),
    }
}

#[async_trait]
impl SimilarityStore for SqliteStore {
    async fn upsert(
        &self,
        id: &str,
        vector: Vec<f32>,
        text: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        if vector.is_empty() {
            return Err(StoreError::EmptyVector(id.to_string()));
        }
        let metadata_json = serde_json::to_string(&metadata).map_err(|e| corrupt(id, e))?;
        let vector_json = serde_json::to_string(&vector).map_err(|e| corrupt(id, e))?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO documents
            (collection, id, text, metadata, vector, dimension)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&self.collection)
        .bind(id)
        .bind(text)
        .bind(metadata_json)
        .bind(vector_json)
        .bind(vector.len() as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredDocument>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, text, metadata, vector
            FROM documents
            WHERE collection = ?1
            "#,
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.get("id");
            let metadata: BTreeMap<String, String> =
                serde_json::from_str(&row.get::<String, _>("metadata")).map_err(|e| corrupt(&id, e))?;
            let stored: Vec<f32> =
                serde_json::from_str(&row.get::<String, _>("vector")).map_err(|e| corrupt(&id, e))?;
            entries.push(StoredEntry {
                document: Document {
                    text: row.get("text"),
                    metadata,
                },
                vector: stored,
                id,
            });
        }
        debug!("Scoring {} entries in collection {}", entries.len(), self.collection);

        rank(&entries, vector, k, min_score)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM documents WHERE collection = ?1")
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("n") as usize)
    }

    async fn delete_source(&self, source: &str) -> Result<usize, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM documents
            WHERE collection = ?1 AND json_extract(metadata, '$.source') = ?2
            "#,
        )
        .bind(&self.collection)
        .bind(source)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() as usize)
    }
}
