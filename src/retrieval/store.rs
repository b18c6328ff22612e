//! Similarity search over embedded documents

use crate::retrieval::document::Document;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("vector dimension mismatch for '{id}': expected {expected}, got {found}")]
    DimensionMismatch {
        id: String,
        expected: usize,
        found: usize,
    },

    #[error("cannot store an empty vector for '{0}'")]
    EmptyVector(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("corrupt record '{id}': {message}")]
    Corrupt { id: String, message: String },
}

#[cfg(feature = "sqlite")]
impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// A stored document together with its similarity to the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub id: String,
    pub document: Document,
    pub score: f32,
}

/// Vector store queried by cosine similarity
#[async_trait]
pub trait SimilarityStore: Send + Sync {
    /// Insert or replace the entry stored under `id`
    async fn upsert(
        &self,
        id: &str,
        vector: Vec<f32>,
        text: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<(), StoreError>;

    /// At most `k` entries with `score >= min_score`, best first
    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredDocument>, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;

    /// Remove every entry whose `source` metadata equals `source`; returns how many
    async fn delete_source(&self, source: &str) -> Result<usize, StoreError>;
}

/// Cosine similarity in `[-1, 1]`; zero-norm vectors score 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Entry as held by a store backend
#[derive(Debug, Clone)]
pub(crate) struct StoredEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub document: Document,
}

/// Score, filter and order entries against `query`
pub(crate) fn rank<'a>(
    entries: impl IntoIterator<Item = &'a StoredEntry>,
    query: &[f32],
    k: usize,
    min_score: f32,
) -> Result<Vec<ScoredDocument>, StoreError> {
    let mut scored = Vec::new();
    for entry in entries {
        if entry.vector.len() != query.len() {
            return Err(StoreError::DimensionMismatch {
                id: entry.id.clone(),
                expected: query.len(),
                found: entry.vector.len(),
            });
        }
        let score = cosine_similarity(query, &entry.vector);
        if score >= min_score {
            scored.push(ScoredDocument {
                id: entry.id.clone(),
                document: entry.document.clone(),
                score,
            });
        }
    }

    scored.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
    scored.truncate(k);
    Ok(scored)
}

/// Process-local store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<BTreeMap<String, StoredEntry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SimilarityStore for InMemoryStore {
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
        let entry = StoredEntry {
            id: id.to_string(),
            vector,
            document: Document {
                text: text.to_string(),
                metadata,
            },
        };
        self.entries.write().await.insert(id.to_string(), entry);
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredDocument>, StoreError> {
        let entries = self.entries.read().await;
        rank(entries.values(), vector, k, min_score)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.entries.read().await.len())
    }

    async fn delete_source(&self, source: &str) -> Result<usize, StoreError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.document.source() != Some(source));
        Ok(before - entries.len())
    }
}
