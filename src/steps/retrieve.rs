//! Retrieval steps: similarity search and context formatting

use crate::core::error::ExecutionResult;
use crate::core::step::Step;
use crate::provider::EmbeddingProvider;
use crate::retrieval::{ScoredDocument, SimilarityStore};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_K: usize = 3;
pub const DEFAULT_MIN_SCORE: f32 = 0.5;

/// Embeds a query and returns the most similar stored documents
#[derive(Clone)]
pub struct RetrieveStep {
    name: String,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn SimilarityStore>,
    k: usize,
    min_score: f32,
}

impl RetrieveStep {
    pub fn new(
        name: impl Into<String>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn SimilarityStore>,
    ) -> Self {
        Self {
            name: name.into(),
            embedder,
            store,
            k: DEFAULT_K,
            min_score: DEFAULT_MIN_SCORE,
        }
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }
}

#[async_trait]
impl Step<String, Vec<ScoredDocument>> for RetrieveStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: String) -> ExecutionResult<Vec<ScoredDocument>> {
        let vector = self.embedder.embed(&input).await?;
        let results = self.store.query(&vector, self.k, self.min_score).await?;
        debug!("Retrieved {} documents for query", results.len());
        Ok(results)
    }
}

/// Renders retrieved documents as a numbered context block
#[derive(Debug, Clone)]
pub struct ContextStep {
    name: String,
}

impl ContextStep {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Step<Vec<ScoredDocument>, String> for ContextStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: Vec<ScoredDocument>) -> ExecutionResult<String> {
        Ok(input
            .iter()
            .enumerate()
            .map(|(i, doc)| format!("Document {}:\n{}", i + 1, doc.document.text))
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}
