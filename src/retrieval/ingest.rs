//! Load, split, embed and store documents

use crate::core::error::ExecutionResult;
use crate::provider::EmbeddingProvider;
use crate::retrieval::chunker::{TextChunker, CHUNK_KEY};
use crate::retrieval::document::{Document, DocumentSource, SOURCE_KEY};
use crate::retrieval::store::SimilarityStore;
use std::collections::BTreeSet;
use tracing::{debug, info};
use uuid::Uuid;

/// Outcome of an ingestion run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
    /// The store already held entries and ingestion was not forced
    pub skipped: bool,
}

/// Stable id for a chunk, so re-ingesting the same source replaces entries
pub fn chunk_id(chunk: &Document, fallback_source: &str) -> Uuid {
    let source = chunk.source().unwrap_or(fallback_source);
    let index = chunk.metadata.get(CHUNK_KEY).map(String::as_str).unwrap_or("0");
    Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{}#{}", source, index).as_bytes())
}

/// Populate `store` from `source`
///
/// Does nothing when the store already has entries unless `force` is set.
/// A forced run first removes the previous entries of every source it loads.
/// `progress` is called with `(done, total)` after each stored chunk.
pub async fn ingest<F>(
    source: &dyn DocumentSource,
    chunker: &TextChunker,
    embedder: &dyn EmbeddingProvider,
    store: &dyn SimilarityStore,
    force: bool,
    mut progress: F,
) -> ExecutionResult<IngestReport>
where
    F: FnMut(usize, usize),
{
    let existing = store.count().await?;
    if existing > 0 && !force {
        info!("Store already holds {} entries, skipping ingestion", existing);
        return Ok(IngestReport {
            skipped: true,
            ..IngestReport::default()
        });
    }

    let fallback = source.describe();
    let documents: Vec<Document> = source
        .load()
        .await?
        .into_iter()
        .map(|document| {
            if document.source().is_some() {
                document
            } else {
                document.with_metadata(SOURCE_KEY, &fallback)
            }
        })
        .collect();
    let chunks = chunker.split_documents(&documents);
    info!(
        "Ingesting {}: {} documents, {} chunks",
        source.describe(),
        documents.len(),
        chunks.len()
    );

    if existing > 0 {
        let sources: BTreeSet<&str> = documents.iter().filter_map(Document::source).collect();
        for name in sources {
            let removed = store.delete_source(name).await?;
            debug!("Removed {} stale entries of {}", removed, name);
        }
    }

    for (done, chunk) in chunks.iter().enumerate() {
        let vector = embedder.embed(&chunk.text).await?;
        let id = chunk_id(chunk, &fallback).to_string();
        store
            .upsert(&id, vector, &chunk.text, chunk.metadata.clone())
            .await?;
        progress(done + 1, chunks.len());
    }

    Ok(IngestReport {
        documents: documents.len(),
        chunks: chunks.len(),
        skipped: false,
    })
}
