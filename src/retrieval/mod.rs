//! Retrieval collaborators: document sources, chunking and similarity stores

pub mod chunker;
pub mod document;
pub mod ingest;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod store;

pub use chunker::TextChunker;
pub use document::{DirectorySource, Document, DocumentSource, FileSource, SourceError, WebSource};
pub use ingest::{ingest, IngestReport};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
pub use store::{cosine_similarity, InMemoryStore, ScoredDocument, SimilarityStore, StoreError};
