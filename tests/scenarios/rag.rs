//! Test: Retrieval - ingest documents, then answer from the closest ones

use crate::helpers::*;
use promptchain::core::{step_fn, ParallelGroup, Pipeline, PromptTemplate};
use promptchain::retrieval::{
    ingest, DirectorySource, FileSource, InMemoryStore, SimilarityStore, TextChunker,
};
use promptchain::steps::{
    CompletionStep, ContentParser, ContextStep, JoinStep, RetrieveStep, TemplateStep,
};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

const ROMEO: &str = "Romeo loves Juliet in Verona. Juliet is a Capulet.";
const FRANKENSTEIN: &str = "Victor Frankenstein creates a creature in his laboratory.";

fn books() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("romeo.txt"), ROMEO).unwrap();
    fs::write(dir.path().join("frankenstein.txt"), FRANKENSTEIN).unwrap();
    fs::write(dir.path().join("notes.md"), "not a book").unwrap();
    dir
}

#[tokio::test]
async fn test_ingest_then_skip_existing_collection() {
    let dir = books();
    let embedder = HashEmbedder::default();
    let store = InMemoryStore::new();
    let source = DirectorySource::new(dir.path());
    let chunker = TextChunker::default();

    let mut progress = Vec::new();
    let report = ingest(&source, &chunker, &embedder, &store, false, |done, total| {
        progress.push((done, total))
    })
    .await
    .unwrap();

    assert!(!report.skipped);
    assert_eq!(report.documents, 2);
    assert_eq!(report.chunks, 2);
    assert_eq!(store.count().await.unwrap(), 2);
    assert_eq!(progress, vec![(1, 2), (2, 2)]);

    let again = ingest(&source, &chunker, &embedder, &store, false, |_, _| {})
        .await
        .unwrap();
    assert!(again.skipped);
    assert_eq!(embedder.calls(), 2);

    // forcing re-ingests under the same ids
    ingest(&source, &chunker, &embedder, &store, true, |_, _| {})
        .await
        .unwrap();
    assert_eq!(store.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_forced_ingest_drops_chunks_of_shrunk_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("odyssey.txt");
    let paragraphs: Vec<String> = (0..6)
        .map(|i| format!("Book {} of the odyssey follows Odysseus home.", i))
        .collect();
    fs::write(&path, paragraphs.join("\n\n")).unwrap();

    let embedder = HashEmbedder::default();
    let store = InMemoryStore::new();
    let source = FileSource::new(&path);
    let chunker = TextChunker::new(60, 10).unwrap();

    let first = ingest(&source, &chunker, &embedder, &store, false, |_, _| {})
        .await
        .unwrap();
    assert!(first.chunks > 2);
    assert_eq!(store.count().await.unwrap(), first.chunks);

    fs::write(&path, &paragraphs[0]).unwrap();
    let second = ingest(&source, &chunker, &embedder, &store, true, |_, _| {})
        .await
        .unwrap();
    assert_eq!(second.chunks, 1);
    assert_eq!(store.count().await.unwrap(), 1);

    let left = store.query(&bag_of_words(&paragraphs[5]), 10, -1.0).await.unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].document.text, paragraphs[0]);
}

#[tokio::test]
async fn test_retrieval_filters_by_score() {
    let dir = books();
    let embedder = Arc::new(HashEmbedder::default());
    let store = Arc::new(InMemoryStore::new());
    ingest(
        &DirectorySource::new(dir.path()),
        &TextChunker::default(),
        embedder.as_ref(),
        store.as_ref(),
        false,
        |_, _| {},
    )
    .await
    .unwrap();

    let results = store
        .query(&bag_of_words(ROMEO), 3, 0.99)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].document.source(), Some("romeo.txt"));
    assert!(results[0].score > 0.99);

    let everything = store.query(&bag_of_words(ROMEO), 3, -1.0).await.unwrap();
    assert_eq!(everything.len(), 2);
    assert!(everything[0].score >= everything[1].score);
}

#[tokio::test]
async fn test_answer_from_retrieved_documents() {
    let dir = books();
    let embedder = Arc::new(HashEmbedder::default());
    let store = Arc::new(InMemoryStore::new());
    ingest(
        &DirectorySource::new(dir.path()),
        &TextChunker::default(),
        embedder.as_ref(),
        store.as_ref(),
        false,
        |_, _| {},
    )
    .await
    .unwrap();

    let question = Pipeline::<String, String>::builder("question")
        .then(step_fn("identity", |s: String| async move { Ok(s) }))
        .build()
        .unwrap();
    let docs = Pipeline::<String, String>::builder("docs")
        .then(RetrieveStep::new("retrieve", embedder, store).with_min_score(0.99))
        .then(ContextStep::new("context"))
        .build()
        .unwrap();
    let gather = ParallelGroup::builder("gather")
        .branch("question", question)
        .branch("docs", docs)
        .build()
        .unwrap();

    let provider = Arc::new(ScriptedProvider::new(["In Verona."]));
    let chain = Pipeline::<String, String>::builder("rag")
        .then(gather)
        .then(JoinStep::new(
            "combine",
            "Here are some documents that might help answer the question: {question}\n\nRelevant Documents:\n{docs}",
        ))
        .then(TemplateStep::new(
            "prompt",
            PromptTemplate::from_template(
                "{input}\n\nPlease provide an answer based only on the provided documents.",
            ),
        ))
        .then(CompletionStep::new("complete", provider.clone()))
        .then(ContentParser::default())
        .build()
        .unwrap();

    let answer = chain.run(ROMEO.to_string()).await.unwrap();

    assert_eq!(answer, "In Verona.");
    let prompt = &provider.received()[0][0].content;
    assert!(prompt.contains(&format!("Document 1:\n{}", ROMEO)));
    assert!(!prompt.contains("Document 2:"));
    assert!(!prompt.contains("Frankenstein"));
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn test_sqlite_store_survives_reopen() {
    use promptchain::retrieval::SqliteStore;

    let books = books();
    let data = tempfile::tempdir().unwrap();
    let embedder = HashEmbedder::default();

    {
        let store = SqliteStore::open(data.path(), "books").await.unwrap();
        let report = ingest(
            &FileSource::new(books.path().join("frankenstein.txt")),
            &TextChunker::default(),
            &embedder,
            &store,
            false,
            |_, _| {},
        )
        .await
        .unwrap();
        assert_eq!(report.chunks, 1);
    }

    let reopened = SqliteStore::open(data.path(), "books").await.unwrap();
    assert_eq!(reopened.count().await.unwrap(), 1);
    let results = reopened
        .query(&bag_of_words(FRANKENSTEIN), 3, 0.5)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].document.text, FRANKENSTEIN);

    let other = SqliteStore::open(data.path(), "poems").await.unwrap();
    assert_eq!(other.count().await.unwrap(), 0);
}
