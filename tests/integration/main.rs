//! Integration tests against a live OpenAI-compatible endpoint
//!
//! These tests need `OPENAI_API_KEY` (and network access). They are tagged
//! with `#[ignore]` and should be run explicitly with:
//!
//!     cargo test --test integration -- --ignored

use promptchain::core::{AppConfig, Payload, Variables};
use promptchain::provider::{EmbeddingProvider, OpenAiChat, OpenAiEmbeddings};
use std::sync::Arc;

const CONFIG: &str = r#"
templates:
  translator:
    system: "Translate the user's text into {language}. Reply with the translation only."
    human: "{text}"
chains:
  translate:
    - kind: prompt
      template: translator
    - kind: complete
      timeout_secs: 60
    - kind: parse
"#;

#[tokio::test]
#[ignore]
async fn test_live_translation() {
    let config = AppConfig::from_yaml(CONFIG).unwrap();
    let provider = Arc::new(OpenAiChat::from_config(&config.provider).unwrap());
    let chain = config.chain("translate", provider).unwrap();

    let mut variables = Variables::new();
    variables.insert("language".to_string(), "French".to_string());
    variables.insert("text".to_string(), "Good morning".to_string());

    let output = chain
        .run(Payload::Variables(variables))
        .await
        .unwrap()
        .into_text()
        .unwrap();
    assert!(output.to_lowercase().contains("bonjour"), "got: {}", output);
}

#[tokio::test]
#[ignore]
async fn test_live_embeddings_are_consistent() {
    let config = AppConfig::default();
    let embeddings = OpenAiEmbeddings::from_config(&config.embeddings).unwrap();

    let a = embeddings.embed("Romeo and Juliet").await.unwrap();
    let b = embeddings.embed("Romeo and Juliet").await.unwrap();
    assert_eq!(a.len(), b.len());
    assert!(promptchain::retrieval::cosine_similarity(&a, &b) > 0.99);
}
