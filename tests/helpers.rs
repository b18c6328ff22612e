//! Test utility functions for promptchain

#![allow(dead_code)]

use async_trait::async_trait;
use promptchain::core::{ChainError, ChatMessage, ExecutionResult, Step};
use promptchain::provider::{CompletionProvider, EmbeddingProvider, ProviderError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Provider that returns predefined replies in order
pub struct ScriptedProvider {
    replies: Vec<String>,
    index: AtomicUsize,
    received: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedProvider {
    pub fn new<S: Into<String>>(replies: impl IntoIterator<Item = S>) -> Self {
        Self {
            replies: replies.into_iter().map(Into::into).collect(),
            index: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.index.load(Ordering::SeqCst)
    }

    /// Messages of every request, oldest first
    pub fn received(&self) -> Vec<Vec<ChatMessage>> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        self.received.lock().unwrap().push(messages.to_vec());
        let idx = self.index.fetch_add(1, Ordering::SeqCst);
        self.replies.get(idx).cloned().ok_or_else(|| {
            ProviderError::transport(format!(
                "ScriptedProvider: no reply available for request {}",
                idx + 1
            ))
        })
    }
}

/// Provider that answers according to keywords found in the request
///
/// Useful when requests arrive concurrently and order is not fixed.
pub struct KeywordProvider {
    rules: Vec<(String, String)>,
    fallback: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl KeywordProvider {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            fallback: None,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn when(mut self, keyword: &str, reply: &str) -> Self {
        self.rules.push((keyword.to_string(), reply.to_string()));
        self
    }

    pub fn otherwise(mut self, reply: &str) -> Self {
        self.fallback = Some(reply.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for KeywordProvider {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let request = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        self.rules
            .iter()
            .find(|(keyword, _)| request.contains(keyword.as_str()))
            .map(|(_, reply)| reply.clone())
            .or_else(|| self.fallback.clone())
            .ok_or_else(|| ProviderError::api(400, format!("no scripted reply for: {}", request)))
    }
}

/// Provider that always fails with the given status
pub struct FailingProvider(pub u16);

#[async_trait]
impl CompletionProvider for FailingProvider {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, ProviderError> {
        Err(ProviderError::api(self.0, "service unavailable"))
    }
}

/// Text step that appends a suffix and counts its invocations
pub struct CountingStep {
    name: String,
    suffix: String,
    calls: Arc<AtomicUsize>,
}

impl CountingStep {
    pub fn new(name: &str, suffix: &str) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let step = Self {
            name: name.to_string(),
            suffix: suffix.to_string(),
            calls: Arc::clone(&calls),
        };
        (step, calls)
    }
}

#[async_trait]
impl Step<String, String> for CountingStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: String) -> ExecutionResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{}{}", input, self.suffix))
    }
}

/// Text step that always fails, counting its invocations
pub struct FailingStep {
    name: String,
    calls: Arc<AtomicUsize>,
}

impl FailingStep {
    pub fn new(name: &str) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let step = Self {
            name: name.to_string(),
            calls: Arc::clone(&calls),
        };
        (step, calls)
    }
}

#[async_trait]
impl Step<String, String> for FailingStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _input: String) -> ExecutionResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ChainError::message(format!("{} refused the input", self.name)))
    }
}

pub const EMBEDDING_DIMENSIONS: usize = 32;

/// Deterministic bag-of-words embedder
///
/// Texts sharing words point in similar directions; identical texts have
/// similarity 1.
#[derive(Default)]
pub struct HashEmbedder {
    calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn bag_of_words(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0; EMBEDDING_DIMENSIONS];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let bucket = word
            .to_lowercase()
            .bytes()
            .fold(7usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
        vector[bucket % EMBEDDING_DIMENSIONS] += 1.0;
    }
    vector
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(bag_of_words(text))
    }
}
