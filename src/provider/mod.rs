//! Model provider seams
//!
//! Chains talk to language and embedding models only through these traits,
//! so any backend (an HTTP API, a local model, a scripted stub) can be
//! plugged in.

mod error;
pub mod openai;

pub use error::ProviderError;
pub use openai::{OpenAiChat, OpenAiEmbeddings};

use crate::core::message::ChatMessage;
use async_trait::async_trait;

/// Chat completion backend
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Return the assistant reply to `messages`
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError>;
}

/// Text embedding backend
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
}

/// Provider that refuses every request
///
/// Used to build and validate chains without network access.
#[derive(Debug, Clone, Copy, Default)]
pub struct Disconnected;

#[async_trait]
impl CompletionProvider for Disconnected {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, ProviderError> {
        Err(ProviderError::transport("no completion provider configured"))
    }
}

#[async_trait]
impl EmbeddingProvider for Disconnected {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
        Err(ProviderError::transport("no embedding provider configured"))
    }
}
