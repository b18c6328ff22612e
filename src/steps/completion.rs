//! Model completion step

use crate::core::error::ExecutionResult;
use crate::core::message::ChatMessage;
use crate::core::step::Step;
use crate::provider::{CompletionProvider, ProviderError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::debug;

/// Sends a conversation to a completion provider and returns the reply
#[derive(Clone)]
pub struct CompletionStep {
    name: String,
    provider: Arc<dyn CompletionProvider>,
    timeout: Option<Duration>,
}

impl CompletionStep {
    pub fn new(name: impl Into<String>, provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            name: name.into(),
            provider,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }
}

#[async_trait]
impl Step<Vec<ChatMessage>, ChatMessage> for CompletionStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: Vec<ChatMessage>) -> ExecutionResult<ChatMessage> {
        debug!("Step {} sending {} messages", self.name, input.len());
        let reply = match self.timeout {
            Some(limit) => match timeout(limit, self.provider.complete(&input)).await {
                Ok(result) => result?,
                Err(_) => return Err(ProviderError::timeout(limit).into()),
            },
            None => self.provider.complete(&input).await?,
        };
        Ok(ChatMessage::assistant(reply))
    }
}
