//! Multi-turn conversations backed by a message history

use crate::core::message::ChatMessage;
use crate::persistence::{HistoryError, MessageHistory};
use crate::provider::{CompletionProvider, ProviderError};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Error)]
pub enum ChatError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    History(#[from] HistoryError),
}

/// A conversation whose turns are persisted in a `MessageHistory`
pub struct ChatSession {
    provider: Arc<dyn CompletionProvider>,
    history: Arc<dyn MessageHistory>,
    session: String,
}

impl ChatSession {
    /// Open `session`, seeding it with `system` when it has no messages yet
    pub async fn start(
        provider: Arc<dyn CompletionProvider>,
        history: Arc<dyn MessageHistory>,
        session: impl Into<String>,
        system: Option<&str>,
    ) -> Result<Self, ChatError> {
        let session = session.into();
        if let Some(system) = system {
            if history.messages(&session).await?.is_empty() {
                history.append(&session, &ChatMessage::system(system)).await?;
            }
        }
        Ok(Self {
            provider,
            history,
            session,
        })
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    /// Send one human turn and record it with the reply
    ///
    /// Nothing is recorded when the provider fails.
    pub async fn send(&self, text: &str) -> Result<String, ChatError> {
        let question = ChatMessage::human(text);
        let mut messages = self.history.messages(&self.session).await?;
        messages.push(question.clone());
        debug!("Session {} sending {} messages", self.session, messages.len());

        let reply = self.provider.complete(&messages).await?;

        self.history.append(&self.session, &question).await?;
        self.history
            .append(&self.session, &ChatMessage::assistant(reply.as_str()))
            .await?;
        Ok(reply)
    }

    pub async fn transcript(&self) -> Result<Vec<ChatMessage>, ChatError> {
        Ok(self.history.messages(&self.session).await?)
    }

    pub async fn reset(&self) -> Result<(), ChatError> {
        Ok(self.history.clear(&self.session).await?)
    }
}
