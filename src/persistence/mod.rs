//! Persistence layer for chat message history

#[cfg(feature = "sqlite")]
pub mod store;

#[cfg(feature = "sqlite")]
pub use store::SqliteHistory;

use crate::core::message::ChatMessage;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HistoryError {
    #[error("history database error: {0}")]
    Database(String),

    #[error("corrupt history record: {0}")]
    Corrupt(String),
}

#[cfg(feature = "sqlite")]
impl From<sqlx::Error> for HistoryError {
    fn from(e: sqlx::Error) -> Self {
        HistoryError::Database(e.to_string())
    }
}

/// Ordered message log per conversation session
#[async_trait::async_trait]
pub trait MessageHistory: Send + Sync {
    /// All messages of a session, oldest first
    async fn messages(&self, session: &str) -> Result<Vec<ChatMessage>, HistoryError>;

    async fn append(&self, session: &str, message: &ChatMessage) -> Result<(), HistoryError>;

    async fn clear(&self, session: &str) -> Result<(), HistoryError>;

    /// Known session ids, sorted
    async fn sessions(&self) -> Result<Vec<String>, HistoryError>;
}

/// In-memory history (for testing or ephemeral use)
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    sessions: RwLock<HashMap<String, Vec<ChatMessage>>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl MessageHistory for InMemoryHistory {
    async fn messages(&self, session: &str) -> Result<Vec<ChatMessage>, HistoryError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session).cloned().unwrap_or_default())
    }

    async fn append(&self, session: &str, message: &ChatMessage) -> Result<(), HistoryError> {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session.to_string())
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn clear(&self, session: &str) -> Result<(), HistoryError> {
        self.sessions.write().await.remove(session);
        Ok(())
    }

    async fn sessions(&self) -> Result<Vec<String>, HistoryError> {
        let mut names: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
