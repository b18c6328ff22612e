//! SQLite-based message history

use crate::core::message::{ChatMessage, Role};
use crate::persistence::{HistoryError, MessageHistory};
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// SQLite message store, one row per message
pub struct SqliteHistory {
    pool: SqlitePool,
}

impl SqliteHistory {
    /// Open (creating if needed) the database at `db_path`
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, HistoryError> {
        let options = SqliteConnectOptions::new()
            .filename(db_path.as_ref())
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    /// Create store with default path
    pub async fn with_default_path() -> Result<Self, HistoryError> {
        Self::new(Self::default_path()?).await
    }

    pub fn default_path() -> Result<PathBuf, HistoryError> {
        let data_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        let db_dir = data_dir.join("promptchain");
        std::fs::create_dir_all(&db_dir).map_err(|e| {
            HistoryError::Database(format!("cannot create {}: {}", db_dir.display(), e))
        })?;
        Ok(db_dir.join("history.db"))
    }

    /// History that lives only as long as the process
    pub async fn in_memory() -> Result<Self, HistoryError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    /// Initialize database schema
    async fn init(&self) -> Result<(), HistoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_session ON messages(session)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Convert DateTime<Utc> to NaiveDateTime for SQLite
    fn to_naive(dt: DateTime<Utc>) -> NaiveDateTime {
        dt.naive_utc()
    }
}

#[async_trait::async_trait]
impl MessageHistory for SqliteHistory {
    async fn messages(&self, session: &str) -> Result<Vec<ChatMessage>, HistoryError> {
        let rows = sqlx::query(
            r#"
            SELECT role, content
            FROM messages
            WHERE session = ?1
            ORDER BY id ASC
            "#,
        )
        .bind(session)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let role = Role::from_str(&row.get::<String, _>("role"))
                    .map_err(HistoryError::Corrupt)?;
                Ok(ChatMessage::new(role, row.get::<String, _>("content")))
            })
            .collect()
    }

    async fn append(&self, session: &str, message: &ChatMessage) -> Result<(), HistoryError> {
        sqlx::query(
            r#"
            INSERT INTO messages (session, role, content, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(session)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(Self::to_naive(Utc::now()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn clear(&self, session: &str) -> Result<(), HistoryError> {
        sqlx::query("DELETE FROM messages WHERE session = ?1")
            .bind(session)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn sessions(&self) -> Result<Vec<String>, HistoryError> {
        let rows = sqlx::query("SELECT DISTINCT session FROM messages ORDER BY session")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("session")).collect())
    }
}
