//! Test: Chat history - conversations resume from stored messages

use crate::helpers::*;
use promptchain::chat::ChatSession;
use promptchain::core::Role;
use promptchain::persistence::{InMemoryHistory, MessageHistory};
use std::sync::Arc;

#[tokio::test]
async fn test_session_resumes_with_history() {
    let history: Arc<dyn MessageHistory> = Arc::new(InMemoryHistory::new());

    let first = Arc::new(ScriptedProvider::new(["81"]));
    let session = ChatSession::start(first, Arc::clone(&history), "math", Some("You are a math tutor"))
        .await
        .unwrap();
    assert_eq!(session.send("What is 81 divided by 9?").await.unwrap(), "81");

    // a new session over the same history sees the earlier turns
    let second = Arc::new(ScriptedProvider::new(["9"]));
    let resumed = ChatSession::start(second.clone(), Arc::clone(&history), "math", Some("ignored"))
        .await
        .unwrap();
    resumed.send("And the square root?").await.unwrap();

    let sent = &second.received()[0];
    assert_eq!(sent.len(), 4);
    assert_eq!(sent[0].role, Role::System);
    assert_eq!(sent[0].content, "You are a math tutor");
    assert_eq!(sent[2].role, Role::Assistant);
    assert_eq!(sent[3].content, "And the square root?");

    assert_eq!(resumed.transcript().await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_failed_turn_is_not_recorded() {
    let history: Arc<dyn MessageHistory> = Arc::new(InMemoryHistory::new());
    let session = ChatSession::start(Arc::new(FailingProvider(503)), Arc::clone(&history), "s", None)
        .await
        .unwrap();

    assert!(session.send("hello").await.is_err());
    assert!(history.messages("s").await.unwrap().is_empty());
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn test_sqlite_history_persists_across_connections() {
    use promptchain::persistence::SqliteHistory;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.db");

    {
        let history: Arc<dyn MessageHistory> = Arc::new(SqliteHistory::new(&path).await.unwrap());
        let session = ChatSession::start(
            Arc::new(ScriptedProvider::new(["Hi there"])),
            history,
            "greeting",
            None,
        )
        .await
        .unwrap();
        session.send("Hello").await.unwrap();
    }

    let history = SqliteHistory::new(&path).await.unwrap();
    let messages = history.messages("greeting").await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::Human);
    assert_eq!(messages[1].content, "Hi there");
    assert_eq!(history.sessions().await.unwrap(), vec!["greeting".to_string()]);
}
