//! Dynamic values flowing through declaratively built chains

use crate::core::error::{ChainError, ExecutionResult};
use crate::core::message::ChatMessage;
use crate::core::parallel::BranchResults;
use crate::core::template::Variables;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape of a payload, checked when a declarative chain is built
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    Variables,
    Conversation,
    Message,
    Text,
    Branches,
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PayloadKind::Variables => "variables",
            PayloadKind::Conversation => "conversation",
            PayloadKind::Message => "message",
            PayloadKind::Text => "text",
            PayloadKind::Branches => "branches",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub enum Payload {
    Variables(Variables),
    Conversation(Vec<ChatMessage>),
    Message(ChatMessage),
    Text(String),
    Branches(BranchResults<Payload>),
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Variables(_) => PayloadKind::Variables,
            Payload::Conversation(_) => PayloadKind::Conversation,
            Payload::Message(_) => PayloadKind::Message,
            Payload::Text(_) => PayloadKind::Text,
            Payload::Branches(_) => PayloadKind::Branches,
        }
    }

    fn mismatch(&self, expected: PayloadKind) -> ChainError {
        ChainError::Payload {
            expected,
            found: self.kind(),
        }
    }

    pub fn into_variables(self) -> ExecutionResult<Variables> {
        match self {
            Payload::Variables(vars) => Ok(vars),
            other => Err(other.mismatch(PayloadKind::Variables)),
        }
    }

    pub fn into_conversation(self) -> ExecutionResult<Vec<ChatMessage>> {
        match self {
            Payload::Conversation(messages) => Ok(messages),
            other => Err(other.mismatch(PayloadKind::Conversation)),
        }
    }

    pub fn into_message(self) -> ExecutionResult<ChatMessage> {
        match self {
            Payload::Message(message) => Ok(message),
            other => Err(other.mismatch(PayloadKind::Message)),
        }
    }

    pub fn into_text(self) -> ExecutionResult<String> {
        match self {
            Payload::Text(text) => Ok(text),
            other => Err(other.mismatch(PayloadKind::Text)),
        }
    }

    pub fn into_branches(self) -> ExecutionResult<BranchResults<Payload>> {
        match self {
            Payload::Branches(branches) => Ok(branches),
            other => Err(other.mismatch(PayloadKind::Branches)),
        }
    }

    /// Human-readable rendering used by the CLI
    pub fn render(&self) -> String {
        match self {
            Payload::Variables(vars) => vars
                .iter()
                .map(|(k, v)| format!("{} = {}", k, v))
                .collect::<Vec<_>>()
                .join("\n"),
            Payload::Conversation(messages) => messages
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n"),
            Payload::Message(message) => message.content.clone(),
            Payload::Text(text) => text.clone(),
            Payload::Branches(branches) => branches
                .iter()
                .map(|(name, result)| match result {
                    Ok(payload) => format!("[{}]\n{}", name, payload.render()),
                    Err(e) => format!("[{}] failed: {}", name, e),
                })
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<Variables> for Payload {
    fn from(vars: Variables) -> Self {
        Payload::Variables(vars)
    }
}
