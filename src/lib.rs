//! promptchain - Composable prompt chains, routing and retrieval for LLM workflows

pub mod agent;
pub mod chat;
pub mod cli;
pub mod core;
pub mod persistence;
pub mod provider;
pub mod retrieval;
pub mod steps;

// Re-export commonly used types
pub use agent::{AgentError, AgentExecutor, Tool};
pub use chat::{ChatError, ChatSession};
pub use core::{AppConfig, ChainError, ConfigurationError, ExecutionResult, Payload};
pub use core::{ParallelGroup, Pipeline, PipelineBuilder, Router, Step};
pub use provider::{CompletionProvider, EmbeddingProvider, ProviderError};
pub use retrieval::{SimilarityStore, TextChunker};
