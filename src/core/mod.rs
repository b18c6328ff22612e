//! Core chain model
//!
//! Steps, the combinators that compose them (pipelines, parallel groups,
//! routers), the error taxonomy, and the YAML configuration that builds
//! chains declaratively.

pub mod builder;
pub mod condition;
pub mod config;
pub mod error;
pub mod message;
pub mod parallel;
pub mod payload;
pub mod pipeline;
pub mod router;
pub mod step;
pub mod template;

pub use condition::Condition;
pub use config::{AppConfig, StepSpec};
pub use error::{ChainError, ConfigurationError, ExecutionResult, PredicateError};
pub use message::{ChatMessage, Role};
pub use parallel::{BranchResults, ParallelGroup};
pub use payload::{Payload, PayloadKind};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use router::{predicate_fn, Predicate, Router};
pub use step::{step_fn, FnStep, Step};
pub use template::{PromptTemplate, TemplateError, Variables};
