//! Error taxonomy for chain execution

use crate::core::payload::PayloadKind;
use crate::core::template::TemplateError;
use crate::provider::ProviderError;
use crate::retrieval::{SourceError, StoreError};
use thiserror::Error;

/// Outcome of running a pipeline, router or step
pub type ExecutionResult<T> = Result<T, ChainError>;

/// Errors raised while running a chain
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    /// A named step failed
    #[error("step '{step}' failed: {source}")]
    Step {
        step: String,
        #[source]
        source: Box<ChainError>,
    },

    /// A router condition could not be evaluated
    #[error("router '{router}' could not evaluate route '{route}': {source}")]
    Predicate {
        router: String,
        route: String,
        #[source]
        source: PredicateError,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Source(#[from] SourceError),

    /// Output of a parallel branch was required but the branch failed
    #[error("branch '{branch}' failed: {source}")]
    Branch {
        branch: String,
        #[source]
        source: Box<ChainError>,
    },

    #[error("expected {expected} payload, got {found}")]
    Payload {
        expected: PayloadKind,
        found: PayloadKind,
    },

    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl ChainError {
    pub fn message(message: impl Into<String>) -> Self {
        ChainError::Message(message.into())
    }

    /// Name of the failing step, when the error carries one
    pub fn failed_step(&self) -> Option<&str> {
        match self {
            ChainError::Step { step, .. } => Some(step),
            _ => None,
        }
    }

    /// Whether the error already identifies where it happened
    pub fn is_tagged(&self) -> bool {
        matches!(self, ChainError::Step { .. } | ChainError::Predicate { .. })
    }

    /// Attribute an untagged error to `step`; tagged errors pass through unchanged
    pub(crate) fn at_step(self, step: &str) -> Self {
        if self.is_tagged() {
            self
        } else {
            ChainError::Step {
                step: step.to_string(),
                source: Box::new(self),
            }
        }
    }

    /// Innermost error, skipping step and branch wrappers
    pub fn root_cause(&self) -> &ChainError {
        match self {
            ChainError::Step { source, .. } | ChainError::Branch { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }
}

/// Failure while evaluating a routing condition
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct PredicateError(pub String);

impl PredicateError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Problems detected while assembling a chain
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("pipeline '{0}' has no steps")]
    EmptyPipeline(String),

    #[error("parallel group '{0}' has no branches")]
    NoBranches(String),

    #[error("duplicate branch name '{0}'")]
    DuplicateBranch(String),

    #[error("duplicate route name '{0}'")]
    DuplicateRoute(String),

    #[error("step '{step}' expects {expected} input but receives {found}")]
    IncompatibleSteps {
        step: String,
        expected: PayloadKind,
        found: PayloadKind,
    },

    #[error("unknown template '{0}'")]
    UnknownTemplate(String),

    #[error("step '{step}' references '{{{placeholder}}}' which it never receives")]
    UnknownPlaceholder { step: String, placeholder: String },

    #[error("unknown chain '{0}'")]
    UnknownChain(String),

    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid chunking: {0}")]
    InvalidChunking(String),

    #[error("{0}")]
    Invalid(String),
}
