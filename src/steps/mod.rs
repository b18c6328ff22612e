//! Building-block steps for prompt chains

pub mod classify;
pub mod completion;
pub mod parse;
pub mod prompt;
pub mod retrieve;
pub mod text;

pub use classify::Classifier;
pub use completion::CompletionStep;
pub use parse::{ContentParser, JoinStep};
pub use prompt::TemplateStep;
pub use retrieve::{ContextStep, RetrieveStep};
pub use text::{Uppercase, WordCount};
