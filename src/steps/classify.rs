//! Label classification of model output

use crate::core::error::{ChainError, ConfigurationError, ExecutionResult};
use crate::core::step::Step;
use async_trait::async_trait;
use tracing::debug;

/// Maps free-form model output onto one label of a fixed set
///
/// The first declared label contained in the output (case-insensitive) wins.
#[derive(Debug, Clone)]
pub struct Classifier {
    name: String,
    labels: Vec<String>,
    fallback: Option<String>,
}

impl Classifier {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        labels: impl IntoIterator<Item = S>,
    ) -> Result<Self, ConfigurationError> {
        let name = name.into();
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(ConfigurationError::Invalid(format!(
                "classifier '{}' has no labels",
                name
            )));
        }
        Ok(Self {
            name,
            labels,
            fallback: None,
        })
    }

    /// Label used when no declared label appears in the output
    pub fn with_fallback(mut self, label: impl Into<String>) -> Self {
        self.fallback = Some(label.into());
        self
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn classify(&self, text: &str) -> Option<&str> {
        let normalized = text.trim().to_lowercase();
        self.labels
            .iter()
            .find(|label| normalized.contains(&label.to_lowercase()))
            .or(self.fallback.as_ref())
            .map(String::as_str)
    }
}

#[async_trait]
impl Step<String, String> for Classifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: String) -> ExecutionResult<String> {
        let label = self.classify(&input).ok_or_else(|| {
            ChainError::message(format!(
                "output '{}' matches none of: {}",
                input.trim(),
                self.labels.join(", ")
            ))
        })?;
        debug!("Classifier {} chose label: {}", self.name, label);
        Ok(label.to_string())
    }
}
