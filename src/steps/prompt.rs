//! Template formatting step

use crate::core::error::ExecutionResult;
use crate::core::message::ChatMessage;
use crate::core::step::Step;
use crate::core::template::{PromptTemplate, Variables};
use async_trait::async_trait;

/// Variable used when a template step receives plain text
pub const DEFAULT_BINDING: &str = "input";

/// Formats a chat template into a conversation
///
/// Accepts either a variable map or plain text; plain text is bound to a
/// single variable (`input` unless configured otherwise).
#[derive(Debug, Clone)]
pub struct TemplateStep {
    name: String,
    template: PromptTemplate,
    bind: String,
}

impl TemplateStep {
    pub fn new(name: impl Into<String>, template: PromptTemplate) -> Self {
        Self {
            name: name.into(),
            template,
            bind: DEFAULT_BINDING.to_string(),
        }
    }

    pub fn bind(mut self, variable: impl Into<String>) -> Self {
        self.bind = variable.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    fn format_text(&self, text: String) -> ExecutionResult<Vec<ChatMessage>> {
        let mut variables = Variables::new();
        variables.insert(self.bind.clone(), text);
        Ok(self.template.format(&variables)?)
    }
}

#[async_trait]
impl Step<Variables, Vec<ChatMessage>> for TemplateStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: Variables) -> ExecutionResult<Vec<ChatMessage>> {
        Ok(self.template.format(&input)?)
    }
}

#[async_trait]
impl Step<String, Vec<ChatMessage>> for TemplateStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: String) -> ExecutionResult<Vec<ChatMessage>> {
        self.format_text(input)
    }
}
