//! Reply parsing and branch joining

use crate::core::error::{ChainError, ExecutionResult};
use crate::core::message::ChatMessage;
use crate::core::parallel::BranchResults;
use crate::core::step::Step;
use crate::core::template::{self, TemplateError, Variables};
use async_trait::async_trait;
use std::fmt::Display;

/// Extracts the text content of a model reply
#[derive(Debug, Clone)]
pub struct ContentParser {
    name: String,
}

impl ContentParser {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for ContentParser {
    fn default() -> Self {
        Self::new("parse")
    }
}

#[async_trait]
impl Step<ChatMessage, String> for ContentParser {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: ChatMessage) -> ExecutionResult<String> {
        Ok(input.content)
    }
}

/// Combines parallel branch outputs into one text via `{branch}` placeholders
///
/// Only branches referenced by the template must have succeeded.
#[derive(Debug, Clone)]
pub struct JoinStep {
    name: String,
    template: String,
}

impl JoinStep {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
        }
    }
}

#[async_trait]
impl<O> Step<BranchResults<O>, String> for JoinStep
where
    O: Display + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: BranchResults<O>) -> ExecutionResult<String> {
        let mut variables = Variables::new();
        for branch in template::placeholders(&self.template) {
            match input.get(&branch) {
                Some(Ok(output)) => {
                    variables.insert(branch, output.to_string());
                }
                Some(Err(e)) => {
                    return Err(ChainError::Branch {
                        source: Box::new(e.clone()),
                        branch,
                    })
                }
                None => return Err(TemplateError::MissingVariable(branch).into()),
            }
        }
        Ok(template::render(&self.template, &variables)?)
    }
}
