//! Plain text transforms

use crate::core::error::ExecutionResult;
use crate::core::step::Step;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct Uppercase {
    name: String,
}

impl Uppercase {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Step<String, String> for Uppercase {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: String) -> ExecutionResult<String> {
        Ok(input.to_uppercase())
    }
}

/// Prefixes text with its whitespace-separated word count
#[derive(Debug, Clone)]
pub struct WordCount {
    name: String,
}

impl WordCount {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Step<String, String> for WordCount {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: String) -> ExecutionResult<String> {
        let count = input.split_whitespace().count();
        Ok(format!("Total word count {}\n{}", count, input))
    }
}
