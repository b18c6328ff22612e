//! Tool-using agent loop over the ReAct text protocol

pub mod react;
pub mod tools;

pub use react::AgentAction;
pub use tools::CurrentTimeTool;

use crate::core::error::{ChainError, ExecutionResult};
use crate::core::message::ChatMessage;
use crate::core::step::Step;
use crate::core::template::{self, Variables};
use crate::provider::{CompletionProvider, ProviderError};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_MAX_ITERATIONS: usize = 5;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ToolError(pub String);

/// Error types for agent operations
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("tool '{tool}' failed: {source}")]
    Tool {
        tool: String,
        #[source]
        source: ToolError,
    },

    #[error("could not parse model output: {0}")]
    Parse(String),

    #[error("agent stopped after {0} iterations without a final answer")]
    MaxIterations(usize),
}

impl From<AgentError> for ChainError {
    fn from(e: AgentError) -> Self {
        match e {
            AgentError::Provider(source) => ChainError::Provider(source),
            other => ChainError::message(other.to_string()),
        }
    }
}

/// A capability the agent may invoke by name
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn call(&self, input: &str) -> Result<String, ToolError>;
}

/// One tool invocation made while answering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentStep {
    pub tool: String,
    pub input: String,
    pub observation: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentOutcome {
    pub answer: String,
    pub steps: Vec<AgentStep>,
}

/// Alternates model turns and tool calls until a final answer appears
pub struct AgentExecutor {
    name: String,
    provider: Arc<dyn CompletionProvider>,
    tools: Vec<Arc<dyn Tool>>,
    max_iterations: usize,
}

impl AgentExecutor {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            name: "agent".to_string(),
            provider,
            tools: Vec::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    fn tool_names(&self) -> String {
        self.tools
            .iter()
            .map(|tool| tool.name())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn render_prompt(&self, question: &str, scratchpad: &str) -> String {
        let mut variables = Variables::new();
        variables.insert(
            "tools".to_string(),
            self.tools
                .iter()
                .map(|tool| format!("{}: {}", tool.name(), tool.description()))
                .collect::<Vec<_>>()
                .join("\n"),
        );
        variables.insert("tool_names".to_string(), self.tool_names());
        variables.insert("input".to_string(), question.to_string());
        variables.insert("agent_scratchpad".to_string(), scratchpad.to_string());
        // Every placeholder of the fixed prompt is supplied above
        template::render(react::PROMPT, &variables).unwrap_or_default()
    }

    async fn observe(&self, tool: &str, input: &str) -> Result<String, AgentError> {
        match self.tools.iter().find(|t| t.name() == tool) {
            Some(found) => found.call(input).await.map_err(|source| AgentError::Tool {
                tool: tool.to_string(),
                source,
            }),
            None => Ok(format!(
                "{} is not a valid tool, try one of [{}].",
                tool,
                self.tool_names()
            )),
        }
    }

    /// Answer `question`, calling tools as the model requests
    pub async fn run(&self, question: &str) -> Result<AgentOutcome, AgentError> {
        let mut scratchpad = String::new();
        let mut steps = Vec::new();

        for iteration in 1..=self.max_iterations {
            let prompt = self.render_prompt(question, &scratchpad);
            let reply = self.provider.complete(&[ChatMessage::human(prompt)]).await?;
            let reply = react::truncate_at_observation(&reply);
            debug!("Agent iteration {}: {}", iteration, reply);

            match react::parse_reply(reply) {
                Some(AgentAction::Finish(answer)) => {
                    info!("Agent finished after {} iterations", iteration);
                    return Ok(AgentOutcome { answer, steps });
                }
                Some(AgentAction::Tool { tool, input }) => {
                    let observation = self.observe(&tool, &input).await?;
                    scratchpad.push_str(reply);
                    scratchpad.push_str("\nObservation: ");
                    scratchpad.push_str(&observation);
                    scratchpad.push_str("\nThought: ");
                    steps.push(AgentStep {
                        tool,
                        input,
                        observation,
                    });
                }
                None => return Err(AgentError::Parse(reply.to_string())),
            }
        }

        Err(AgentError::MaxIterations(self.max_iterations))
    }
}

#[async_trait]
impl Step<String, String> for AgentExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: String) -> ExecutionResult<String> {
        Ok(self.run(&input).await?.answer)
    }
}
