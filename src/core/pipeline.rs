//! Sequential pipeline of typed steps

use crate::core::error::{ConfigurationError, ExecutionResult};
use crate::core::step::Step;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Type-erased prefix of a pipeline: everything up to the last added step
#[async_trait]
trait Chain<I, O>: Send + Sync {
    async fn run(&self, input: I) -> ExecutionResult<O>;
}

struct Start;

#[async_trait]
impl<I: Send + 'static> Chain<I, I> for Start {
    async fn run(&self, input: I) -> ExecutionResult<I> {
        Ok(input)
    }
}

struct Link<I, M, O> {
    prev: Arc<dyn Chain<I, M>>,
    step: Arc<dyn Step<M, O>>,
}

#[async_trait]
impl<I, M, O> Chain<I, O> for Link<I, M, O>
where
    I: Send + 'static,
    M: Send + 'static,
    O: Send + 'static,
{
    async fn run(&self, input: I) -> ExecutionResult<O> {
        let intermediate = self.prev.run(input).await?;
        let name = self.step.name();
        debug!("Running step: {}", name);
        self.step
            .execute(intermediate)
            .await
            .map_err(|e| e.at_step(name))
    }
}

/// An ordered, non-empty sequence of steps
pub struct Pipeline<I, O> {
    name: String,
    steps: Vec<String>,
    head: Arc<dyn Chain<I, O>>,
}

impl<I, O> Clone for Pipeline<I, O> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            steps: self.steps.clone(),
            head: Arc::clone(&self.head),
        }
    }
}

impl<I, O> fmt::Debug for Pipeline<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("steps", &self.steps)
            .finish()
    }
}

impl<I: Send + 'static> Pipeline<I, I> {
    pub fn builder(name: impl Into<String>) -> PipelineBuilder<I, I> {
        PipelineBuilder {
            name: name.into(),
            steps: Vec::new(),
            head: Arc::new(Start),
        }
    }
}

impl<I, O> Pipeline<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Run every step in order, stopping at the first failure
    pub async fn run(&self, input: I) -> ExecutionResult<O> {
        debug!("Running pipeline: {}", self.name);
        self.head.run(input).await
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn step_names(&self) -> &[String] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[async_trait]
impl<I, O> Step<I, O> for Pipeline<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: I) -> ExecutionResult<O> {
        self.run(input).await
    }
}

/// Builds a pipeline one step at a time; adjacent types must line up
pub struct PipelineBuilder<I, O> {
    name: String,
    steps: Vec<String>,
    head: Arc<dyn Chain<I, O>>,
}

impl<I, O> PipelineBuilder<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    pub fn then<N, S>(self, step: S) -> PipelineBuilder<I, N>
    where
        N: Send + 'static,
        S: Step<O, N> + 'static,
    {
        self.then_arc(Arc::new(step))
    }

    pub fn then_arc<N>(mut self, step: Arc<dyn Step<O, N>>) -> PipelineBuilder<I, N>
    where
        N: Send + 'static,
    {
        self.steps.push(step.name().to_string());
        PipelineBuilder {
            name: self.name,
            steps: self.steps,
            head: Arc::new(Link {
                prev: self.head,
                step,
            }),
        }
    }

    pub fn build(self) -> Result<Pipeline<I, O>, ConfigurationError> {
        if self.steps.is_empty() {
            return Err(ConfigurationError::EmptyPipeline(self.name));
        }
        Ok(Pipeline {
            name: self.name,
            steps: self.steps,
            head: self.head,
        })
    }
}
