//! Concurrent fan-out of sub-pipelines over a shared input

use crate::core::error::{ChainError, ConfigurationError, ExecutionResult};
use crate::core::pipeline::Pipeline;
use crate::core::step::Step;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use tokio::task::JoinHandle;
use tracing::debug;

/// Outcome of every branch, keyed by branch name
pub type BranchResults<O> = BTreeMap<String, ExecutionResult<O>>;

/// Named pipelines that each receive a clone of the same input
pub struct ParallelGroup<I, O> {
    name: String,
    branches: Vec<(String, Pipeline<I, O>)>,
}

impl<I, O> Clone for ParallelGroup<I, O> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            branches: self.branches.clone(),
        }
    }
}

impl<I, O> ParallelGroup<I, O> {
    pub fn builder(name: impl Into<String>) -> ParallelGroupBuilder<I, O> {
        ParallelGroupBuilder {
            name: name.into(),
            branches: Vec::new(),
        }
    }

    pub fn branch_names(&self) -> impl Iterator<Item = &str> {
        self.branches.iter().map(|(name, _)| name.as_str())
    }
}

impl<I, O> ParallelGroup<I, O>
where
    I: Clone + Send + 'static,
    O: Send + 'static,
{
    /// Run all branches concurrently and wait for every one of them
    ///
    /// A failing or panicking branch is recorded in its slot and never
    /// cancels its siblings.
    pub async fn run(&self, input: I) -> BranchResults<O> {
        debug!(
            "Starting parallel group {} with {} branches",
            self.name,
            self.branches.len()
        );

        let handles: Vec<(String, JoinHandle<ExecutionResult<O>>)> = self
            .branches
            .iter()
            .map(|(name, pipeline)| {
                let pipeline = pipeline.clone();
                let input = input.clone();
                let handle = tokio::spawn(async move { pipeline.run(input).await });
                (name.clone(), handle)
            })
            .collect();

        let mut results = BTreeMap::new();
        for (name, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(ChainError::message(format!("branch task aborted: {}", e))
                    .at_step(&name)),
            };
            debug!("Branch {} finished (ok: {})", name, result.is_ok());
            results.insert(name, result);
        }
        results
    }
}

#[async_trait]
impl<I, O> Step<I, BranchResults<O>> for ParallelGroup<I, O>
where
    I: Clone + Send + 'static,
    O: Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: I) -> ExecutionResult<BranchResults<O>> {
        Ok(self.run(input).await)
    }
}

pub struct ParallelGroupBuilder<I, O> {
    name: String,
    branches: Vec<(String, Pipeline<I, O>)>,
}

impl<I, O> ParallelGroupBuilder<I, O> {
    pub fn branch(mut self, name: impl Into<String>, pipeline: Pipeline<I, O>) -> Self {
        self.branches.push((name.into(), pipeline));
        self
    }

    pub fn build(self) -> Result<ParallelGroup<I, O>, ConfigurationError> {
        if self.branches.is_empty() {
            return Err(ConfigurationError::NoBranches(self.name));
        }
        let mut seen = HashSet::new();
        for (name, _) in &self.branches {
            if !seen.insert(name.as_str()) {
                return Err(ConfigurationError::DuplicateBranch(name.clone()));
            }
        }
        Ok(ParallelGroup {
            name: self.name,
            branches: self.branches,
        })
    }
}
