//! Step abstraction

use crate::core::error::ExecutionResult;
use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;

/// A named transformation from `I` to `O`
#[async_trait]
pub trait Step<I, O>: Send + Sync {
    /// Name used to attribute failures
    fn name(&self) -> &str;

    async fn execute(&self, input: I) -> ExecutionResult<O>;
}

/// Step backed by an async closure
pub struct FnStep<F, I, O> {
    name: String,
    func: F,
    _types: PhantomData<fn(I) -> O>,
}

/// Wrap an async closure as a step
pub fn step_fn<F, Fut, I, O>(name: impl Into<String>, func: F) -> FnStep<F, I, O>
where
    F: Fn(I) -> Fut + Send + Sync,
    Fut: Future<Output = ExecutionResult<O>> + Send,
{
    FnStep {
        name: name.into(),
        func,
        _types: PhantomData,
    }
}

#[async_trait]
impl<F, Fut, I, O> Step<I, O> for FnStep<F, I, O>
where
    F: Fn(I) -> Fut + Send + Sync,
    Fut: Future<Output = ExecutionResult<O>> + Send,
    I: Send + 'static,
    O: Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: I) -> ExecutionResult<O> {
        (self.func)(input).await
    }
}
