//! Conditional dispatch to one of several pipelines

use crate::core::error::{ChainError, ConfigurationError, ExecutionResult, PredicateError};
use crate::core::pipeline::Pipeline;
use crate::core::step::Step;
use async_trait::async_trait;
use std::collections::HashSet;
use std::marker::PhantomData;
use tracing::debug;

/// Pure test deciding whether a route applies to an input
pub trait Predicate<I>: Send + Sync {
    fn evaluate(&self, input: &I) -> Result<bool, PredicateError>;
}

pub struct FnPredicate<F, I> {
    func: F,
    _input: PhantomData<fn(&I)>,
}

/// Wrap a closure as a predicate
pub fn predicate_fn<F, I>(func: F) -> FnPredicate<F, I>
where
    F: Fn(&I) -> Result<bool, PredicateError> + Send + Sync,
{
    FnPredicate {
        func,
        _input: PhantomData,
    }
}

impl<F, I> Predicate<I> for FnPredicate<F, I>
where
    F: Fn(&I) -> Result<bool, PredicateError> + Send + Sync,
{
    fn evaluate(&self, input: &I) -> Result<bool, PredicateError> {
        (self.func)(input)
    }
}

struct Route<I, O> {
    name: String,
    predicate: Box<dyn Predicate<I>>,
    pipeline: Pipeline<I, O>,
}

/// Ordered routes plus a mandatory default; the first matching route wins
pub struct Router<I, O> {
    name: String,
    routes: Vec<Route<I, O>>,
    default: Pipeline<I, O>,
}

impl<I, O> Router<I, O> {
    pub fn builder(name: impl Into<String>) -> RouterBuilder<I, O> {
        RouterBuilder {
            name: name.into(),
            routes: Vec::new(),
        }
    }

    pub fn route_names(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|r| r.name.as_str())
    }

    /// Pick the pipeline for `input`, evaluating predicates in order
    pub fn select(&self, input: &I) -> ExecutionResult<(&str, &Pipeline<I, O>)> {
        for route in &self.routes {
            let matched = route
                .predicate
                .evaluate(input)
                .map_err(|source| ChainError::Predicate {
                    router: self.name.clone(),
                    route: route.name.clone(),
                    source,
                })?;
            if matched {
                return Ok((&route.name, &route.pipeline));
            }
        }
        Ok(("default", &self.default))
    }
}

impl<I, O> Router<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    pub async fn run(&self, input: I) -> ExecutionResult<O> {
        let (route, pipeline) = self.select(&input)?;
        debug!("Router {} selected route: {}", self.name, route);
        pipeline.run(input).await
    }
}

#[async_trait]
impl<I, O> Step<I, O> for Router<I, O>
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

pub struct RouterBuilder<I, O> {
    name: String,
    routes: Vec<Route<I, O>>,
}

impl<I, O> RouterBuilder<I, O> {
    pub fn route<P>(mut self, name: impl Into<String>, predicate: P, pipeline: Pipeline<I, O>) -> Self
    where
        P: Predicate<I> + 'static,
    {
        self.routes.push(Route {
            name: name.into(),
            predicate: Box::new(predicate),
            pipeline,
        });
        self
    }

    /// Finish with the pipeline used when no route matches
    pub fn default(self, pipeline: Pipeline<I, O>) -> Result<Router<I, O>, ConfigurationError> {
        let mut seen = HashSet::new();
        for route in &self.routes {
            if !seen.insert(route.name.as_str()) {
                return Err(ConfigurationError::DuplicateRoute(route.name.clone()));
            }
        }
        Ok(Router {
            name: self.name,
            routes: self.routes,
            default: pipeline,
        })
    }
}
