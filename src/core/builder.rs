//! Assembles declarative step specs into payload pipelines

use crate::core::condition::Condition;
use crate::core::config::{RouteSpec, StepSpec};
use crate::core::error::{ChainError, ConfigurationError, ExecutionResult, PredicateError};
use crate::core::message::ChatMessage;
use crate::core::parallel::{BranchResults, ParallelGroup};
use crate::core::payload::{Payload, PayloadKind};
use crate::core::pipeline::Pipeline;
use crate::core::router::{Predicate, Router};
use crate::core::step::Step;
use crate::core::template::{self, PromptTemplate, TemplateConfig, Variables};
use crate::provider::CompletionProvider;
use crate::steps::prompt::DEFAULT_BINDING;
use crate::steps::{
    Classifier, CompletionStep, ContentParser, JoinStep, TemplateStep, Uppercase, WordCount,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

type PayloadStep = Arc<dyn Step<Payload, Payload>>;

/// Runs a typed step on the payload variant it expects
struct Adapted<S, I, O> {
    step: S,
    input: fn(Payload) -> ExecutionResult<I>,
    output: fn(O) -> Payload,
}

#[async_trait]
impl<S, I, O> Step<Payload, Payload> for Adapted<S, I, O>
where
    S: Step<I, O>,
    I: Send + 'static,
    O: Send + 'static,
{
    fn name(&self) -> &str {
        self.step.name()
    }

    async fn execute(&self, input: Payload) -> ExecutionResult<Payload> {
        let input = (self.input)(input)?;
        let output = self.step.execute(input).await?;
        Ok((self.output)(output))
    }
}

fn adapt<S, I, O>(
    step: S,
    input: fn(Payload) -> ExecutionResult<I>,
    output: fn(O) -> Payload,
) -> PayloadStep
where
    S: Step<I, O> + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    Arc::new(Adapted {
        step,
        input,
        output,
    })
}

fn passthrough(payload: Payload) -> ExecutionResult<Payload> {
    Ok(payload)
}

/// Every placeholder must be one of `known`
fn check_placeholders<'s>(
    step: &str,
    placeholders: impl IntoIterator<Item = String>,
    known: impl IntoIterator<Item = &'s str> + Clone,
) -> Result<(), ConfigurationError> {
    for placeholder in placeholders {
        if !known.clone().into_iter().any(|k| k == placeholder) {
            return Err(ConfigurationError::UnknownPlaceholder {
                step: step.to_string(),
                placeholder,
            });
        }
    }
    Ok(())
}

fn expect_kind(step: &str, expected: PayloadKind, found: PayloadKind) -> Result<(), ConfigurationError> {
    if expected == found {
        Ok(())
    } else {
        Err(ConfigurationError::IncompatibleSteps {
            step: step.to_string(),
            expected,
            found,
        })
    }
}

/// Runs a sub-chain on the variables and stores its text output under `key`
struct AssignStep {
    name: String,
    key: String,
    pipeline: Pipeline<Payload, Payload>,
}

#[async_trait]
impl Step<Payload, Payload> for AssignStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: Payload) -> ExecutionResult<Payload> {
        let mut variables = input.into_variables()?;
        let value = self
            .pipeline
            .run(Payload::Variables(variables.clone()))
            .await?
            .into_text()?;
        variables.insert(self.key.clone(), value);
        Ok(Payload::Variables(variables))
    }
}

/// Classifies one variable and stores the label in another
struct ClassifyField {
    classifier: Classifier,
    on: String,
    into: String,
}

#[async_trait]
impl Step<Payload, Payload> for ClassifyField {
    fn name(&self) -> &str {
        Step::<String, String>::name(&self.classifier)
    }

    async fn execute(&self, input: Payload) -> ExecutionResult<Payload> {
        let mut variables = input.into_variables()?;
        let text = variables
            .get(&self.on)
            .cloned()
            .ok_or_else(|| ChainError::message(format!("missing variable '{}'", self.on)))?;
        let label = self.classifier.execute(text).await?;
        variables.insert(self.into.clone(), label);
        Ok(Payload::Variables(variables))
    }
}

/// Condition on the text payload, or on one variable when `field` is set
struct FieldCondition {
    field: Option<String>,
    condition: Condition,
}

impl Predicate<Payload> for FieldCondition {
    fn evaluate(&self, input: &Payload) -> Result<bool, PredicateError> {
        match (&self.field, input) {
            (None, Payload::Text(text)) => self.condition.matches(text),
            (Some(field), Payload::Variables(variables)) => match variables.get(field) {
                Some(value) => self.condition.matches(value),
                None => Err(PredicateError::new(format!("missing variable '{}'", field))),
            },
            (_, other) => Err(PredicateError::new(format!(
                "cannot evaluate condition on {} payload",
                other.kind()
            ))),
        }
    }
}

/// Turns `StepSpec` lists into `Pipeline<Payload, Payload>`, checking that
/// every step accepts what its predecessor produces
pub struct ChainBuilder<'a> {
    templates: &'a BTreeMap<String, TemplateConfig>,
    provider: Arc<dyn CompletionProvider>,
}

impl<'a> ChainBuilder<'a> {
    pub fn new(
        templates: &'a BTreeMap<String, TemplateConfig>,
        provider: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self {
            templates,
            provider,
        }
    }

    /// Build a pipeline named `path`; returns it with its output kind
    pub fn build_pipeline(
        &self,
        path: &str,
        specs: &[StepSpec],
        input: PayloadKind,
    ) -> Result<(Pipeline<Payload, Payload>, PayloadKind), ConfigurationError> {
        let mut builder = Pipeline::<Payload, Payload>::builder(path);
        let mut kind = input;
        // Branch names produced by the previous step, when it is a parallel group
        let mut branches: Option<Vec<&str>> = None;
        for (index, spec) in specs.iter().enumerate() {
            let name = format!("{}/{}:{}", path, index, spec.kind_name());
            let (step, output) = self.build_step(&name, spec, kind)?;
            if let (StepSpec::Join { template: join }, Some(known)) = (spec, &branches) {
                check_placeholders(&name, template::placeholders(join), known.iter().copied())?;
            }
            branches = match spec {
                StepSpec::Parallel { branches } => Some(branches.keys().map(String::as_str).collect()),
                _ => None,
            };
            builder = builder.then_arc(step);
            kind = output;
        }
        Ok((builder.build()?, kind))
    }

    fn build_step(
        &self,
        name: &str,
        spec: &StepSpec,
        input: PayloadKind,
    ) -> Result<(PayloadStep, PayloadKind), ConfigurationError> {
        match spec {
            StepSpec::Prompt { template, bind } => self.prompt(name, template, bind.as_deref(), input),
            StepSpec::Complete { timeout_secs } => {
                expect_kind(name, PayloadKind::Conversation, input)?;
                let mut step = CompletionStep::new(name, Arc::clone(&self.provider));
                if let Some(secs) = timeout_secs {
                    step = step.with_timeout(Duration::from_secs(*secs));
                }
                let step = adapt::<_, Vec<ChatMessage>, ChatMessage>(
                    step,
                    Payload::into_conversation,
                    Payload::Message,
                );
                Ok((step, PayloadKind::Message))
            }
            StepSpec::Parse => {
                expect_kind(name, PayloadKind::Message, input)?;
                let step = adapt::<_, ChatMessage, String>(
                    ContentParser::new(name),
                    Payload::into_message,
                    Payload::Text,
                );
                Ok((step, PayloadKind::Text))
            }
            StepSpec::Uppercase => {
                expect_kind(name, PayloadKind::Text, input)?;
                let step = adapt::<_, String, String>(Uppercase::new(name), Payload::into_text, Payload::Text);
                Ok((step, PayloadKind::Text))
            }
            StepSpec::WordCount => {
                expect_kind(name, PayloadKind::Text, input)?;
                let step = adapt::<_, String, String>(WordCount::new(name), Payload::into_text, Payload::Text);
                Ok((step, PayloadKind::Text))
            }
            StepSpec::Parallel { branches } => self.parallel(name, branches, input),
            StepSpec::Join { template } => {
                expect_kind(name, PayloadKind::Branches, input)?;
                let step = adapt::<_, BranchResults<Payload>, String>(
                    JoinStep::new(name, template.as_str()),
                    Payload::into_branches,
                    Payload::Text,
                );
                Ok((step, PayloadKind::Text))
            }
            StepSpec::Assign { key, steps } => {
                expect_kind(name, PayloadKind::Variables, input)?;
                let (pipeline, output) = self.build_pipeline(name, steps, PayloadKind::Variables)?;
                expect_kind(name, PayloadKind::Text, output)?;
                let step = AssignStep {
                    name: name.to_string(),
                    key: key.clone(),
                    pipeline,
                };
                Ok((Arc::new(step), PayloadKind::Variables))
            }
            StepSpec::Route { on, routes, default } => {
                self.route(name, on.as_deref(), routes, default, input)
            }
            StepSpec::Classify {
                labels,
                on,
                into,
                fallback,
            } => {
                let mut classifier = Classifier::new(name, labels.iter().cloned())?;
                if let Some(fallback) = fallback {
                    classifier = classifier.with_fallback(fallback.as_str());
                }
                match (input, on) {
                    (PayloadKind::Text, None) if into.is_none() => {
                        let step = adapt::<_, String, String>(classifier, Payload::into_text, Payload::Text);
                        Ok((step, PayloadKind::Text))
                    }
                    (PayloadKind::Variables, Some(on)) => {
                        let step = ClassifyField {
                            classifier,
                            on: on.clone(),
                            into: into.clone().unwrap_or_else(|| on.clone()),
                        };
                        Ok((Arc::new(step), PayloadKind::Variables))
                    }
                    (PayloadKind::Variables, None) => Err(ConfigurationError::Invalid(format!(
                        "step '{}' classifies variables and needs `on`",
                        name
                    ))),
                    (PayloadKind::Text, Some(_)) | (PayloadKind::Text, None) => {
                        Err(ConfigurationError::Invalid(format!(
                            "step '{}' classifies text; `on` and `into` apply to variables only",
                            name
                        )))
                    }
                    (found, _) => Err(ConfigurationError::IncompatibleSteps {
                        step: name.to_string(),
                        expected: PayloadKind::Text,
                        found,
                    }),
                }
            }
        }
    }

    fn prompt(
        &self,
        name: &str,
        template: &str,
        bind: Option<&str>,
        input: PayloadKind,
    ) -> Result<(PayloadStep, PayloadKind), ConfigurationError> {
        let config = self
            .templates
            .get(template)
            .ok_or_else(|| ConfigurationError::UnknownTemplate(template.to_string()))?;
        let prompt = PromptTemplate::from_config(config);
        if input == PayloadKind::Text {
            let bound = bind.unwrap_or(DEFAULT_BINDING);
            check_placeholders(name, prompt.variables(), [bound])?;
        }
        let mut step = TemplateStep::new(name, prompt);
        if let Some(bind) = bind {
            step = step.bind(bind);
        }

        let step = match input {
            PayloadKind::Variables => adapt::<_, Variables, Vec<ChatMessage>>(
                step,
                Payload::into_variables,
                Payload::Conversation,
            ),
            PayloadKind::Text => adapt::<_, String, Vec<ChatMessage>>(
                step,
                Payload::into_text,
                Payload::Conversation,
            ),
            found => {
                return Err(ConfigurationError::IncompatibleSteps {
                    step: name.to_string(),
                    expected: PayloadKind::Variables,
                    found,
                })
            }
        };
        Ok((step, PayloadKind::Conversation))
    }

    fn parallel(
        &self,
        name: &str,
        branches: &BTreeMap<String, Vec<StepSpec>>,
        input: PayloadKind,
    ) -> Result<(PayloadStep, PayloadKind), ConfigurationError> {
        let mut group = ParallelGroup::builder(name);
        for (branch, specs) in branches {
            let path = format!("{}.{}", name, branch);
            let (pipeline, _) = self.build_pipeline(&path, specs, input)?;
            group = group.branch(branch.as_str(), pipeline);
        }
        let step = adapt::<_, Payload, BranchResults<Payload>>(
            group.build()?,
            passthrough,
            Payload::Branches,
        );
        Ok((step, PayloadKind::Branches))
    }

    fn route(
        &self,
        name: &str,
        on: Option<&str>,
        routes: &[RouteSpec],
        default: &[StepSpec],
        input: PayloadKind,
    ) -> Result<(PayloadStep, PayloadKind), ConfigurationError> {
        match (input, on) {
            (PayloadKind::Text, None) | (PayloadKind::Variables, Some(_)) => {}
            (PayloadKind::Variables, None) => {
                return Err(ConfigurationError::Invalid(format!(
                    "step '{}' routes on variables and needs `on`",
                    name
                )))
            }
            (found, _) => {
                return Err(ConfigurationError::IncompatibleSteps {
                    step: name.to_string(),
                    expected: PayloadKind::Text,
                    found,
                })
            }
        }

        let (default, output) = self.build_pipeline(&format!("{}.default", name), default, input)?;
        let mut router = Router::builder(name);
        for route in routes {
            let path = format!("{}.{}", name, route.name);
            let (pipeline, route_output) = self.build_pipeline(&path, &route.steps, input)?;
            expect_kind(&path, output, route_output)?;
            let predicate = FieldCondition {
                field: on.map(str::to_string),
                condition: route.condition()?,
            };
            router = router.route(route.name.as_str(), predicate, pipeline);
        }
        Ok((Arc::new(router.default(default)?), output))
    }
}
