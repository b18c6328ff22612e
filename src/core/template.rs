//! Prompt templates with `{name}` placeholders

use crate::core::message::{ChatMessage, Role};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use thiserror::Error;

/// Values substituted into a template
pub type Variables = BTreeMap<String, String>;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_.]*)\}").expect("placeholder pattern is valid")
});

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("missing template variable '{0}'")]
    MissingVariable(String),
}

/// Substitute `{name}` placeholders; `{{` and `}}` render literal braces
pub fn render(template: &str, variables: &Variables) -> Result<String, TemplateError> {
    let mut missing = None;
    let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures| match caps.get(1) {
        Some(name) => match variables.get(name.as_str()) {
            Some(value) => value.clone(),
            None => {
                missing.get_or_insert_with(|| name.as_str().to_string());
                String::new()
            }
        },
        None => caps[0][..1].to_string(),
    });

    match missing {
        Some(name) => Err(TemplateError::MissingVariable(name)),
        None => Ok(rendered.into_owned()),
    }
}

/// Placeholder names in order of first appearance
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(template) {
        if let Some(name) = caps.get(1) {
            if !names.iter().any(|n| n == name.as_str()) {
                names.push(name.as_str().to_string());
            }
        }
    }
    names
}

/// Template definition as written in the `templates:` config section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplateConfig {
    #[serde(default)]
    pub system: Option<String>,
    pub human: String,
}

/// A chat prompt made of role-tagged message templates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    messages: Vec<(Role, String)>,
}

impl PromptTemplate {
    /// Single human message
    pub fn from_template(template: impl Into<String>) -> Self {
        Self {
            messages: vec![(Role::Human, template.into())],
        }
    }

    pub fn from_messages<S: Into<String>>(messages: impl IntoIterator<Item = (Role, S)>) -> Self {
        Self {
            messages: messages
                .into_iter()
                .map(|(role, template)| (role, template.into()))
                .collect(),
        }
    }

    pub fn from_config(config: &TemplateConfig) -> Self {
        let mut messages = Vec::new();
        if let Some(system) = &config.system {
            messages.push((Role::System, system.clone()));
        }
        messages.push((Role::Human, config.human.clone()));
        Self { messages }
    }

    /// Every placeholder used across the messages
    pub fn variables(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for (_, template) in &self.messages {
            for name in placeholders(template) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    pub fn format(&self, variables: &Variables) -> Result<Vec<ChatMessage>, TemplateError> {
        self.messages
            .iter()
            .map(|(role, template)| Ok(ChatMessage::new(*role, render(template, variables)?)))
            .collect()
    }
}
