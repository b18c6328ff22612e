//! Test: Translate - prompt, completion and parsing in sequence

use crate::helpers::*;
use crate::{demo_config, vars};
use promptchain::core::{Payload, Pipeline, PromptTemplate, Role, Variables};
use promptchain::steps::{CompletionStep, ContentParser, TemplateStep};
use std::sync::Arc;

#[tokio::test]
async fn test_typed_translate_chain() {
    let provider = Arc::new(ScriptedProvider::new(["bonjour"]));
    let template = PromptTemplate::from_messages([
        (Role::System, "Translate the user's text into {language}."),
        (Role::Human, "{text}"),
    ]);

    let chain = Pipeline::<Variables, Variables>::builder("translate")
        .then(TemplateStep::new("prompt", template))
        .then(CompletionStep::new("complete", provider.clone()))
        .then(ContentParser::default())
        .build()
        .unwrap();

    let output = chain
        .run(vars(&[("language", "French"), ("text", "hello")]))
        .await
        .unwrap();

    assert_eq!(output, "bonjour");
    let received = provider.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0][0].role, Role::System);
    assert!(received[0][0].content.contains("French"));
    assert_eq!(received[0][1].content, "hello");
}

#[tokio::test]
async fn test_declarative_translate_chain() {
    let config = demo_config();
    let provider = Arc::new(ScriptedProvider::new(["bonjour"]));
    let chain = config.chain("translate", provider.clone()).unwrap();

    let output = chain
        .run(Payload::Variables(vars(&[
            ("language", "French"),
            ("text", "hello"),
        ])))
        .await
        .unwrap();

    assert_eq!(output.into_text().unwrap(), "bonjour");
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_missing_variable_names_prompt_step() {
    let config = demo_config();
    let provider = Arc::new(ScriptedProvider::new(["bonjour"]));
    let chain = config.chain("translate", provider.clone()).unwrap();

    let err = chain
        .run(Payload::Variables(vars(&[("text", "hello")])))
        .await
        .unwrap_err();

    assert_eq!(err.failed_step(), Some("translate/0:prompt"));
    assert!(err.root_cause().to_string().contains("language"));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_extended_chain_transforms_output() {
    let config = demo_config();
    let provider = Arc::new(ScriptedProvider::new(["why so serious"]));
    let chain = config.chain("extended", provider).unwrap();

    let output = chain
        .run(Payload::Variables(vars(&[
            ("topic", "lawyers"),
            ("text", "Tell me a joke"),
        ])))
        .await
        .unwrap();

    assert_eq!(
        output.into_text().unwrap(),
        "Total word count 3\nWHY SO SERIOUS"
    );
}
