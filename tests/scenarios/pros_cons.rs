//! Test: Pros and cons - parallel branches joined into one answer

use crate::helpers::*;
use crate::{demo_config, vars};
use promptchain::core::{ChainError, ParallelGroup, Payload, Pipeline, PromptTemplate, Role};
use promptchain::steps::{CompletionStep, ContentParser, JoinStep, TemplateStep};
use std::sync::Arc;
use std::time::Duration;

fn product_provider() -> KeywordProvider {
    KeywordProvider::new()
        .when("Write the features", "Long battery life, heavy body")
        .when("Identify the pros", "Long battery life")
        .when("Identify the cons", "Heavy body")
}

#[tokio::test]
async fn test_pros_and_cons_are_joined() {
    let provider = Arc::new(product_provider());
    let chain = demo_config().chain("pros_cons", provider.clone()).unwrap();

    let output = chain
        .run(Payload::Variables(vars(&[("product", "Iphone 15")])))
        .await
        .unwrap();

    assert_eq!(
        output.into_text().unwrap(),
        "Pros:\nLong battery life\n\nCons:\nHeavy body"
    );
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn test_failed_branch_is_reported_by_join() {
    let provider = Arc::new(
        KeywordProvider::new()
            .when("Write the features", "Long battery life")
            .when("Identify the pros", "Long battery life"),
    );
    let chain = demo_config().chain("pros_cons", provider.clone()).unwrap();

    let err = chain
        .run(Payload::Variables(vars(&[("product", "Iphone 15")])))
        .await
        .unwrap_err();

    assert_eq!(err.failed_step(), Some("pros_cons/4:join"));
    assert!(matches!(err.root_cause(), ChainError::Provider(_)));
    // both branches ran even though one failed
    assert_eq!(provider.calls(), 3);
}

fn analysis(name: &str, instruction: &str, provider: Arc<KeywordProvider>) -> Pipeline<String, String> {
    let template = PromptTemplate::from_messages([
        (Role::System, "You analyze product features".to_string()),
        (Role::Human, format!("Features: {{features}}\n\n{}", instruction)),
    ]);
    Pipeline::builder(name)
        .then(TemplateStep::new("prompt", template).bind("features"))
        .then(CompletionStep::new("complete", provider))
        .then(ContentParser::default())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_typed_parallel_group_with_join() {
    let provider = Arc::new(product_provider().with_delay(Duration::from_millis(20)));

    let group = ParallelGroup::builder("analysis")
        .branch("pros", analysis("pros", "Identify the pros:", provider.clone()))
        .branch("cons", analysis("cons", "Identify the cons:", provider.clone()))
        .build()
        .unwrap();

    let chain = Pipeline::<String, String>::builder("review")
        .then(group)
        .then(JoinStep::new("join", "Pros: \n{pros}\nCons: {cons}"))
        .build()
        .unwrap();

    let output = chain
        .run("Long battery life, heavy body".to_string())
        .await
        .unwrap();

    assert_eq!(output, "Pros: \nLong battery life\nCons: Heavy body");
    assert_eq!(provider.calls(), 2);
}
