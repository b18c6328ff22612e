//! Test: Review routing - classify model output, then branch on the label

use crate::helpers::*;
use crate::{demo_config, vars};
use promptchain::core::{ChainError, Condition, Payload, Pipeline, PromptTemplate, Role, Router};
use promptchain::steps::{Classifier, CompletionStep, ContentParser, TemplateStep};
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn review_provider(sentiment: &str) -> KeywordProvider {
    KeywordProvider::new()
        .when("Classify the sentiment", sentiment)
        .when("thank you message", "Thank you for the kind words!")
        .when("negative review", "We are sorry to hear that.")
        .when("more details", "Could you tell us more?")
        .when("manager", "A manager will look into this.")
}

async fn run_review(sentiment: &str, review: &str) -> Result<String, ChainError> {
    let chain = demo_config()
        .chain("review", Arc::new(review_provider(sentiment)))
        .unwrap();
    chain
        .run(Payload::Variables(vars(&[("text", review)])))
        .await?
        .into_text()
}

#[tokio::test]
async fn test_positive_review_gets_thanks() {
    let reply = run_review("Positive", "I love this product! It's amazing!")
        .await
        .unwrap();
    assert_eq!(reply, "Thank you for the kind words!");
}

#[tokio::test]
async fn test_negative_review_is_addressed() {
    let reply = run_review(" negative.", "The product is terrible. It broke after just one use.")
        .await
        .unwrap();
    assert_eq!(reply, "We are sorry to hear that.");
}

#[tokio::test]
async fn test_neutral_review_asks_for_details() {
    let reply = run_review("Neutral", "The product is okay.")
        .await
        .unwrap();
    assert_eq!(reply, "Could you tell us more?");
}

#[tokio::test]
async fn test_unclear_sentiment_escalates() {
    let reply = run_review("Hard to say", "I'm not sure about the product yet.")
        .await
        .unwrap();
    assert_eq!(reply, "A manager will look into this.");
}

fn classify_prompt() -> TemplateStep {
    TemplateStep::new(
        "classify-prompt",
        PromptTemplate::from_messages([
            (Role::System, "You are a helpful assistant"),
            (Role::Human, "Classify the sentiment of this feedback: {input}"),
        ]),
    )
}

#[tokio::test]
async fn test_typed_router_matches_case_insensitively() {
    let provider = Arc::new(ScriptedProvider::new(["Positive"]));
    let (thanks, thanks_calls) = CountingStep::new("thanks", " -> thank you");
    let (sorry, sorry_calls) = CountingStep::new("sorry", " -> apology");
    let (escalate, escalate_calls) = CountingStep::new("escalate", " -> manager");

    let router = Router::builder("sentiment")
        .route(
            "positive",
            Condition::contains("positive"),
            Pipeline::builder("positive").then(thanks).build().unwrap(),
        )
        .route(
            "negative",
            Condition::contains("negative"),
            Pipeline::builder("negative").then(sorry).build().unwrap(),
        )
        .default(Pipeline::builder("escalate").then(escalate).build().unwrap())
        .unwrap();

    let chain = Pipeline::<String, String>::builder("feedback")
        .then(classify_prompt())
        .then(CompletionStep::new("complete", provider))
        .then(ContentParser::default())
        .then(
            Classifier::new("label", ["positive", "negative", "neutral"])
                .unwrap()
                .with_fallback("escalate"),
        )
        .then(router)
        .build()
        .unwrap();

    let output = chain.run("Great phone".to_string()).await.unwrap();

    assert_eq!(output, "positive -> thank you");
    assert_eq!(thanks_calls.load(Ordering::SeqCst), 1);
    assert_eq!(sorry_calls.load(Ordering::SeqCst), 0);
    assert_eq!(escalate_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_blank_output_is_a_predicate_error() {
    let provider = Arc::new(ScriptedProvider::new(["   "]));
    let (thanks, _) = CountingStep::new("thanks", "");
    let (escalate, escalate_calls) = CountingStep::new("escalate", "");

    let router = Router::builder("sentiment")
        .route(
            "positive",
            Condition::contains("positive"),
            Pipeline::builder("positive").then(thanks).build().unwrap(),
        )
        .default(Pipeline::builder("escalate").then(escalate).build().unwrap())
        .unwrap();

    let chain = Pipeline::<String, String>::builder("feedback")
        .then(classify_prompt())
        .then(CompletionStep::new("complete", provider))
        .then(ContentParser::default())
        .then(router)
        .build()
        .unwrap();

    let err = chain.run("Great phone".to_string()).await.unwrap_err();
    assert!(matches!(
        err,
        ChainError::Predicate { ref router, .. } if router == "sentiment"
    ));
    assert_eq!(escalate_calls.load(Ordering::SeqCst), 0);
}
