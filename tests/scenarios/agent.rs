//! Test: Agent - tool calls interleaved with model turns

use crate::helpers::*;
use promptchain::agent::{AgentError, AgentExecutor, CurrentTimeTool};
use promptchain::core::{Pipeline, Step};
use std::sync::Arc;

#[tokio::test]
async fn test_agent_reads_the_clock_then_answers() {
    let provider = Arc::new(ScriptedProvider::new([
        " I should look at the clock.\nAction: get_current_time\nAction Input: now\nObservation: 9am",
        " I now know the final answer\nFinal Answer: It is late.",
    ]));
    let agent = AgentExecutor::new(provider.clone()).with_tool(Arc::new(CurrentTimeTool));

    let outcome = agent.run("What is the current time?").await.unwrap();

    assert_eq!(outcome.answer, "It is late.");
    assert_eq!(outcome.steps.len(), 1);
    assert_eq!(outcome.steps[0].tool, "get_current_time");
    assert_ne!(outcome.steps[0].observation, "9am");

    let second_prompt = &provider.received()[1][0].content;
    assert!(second_prompt.contains("Question: What is the current time?"));
    assert!(second_prompt.contains(&format!(
        "Observation: {}",
        outcome.steps[0].observation
    )));
    assert!(second_prompt.contains("get_current_time: Get the current time"));
}

#[tokio::test]
async fn test_agent_gives_up_after_iteration_limit() {
    let provider = Arc::new(ScriptedProvider::new([
        "Action: get_current_time\nAction Input: now",
        "Action: get_current_time\nAction Input: now",
        "Final Answer: too late",
    ]));
    let agent = AgentExecutor::new(provider.clone())
        .with_tool(Arc::new(CurrentTimeTool))
        .with_max_iterations(2);

    let err = agent.run("What time is it?").await.unwrap_err();
    assert!(matches!(err, AgentError::MaxIterations(2)));
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_agent_as_pipeline_step() {
    let provider = Arc::new(FailingProvider(429));
    let agent = AgentExecutor::new(provider).with_name("assistant");
    let pipeline = Pipeline::<String, String>::builder("ask")
        .then(agent)
        .build()
        .unwrap();

    let err = pipeline.run("Anything?".to_string()).await.unwrap_err();
    assert_eq!(err.failed_step(), Some("assistant"));

    let agent = AgentExecutor::new(Arc::new(ScriptedProvider::new(["Final Answer: 42"])));
    assert_eq!(agent.name(), "agent");
    assert_eq!(agent.execute("question".to_string()).await.unwrap(), "42");
}
