//! ReAct text protocol: prompt layout and reply parsing

use regex::Regex;
use std::sync::LazyLock;

pub const OBSERVATION_MARKER: &str = "\nObservation:";
const FINAL_ANSWER_MARKER: &str = "Final Answer:";

static ACTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)")
        .expect("action pattern is valid")
});

pub const PROMPT: &str = "Answer the following questions as best you can. You have access to the following tools:

{tools}

Use the following format:

Question: the input question you must answer
Thought: you should always think about what to do
Action: the action to take, should be one of [{tool_names}]
Action Input: the input to the action
Observation: the result of the action
... (this Thought/Action/Action Input/Observation can repeat N times)
Thought: I now know the final answer
Final Answer: the final answer to the original input question

Begin!

Question: {input}
Thought:{agent_scratchpad}";

/// What the model asked for in one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentAction {
    Tool { tool: String, input: String },
    Finish(String),
}

/// Drop anything the model hallucinated after its first action
pub fn truncate_at_observation(reply: &str) -> &str {
    match reply.find(OBSERVATION_MARKER) {
        Some(index) => &reply[..index],
        None => reply,
    }
}

/// Parse one model turn; `None` when it follows neither form
pub fn parse_reply(reply: &str) -> Option<AgentAction> {
    if let Some(caps) = ACTION.captures(reply) {
        let tool = caps[1].trim().to_string();
        let input = caps[2].trim().trim_matches('"').to_string();
        return Some(AgentAction::Tool { tool, input });
    }

    reply
        .find(FINAL_ANSWER_MARKER)
        .map(|index| AgentAction::Finish(reply[index + FINAL_ANSWER_MARKER.len()..].trim().to_string()))
}
