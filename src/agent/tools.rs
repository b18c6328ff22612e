//! Built-in agent tools

use crate::agent::{Tool, ToolError};
use async_trait::async_trait;
use chrono::Local;

pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Reports the local wall-clock time; ignores its input
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Get the current time"
    }

    async fn call(&self, _input: &str) -> Result<String, ToolError> {
        Ok(Local::now().format(TIME_FORMAT).to_string())
    }
}
