//! CLI command definitions

use clap::{ArgGroup, Args};
use std::path::PathBuf;

/// Run a chain
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Chain name as declared under `chains:`
    pub chain: String,

    /// Input variables (key=value)
    #[arg(long = "var", value_parser = parse_key_value)]
    pub vars: Vec<(String, String)>,
}

/// Validate the configuration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Interactive conversation
#[derive(Debug, Args, Clone)]
pub struct ChatCommand {
    /// Session id; history is kept per session
    #[arg(short, long, default_value = "default")]
    pub session: String,

    /// System message for a new session
    #[arg(long)]
    pub system: Option<String>,

    /// Keep history in memory only
    #[arg(long)]
    pub ephemeral: bool,

    /// Clear the session before starting
    #[arg(long)]
    pub reset: bool,
}

/// Ingest documents into the store
#[derive(Debug, Args, Clone)]
#[command(group(ArgGroup::new("source").required(true).args(["file", "dir", "url"])))]
pub struct IngestCommand {
    /// A single text file
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// A directory of .txt files
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// A web page
    #[arg(long)]
    pub url: Option<String>,

    /// Collection name (overrides config)
    #[arg(long)]
    pub collection: Option<String>,

    /// Ingest even when the collection already has entries
    #[arg(long)]
    pub force: bool,
}

/// Query the store
#[derive(Debug, Args, Clone)]
pub struct QueryCommand {
    pub query: String,

    /// Maximum number of results (overrides config)
    #[arg(short, long)]
    pub k: Option<usize>,

    /// Minimum similarity score (overrides config)
    #[arg(long)]
    pub min_score: Option<f32>,

    /// Collection name (overrides config)
    #[arg(long)]
    pub collection: Option<String>,
}

/// Ask the agent
#[derive(Debug, Args, Clone)]
pub struct AgentCommand {
    pub question: String,

    /// Iteration limit (overrides config)
    #[arg(long)]
    pub max_iterations: Option<usize>,
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("Invalid key=value pair: {}", s)),
    }
}
