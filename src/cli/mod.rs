//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{AgentCommand, ChatCommand, IngestCommand, QueryCommand, RunCommand, ValidateCommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Prompt chains, routing and retrieval for LLM workflows
#[derive(Debug, Parser, Clone)]
#[command(name = "promptchain")]
#[command(version)]
#[command(about = "Compose prompt chains, route on model output and query document stores", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run a chain from the configuration
    Run(RunCommand),

    /// Validate the configuration and list its chains
    Validate(ValidateCommand),

    /// Start an interactive conversation
    Chat(ChatCommand),

    /// Load, split, embed and store documents
    Ingest(IngestCommand),

    /// Retrieve the stored documents most similar to a query
    Query(QueryCommand),

    /// Answer a question with the tool-using agent
    Agent(AgentCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
