//! Application configuration from YAML

use crate::core::builder::ChainBuilder;
use crate::core::condition::Condition;
use crate::core::error::ConfigurationError;
use crate::core::payload::{Payload, PayloadKind};
use crate::core::pipeline::Pipeline;
use crate::core::template::TemplateConfig;
use crate::provider::{CompletionProvider, Disconnected};
use crate::retrieval::chunker::{
    TextChunker, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_SEPARATOR,
};
use crate::steps::retrieve::{DEFAULT_K, DEFAULT_MIN_SCORE};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Top-level configuration loaded from YAML
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub embeddings: EmbeddingsConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    /// Named chat templates referenced by `prompt` steps
    #[serde(default)]
    pub templates: BTreeMap<String, TemplateConfig>,

    /// Declarative chains, keyed by name
    #[serde(default)]
    pub chains: BTreeMap<String, Vec<StepSpec>>,
}

/// Chat completion endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub temperature: Option<f32>,
    pub timeout_secs: Option<u64>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: None,
            timeout_secs: None,
        }
    }
}

/// Embedding endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingsConfig {
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory of the persistent store (local data dir when unset)
    pub directory: Option<PathBuf>,
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            directory: None,
            collection: "documents".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkingConfig {
    pub size: usize,
    pub overlap: usize,
    pub separator: String,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }
}

impl ChunkingConfig {
    pub fn chunker(&self) -> Result<TextChunker, ConfigurationError> {
        Ok(TextChunker::new(self.size, self.overlap)?.with_separator(&self.separator))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    pub k: usize,
    pub min_score: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            min_score: DEFAULT_MIN_SCORE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    pub max_iterations: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { max_iterations: 5 }
    }
}

/// One step of a declarative chain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepSpec {
    /// Format a named template; text input is bound to `bind` (default `input`)
    Prompt {
        template: String,
        #[serde(default)]
        bind: Option<String>,
    },
    Complete {
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
    Parse,
    Uppercase,
    WordCount,
    Parallel {
        branches: BTreeMap<String, Vec<StepSpec>>,
    },
    /// Combine branch outputs through `{branch}` placeholders
    Join {
        template: String,
    },
    /// Run `steps` on the variables and store their text under `key`
    Assign {
        key: String,
        steps: Vec<StepSpec>,
    },
    Route {
        #[serde(default)]
        on: Option<String>,
        routes: Vec<RouteSpec>,
        default: Vec<StepSpec>,
    },
    Classify {
        labels: Vec<String>,
        #[serde(default)]
        on: Option<String>,
        #[serde(default)]
        into: Option<String>,
        #[serde(default)]
        fallback: Option<String>,
    },
}

impl StepSpec {
    pub fn kind_name(&self) -> &'static str {
        match self {
            StepSpec::Prompt { .. } => "prompt",
            StepSpec::Complete { .. } => "complete",
            StepSpec::Parse => "parse",
            StepSpec::Uppercase => "uppercase",
            StepSpec::WordCount => "word_count",
            StepSpec::Parallel { .. } => "parallel",
            StepSpec::Join { .. } => "join",
            StepSpec::Assign { .. } => "assign",
            StepSpec::Route { .. } => "route",
            StepSpec::Classify { .. } => "classify",
        }
    }
}

/// A route of a `route` step; exactly one condition must be set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteSpec {
    pub name: String,
    #[serde(default)]
    pub contains: Option<String>,
    #[serde(default)]
    pub equals: Option<String>,
    #[serde(default)]
    pub regex: Option<String>,
    pub steps: Vec<StepSpec>,
}

impl RouteSpec {
    pub fn condition(&self) -> Result<Condition, ConfigurationError> {
        match (&self.contains, &self.equals, &self.regex) {
            (Some(needle), None, None) => Ok(Condition::contains(needle.as_str())),
            (None, Some(expected), None) => Ok(Condition::equals(expected.as_str())),
            (None, None, Some(pattern)) => Condition::regex(pattern),
            _ => Err(ConfigurationError::Invalid(format!(
                "route '{}' must set exactly one of contains, equals or regex",
                self.name
            ))),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: AppConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Default config location: `<config dir>/promptchain/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("promptchain").join("config.yaml"))
    }

    /// Validate the configuration, building every chain once
    pub fn validate(&self) -> Result<()> {
        self.chunking.chunker()?;

        if self.retrieval.k == 0 {
            anyhow::bail!("retrieval.k must be at least 1");
        }
        if !(-1.0..=1.0).contains(&self.retrieval.min_score) {
            anyhow::bail!(
                "retrieval.min_score must be within [-1, 1], got {}",
                self.retrieval.min_score
            );
        }
        if self.agent.max_iterations == 0 {
            anyhow::bail!("agent.max_iterations must be at least 1");
        }

        let provider: Arc<dyn CompletionProvider> = Arc::new(Disconnected);
        for name in self.chains.keys() {
            self.chain(name, Arc::clone(&provider))
                .with_context(|| format!("Chain '{}' is invalid", name))?;
        }

        Ok(())
    }

    pub fn chain_names(&self) -> impl Iterator<Item = &str> {
        self.chains.keys().map(String::as_str)
    }

    /// Build the named chain; declarative chains take a variables payload
    pub fn chain(
        &self,
        name: &str,
        provider: Arc<dyn CompletionProvider>,
    ) -> Result<Pipeline<Payload, Payload>, ConfigurationError> {
        let specs = self
            .chains
            .get(name)
            .ok_or_else(|| ConfigurationError::UnknownChain(name.to_string()))?;
        let builder = ChainBuilder::new(&self.templates, provider);
        let (pipeline, _) = builder.build_pipeline(name, specs, PayloadKind::Variables)?;
        Ok(pipeline)
    }

    pub fn store_directory(&self) -> PathBuf {
        #[cfg(feature = "sqlite")]
        let fallback = crate::retrieval::SqliteStore::default_directory;
        #[cfg(not(feature = "sqlite"))]
        let fallback = || PathBuf::from(".");

        self.store.directory.clone().unwrap_or_else(fallback)
    }
}
