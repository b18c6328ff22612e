//! OpenAI-compatible chat and embedding clients

use crate::core::config::{EmbeddingsConfig, ProviderConfig};
use crate::core::message::{ChatMessage, Role};
use crate::provider::{CompletionProvider, EmbeddingProvider, ProviderError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> From<&'a ChatMessage> for WireMessage<'a> {
    fn from(message: &'a ChatMessage) -> Self {
        let role = match message.role {
            Role::System => "system",
            Role::Human => "user",
            Role::Assistant => "assistant",
        };
        Self {
            role,
            content: &message.content,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

fn read_api_key(key_env: &str) -> Result<String, ProviderError> {
    env::var(key_env)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ProviderError::missing_key(key_env))
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}

/// POST `payload` and decode a JSON body, mapping HTTP failures to `ProviderError`
async fn post_json<P, R>(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    payload: &P,
    timeout: Option<Duration>,
) -> Result<R, ProviderError>
where
    P: Serialize + ?Sized,
    R: for<'de> Deserialize<'de>,
{
    let mut request = client.post(url).bearer_auth(api_key).json(payload);
    if let Some(timeout) = timeout {
        request = request.timeout(timeout);
    }

    let response = request.send().await.map_err(|e| match timeout {
        Some(limit) if e.is_timeout() => ProviderError::timeout(limit),
        _ => ProviderError::from(e),
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::api(status.as_u16(), body));
    }

    Ok(response.json::<R>().await?)
}

/// Chat completions client for any OpenAI-compatible endpoint
#[derive(Debug, Clone)]
pub struct OpenAiChat {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: Option<f32>,
    timeout: Option<Duration>,
}

impl OpenAiChat {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
            temperature: None,
            timeout: None,
        }
    }

    /// Build from config, reading the key from the configured environment variable
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let api_key = read_api_key(&config.api_key_env)?;
        let mut chat = Self::new(&config.base_url, &config.model, api_key);
        chat.temperature = config.temperature;
        chat.timeout = config.timeout_secs.map(Duration::from_secs);
        Ok(chat)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionProvider for OpenAiChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let payload = ChatCompletionRequest {
            model: &self.model,
            messages: messages.iter().map(WireMessage::from).collect(),
            temperature: self.temperature,
        };
        debug!("Requesting completion from {} ({} messages)", self.model, messages.len());

        let url = endpoint(&self.base_url, "chat/completions");
        let body: ChatCompletionResponse =
            post_json(&self.client, &url, &self.api_key, &payload, self.timeout).await?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ProviderError::transport("response did not contain message content"))
    }
}

/// Embeddings client for any OpenAI-compatible endpoint
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddings {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl OpenAiEmbeddings {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    pub fn from_config(config: &EmbeddingsConfig) -> Result<Self, ProviderError> {
        let api_key = read_api_key(&config.api_key_env)?;
        Ok(Self::new(&config.base_url, &config.model, api_key))
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let payload = EmbeddingRequest {
            model: &self.model,
            input: text,
        };
        let url = endpoint(&self.base_url, "embeddings");
        let body: EmbeddingResponse =
            post_json(&self.client, &url, &self.api_key, &payload, None).await?;

        body.data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .filter(|embedding| !embedding.is_empty())
            .ok_or_else(|| ProviderError::transport("response did not contain embedding data"))
    }
}
