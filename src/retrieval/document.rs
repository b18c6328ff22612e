//! Documents and the sources that load them

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Metadata key naming where a document came from
pub const SOURCE_KEY: &str = "source";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).map(String::as_str)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("source not found: {0}")]
    NotFound(String),

    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("failed to fetch {url}: {message}")]
    Http { url: String, message: String },

    #[error("failed to parse page: {0}")]
    Parse(String),
}

impl SourceError {
    fn io(path: &Path, error: std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::NotFound {
            SourceError::NotFound(path.display().to_string())
        } else {
            SourceError::Io {
                path: path.display().to_string(),
                message: error.to_string(),
            }
        }
    }
}

/// Anything that can produce documents for ingestion
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn load(&self) -> Result<Vec<Document>, SourceError>;

    /// Short description used in logs
    fn describe(&self) -> String;
}

/// A single UTF-8 text file
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DocumentSource for FileSource {
    async fn load(&self) -> Result<Vec<Document>, SourceError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| SourceError::io(&self.path, e))?;
        debug!("Loaded {} ({} bytes)", self.path.display(), text.len());
        Ok(vec![
            Document::new(text).with_metadata(SOURCE_KEY, self.path.display().to_string())
        ])
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Every `*.txt` file directly inside a directory, in file name order
#[derive(Debug, Clone)]
pub struct DirectorySource {
    directory: PathBuf,
}

impl DirectorySource {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }
}

#[async_trait]
impl DocumentSource for DirectorySource {
    async fn load(&self) -> Result<Vec<Document>, SourceError> {
        let mut entries = tokio::fs::read_dir(&self.directory)
            .await
            .map_err(|e| SourceError::io(&self.directory, e))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SourceError::io(&self.directory, e))?
        {
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let text = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| SourceError::io(&path, e))?;
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            documents.push(Document::new(text).with_metadata(SOURCE_KEY, file_name));
        }

        info!(
            "Loaded {} documents from {}",
            documents.len(),
            self.directory.display()
        );
        Ok(documents)
    }

    fn describe(&self) -> String {
        self.directory.display().to_string()
    }
}

/// A web page fetched over HTTP, reduced to its visible text
#[derive(Debug, Clone)]
pub struct WebSource {
    url: String,
    client: reqwest::Client,
}

impl WebSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn http_error(&self, message: impl ToString) -> SourceError {
        SourceError::Http {
            url: self.url.clone(),
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl DocumentSource for WebSource {
    async fn load(&self) -> Result<Vec<Document>, SourceError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.http_error(e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(self.http_error(format!("HTTP {}", status)));
        }
        let html = response.text().await.map_err(|e| self.http_error(e))?;

        let page = extract_page(&html)?;
        let mut document = Document::new(page.text).with_metadata(SOURCE_KEY, &self.url);
        if let Some(title) = page.title {
            document = document.with_metadata("title", title);
        }
        Ok(vec![document])
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Visible content of an HTML page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    pub title: Option<String>,
    pub text: String,
}

fn selector(css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css).map_err(|e| SourceError::Parse(e.to_string()))
}

/// Extract the title and the visible text of `body`, one text run per line
pub fn extract_page(html: &str) -> Result<ExtractedPage, SourceError> {
    const HIDDEN: [&str; 4] = ["script", "style", "noscript", "template"];

    let document = Html::parse_document(html);
    let title = document
        .select(&selector("title")?)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty());

    let mut lines = Vec::new();
    if let Some(body) = document.select(&selector("body")?).next() {
        for node in body.descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|el| HIDDEN.contains(&el.name()))
            });
            let text = text.trim();
            if !hidden && !text.is_empty() {
                lines.push(text.to_string());
            }
        }
    }

    Ok(ExtractedPage {
        title,
        text: lines.join("\n"),
    })
}
