//! Overlapping text chunking on separator boundaries

use crate::core::error::ConfigurationError;
use crate::retrieval::document::Document;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
pub const DEFAULT_SEPARATOR: &str = "\n\n";

/// Metadata key holding a chunk's position within its document
pub const CHUNK_KEY: &str = "chunk";

/// Splits text into chunks of at most `chunk_size` characters
///
/// Chunks end right after a separator when one lies inside the window.
/// Consecutive chunks share exactly `chunk_overlap` characters, so the
/// original text is recovered by [`TextChunker::reassemble`]. Without a
/// separator in the window the chunk is cut at `chunk_size`, unless the
/// separator-delimited unit under the cut is itself longer than `chunk_size`;
/// then the chunk runs on to the end of that unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separator: String,
}

impl TextChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ConfigurationError> {
        if chunk_size == 0 {
            return Err(ConfigurationError::InvalidChunking(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(ConfigurationError::InvalidChunking(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separator: DEFAULT_SEPARATOR.to_string(),
        })
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Character offsets where a chunk may end, always including the end of text
    fn boundaries(&self, chars: &[char]) -> Vec<usize> {
        let separator: Vec<char> = self.separator.chars().collect();
        if separator.is_empty() {
            return (1..=chars.len()).collect();
        }

        let mut boundaries = Vec::new();
        let mut i = 0;
        while i + separator.len() <= chars.len() {
            if chars[i..i + separator.len()] == separator[..] {
                i += separator.len();
                boundaries.push(i);
            } else {
                i += 1;
            }
        }
        if boundaries.last() != Some(&chars.len()) {
            boundaries.push(chars.len());
        }
        boundaries
    }

    /// End of a chunk whose window `..latest` holds no usable boundary
    fn end_without_boundary(&self, boundaries: &[usize], latest: usize, len: usize) -> usize {
        let unit_start = boundaries
            .iter()
            .rev()
            .find(|&&b| b <= latest)
            .copied()
            .unwrap_or(0);
        let unit_end = boundaries
            .iter()
            .find(|&&b| b > latest)
            .copied()
            .unwrap_or(len);
        if unit_end - unit_start > self.chunk_size {
            unit_end
        } else {
            latest
        }
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }

        let boundaries = self.boundaries(&chars);
        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            if chars.len() - start <= self.chunk_size {
                chunks.push(chars[start..].iter().collect());
                break;
            }

            // Ending past start + overlap guarantees the next chunk advances
            let earliest = start + self.chunk_overlap + 1;
            let latest = start + self.chunk_size;
            let end = match boundaries
                .iter()
                .rev()
                .find(|&&b| b >= earliest && b <= latest)
            {
                Some(&end) => end,
                None => self.end_without_boundary(&boundaries, latest, chars.len()),
            };

            chunks.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start = end - self.chunk_overlap;
        }

        chunks
    }

    /// Inverse of [`TextChunker::split`]
    pub fn reassemble(&self, chunks: &[String]) -> String {
        let mut text = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                text.push_str(chunk);
            } else {
                text.extend(chunk.chars().skip(self.chunk_overlap));
            }
        }
        text
    }

    /// Split every document, copying its metadata onto each chunk
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Document> {
        documents
            .iter()
            .flat_map(|document| {
                self.split(&document.text)
                    .into_iter()
                    .enumerate()
                    .map(move |(index, text)| Document {
                        text,
                        metadata: document.metadata.clone(),
                    }
                    .with_metadata(CHUNK_KEY, index.to_string()))
            })
            .collect()
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }
}
