use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{Result, TranscriptError};

/// Fixed-size text window used for retrieval indexing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_text: String,
    /// 0-based position in the chunk sequence
    pub chunk_index: usize,
    pub start_time_seconds: Option<f64>,
    pub end_time_seconds: Option<f64>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    /// Attached by the indexing path when an embedder is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    fn new(chunk_index: usize, words: &[&str]) -> Self {
        Self {
            chunk_text: words.join(" "),
            chunk_index,
            start_time_seconds: None,
            end_time_seconds: None,
            metadata: BTreeMap::new(),
            embedding: None,
        }
    }

    pub fn word_count(&self) -> usize {
        self.chunk_text.split_whitespace().count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters, approximated as `overlap / 10` words
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

/// Splits flattened transcript text into overlapping chunks
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(TranscriptError::InvalidConfig(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Number of trailing words carried into the next chunk
    pub fn overlap_words(&self) -> usize {
        self.config.overlap / 10
    }

    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        let overlap_words = self.overlap_words();
        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_length = 0usize;

        for word in text.split_whitespace() {
            let word_length = word.chars().count() + 1;

            if current_length + word_length > self.config.chunk_size && !current.is_empty() {
                chunks.push(Chunk::new(chunks.len(), &current));

                let keep_from = current.len().saturating_sub(overlap_words);
                current.drain(..keep_from);
                current_length = current.iter().map(|w| w.chars().count() + 1).sum();
            }

            current.push(word);
            current_length += word_length;
        }

        if !current.is_empty() {
            chunks.push(Chunk::new(chunks.len(), &current));
        }

        chunks
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            config: ChunkerConfig::default(),
        }
    }
}
