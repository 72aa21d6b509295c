use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{Result, TranscriptError};

/// Embedding generator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Generate embeddings for indexed chunks
    pub enabled: bool,
    /// OpenAI-compatible embeddings endpoint
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    /// Expected vector length
    pub dimensions: usize,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "https://api.openai.com/v1/embeddings".to_string(),
            api_key: None,
            model: "text-embedding-ada-002".to_string(),
            dimensions: 1536,
            timeout_seconds: 30,
        }
    }
}

/// Turns text into a fixed-length vector
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    fn dimensions(&self) -> usize;
}

/// Reject vectors that do not match the embedder's advertised size
pub fn check_dimensions(vector: Vec<f32>, expected: usize) -> Result<Vec<f32>> {
    if vector.len() != expected {
        return Err(TranscriptError::Embedding(format!(
            "expected {} dimensions, got {}",
            expected,
            vector.len()
        )));
    }
    Ok(vector)
}

/// OpenAI-compatible embeddings client
pub struct OpenAIEmbedder {
    config: EmbeddingConfig,
    client: reqwest::Client,
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

impl OpenAIEmbedder {
    pub fn new(config: EmbeddingConfig) -> Result<Self> {
        if config.api_key.is_none() {
            return Err(TranscriptError::InvalidConfig("embedding API key required".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| TranscriptError::Embedding(e.to_string()))?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| TranscriptError::Embedding("API key not configured".to_string()))?;

        let request = EmbeddingRequest {
            model: &self.config.model,
            input: text,
        };

        debug!("Requesting embedding from {}", self.config.endpoint);

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| TranscriptError::Embedding(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TranscriptError::Embedding(format!("API error {}: {}", status, body)));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| TranscriptError::Embedding(e.to_string()))?;

        let vector = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| TranscriptError::Embedding("empty embedding response".to_string()))?
            .embedding;

        check_dimensions(vector, self.config.dimensions)
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        assert!(OpenAIEmbedder::new(EmbeddingConfig::default()).is_err());

        let config = EmbeddingConfig {
            api_key: Some("sk-test".to_string()),
            ..EmbeddingConfig::default()
        };
        let embedder = OpenAIEmbedder::new(config).unwrap();
        assert_eq!(embedder.dimensions(), 1536);
    }

    #[test]
    fn test_dimension_check() {
        assert!(check_dimensions(vec![0.0; 4], 4).is_ok());
        let err = check_dimensions(vec![0.0; 3], 4).unwrap_err();
        assert!(err.to_string().contains("expected 4 dimensions, got 3"));
    }

    #[test]
    fn test_response_parsing() {
        let parsed: EmbeddingResponse =
            serde_json::from_str(r#"{"data": [{"embedding": [0.5, -0.25], "index": 0}], "model": "m"}"#).unwrap();
        assert_eq!(parsed.data[0].embedding, vec![0.5, -0.25]);
    }
}
