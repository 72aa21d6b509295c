use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::embedding::EmbeddingConfig;
use crate::transcript::{ChunkerConfig, PacingConfig};

/// Configuration for the dialogic transcript pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Segment pacing and chunking settings
    pub pipeline: PipelineConfig,

    /// Values written into transcript metadata
    pub metadata: MetadataConfig,

    /// Batch processing settings
    pub batch: BatchConfig,

    /// Output and logging settings
    pub output: OutputConfig,

    /// Embedding generator settings
    pub embedding: EmbeddingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,

    /// Chunk overlap in characters (approximated by words)
    pub chunk_overlap: usize,

    /// Minimum pause after a segment (ms)
    pub min_pause_ms: u64,

    /// Maximum pause after a segment (ms)
    pub max_pause_ms: u64,

    /// Pause per second of segment length (ms)
    pub pause_ms_per_second: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Source tag, e.g. "khan-academy"
    pub source: String,

    /// Optional class identifier attached to every transcript
    pub class_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum number of videos processed concurrently
    pub max_workers: usize,

    /// Delay before each caption fetch (ms)
    pub rate_limit_delay_ms: u64,

    /// Process at most this many catalog records
    pub max_videos: Option<usize>,

    /// Chunk (and embed, if enabled) transcripts for retrieval
    pub index_chunks: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Base directory for local storage
    pub base_dir: PathBuf,

    /// Log level
    pub log_level: String,
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        let config_paths = ["dialogic.toml", "config/dialogic.toml"];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Load configuration from a specific TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Cannot read config {}: {}", path.display(), e))?;
        let config = toml::from_str(&config_str)?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(workers) = std::env::var("DIALOGIC_WORKERS") {
            config.batch.max_workers = workers.parse()?;
        }

        if let Ok(delay) = std::env::var("DIALOGIC_RATE_LIMIT_MS") {
            config.batch.rate_limit_delay_ms = delay.parse()?;
        }

        if let Ok(output_dir) = std::env::var("DIALOGIC_OUTPUT_DIR") {
            config.output.base_dir = PathBuf::from(output_dir);
        }

        if let Ok(log_level) = std::env::var("DIALOGIC_LOG_LEVEL") {
            config.output.log_level = log_level;
        }

        if let Ok(source) = std::env::var("DIALOGIC_SOURCE") {
            config.metadata.source = source;
        }

        if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            config.embedding.api_key = Some(api_key);
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.chunk_size == 0 {
            return Err(anyhow!("chunk_size must be greater than 0"));
        }

        if self.pipeline.min_pause_ms > self.pipeline.max_pause_ms {
            return Err(anyhow!(
                "min_pause_ms ({}) must not exceed max_pause_ms ({})",
                self.pipeline.min_pause_ms,
                self.pipeline.max_pause_ms
            ));
        }

        if self.batch.max_workers == 0 {
            return Err(anyhow!("max_workers must be greater than 0"));
        }

        if self.embedding.enabled && self.embedding.api_key.is_none() {
            return Err(anyhow!("API key required when embedding generation is enabled"));
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }

    pub fn chunker_config(&self) -> ChunkerConfig {
        ChunkerConfig {
            chunk_size: self.pipeline.chunk_size,
            overlap: self.pipeline.chunk_overlap,
        }
    }

    pub fn pacing_config(&self) -> PacingConfig {
        PacingConfig {
            min_pause_ms: self.pipeline.min_pause_ms,
            max_pause_ms: self.pipeline.max_pause_ms,
            pause_ms_per_second: self.pipeline.pause_ms_per_second,
        }
    }

    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_millis(self.batch.rate_limit_delay_ms)
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Dialogic Transcript Configuration:\n\
            - Workers: {}\n\
            - Rate Limit Delay: {}ms\n\
            - Chunk Size/Overlap: {}/{}\n\
            - Pause Range: {}-{}ms\n\
            - Source: {}\n\
            - Output Directory: {}\n\
            - Chunk Indexing: {}\n\
            - Embeddings: {}",
            self.batch.max_workers,
            self.batch.rate_limit_delay_ms,
            self.pipeline.chunk_size,
            self.pipeline.chunk_overlap,
            self.pipeline.min_pause_ms,
            self.pipeline.max_pause_ms,
            self.metadata.source,
            self.output.base_dir.display(),
            self.batch.index_chunks,
            self.embedding.enabled
        )
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let pacing = PacingConfig::default();
        let chunking = ChunkerConfig::default();

        Self {
            chunk_size: chunking.chunk_size,
            chunk_overlap: chunking.overlap,
            min_pause_ms: pacing.min_pause_ms,
            max_pause_ms: pacing.max_pause_ms,
            pause_ms_per_second: pacing.pause_ms_per_second,
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            source: "khan-academy".to_string(),
            class_id: None,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_workers: num_cpus::get().min(8), // Use available cores, max 8
            rate_limit_delay_ms: 500,
            max_videos: None,
            index_chunks: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./output"),
            log_level: "info".to_string(),
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.config.batch.max_workers = workers;
        self
    }

    pub fn with_chunking(mut self, chunk_size: usize, overlap: usize) -> Self {
        self.config.pipeline.chunk_size = chunk_size;
        self.config.pipeline.chunk_overlap = overlap;
        self
    }

    pub fn with_rate_limit_delay_ms(mut self, delay_ms: u64) -> Self {
        self.config.batch.rate_limit_delay_ms = delay_ms;
        self
    }

    pub fn with_max_videos(mut self, max_videos: usize) -> Self {
        self.config.batch.max_videos = Some(max_videos);
        self
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.config.output.base_dir = dir;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.config.metadata.source = source.into();
        self
    }

    pub fn with_class_id(mut self, class_id: impl Into<String>) -> Self {
        self.config.metadata.class_id = Some(class_id.into());
        self
    }

    pub fn enable_indexing(mut self, enable: bool) -> Self {
        self.config.batch.index_chunks = enable;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
