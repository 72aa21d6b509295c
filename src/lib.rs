/// Dialogic Transcripts
///
/// Converts timed WebVTT captions into paced, topic-tagged dialogic transcripts
/// and splits transcript text into overlapping chunks for retrieval.

pub mod catalog;
pub mod config;
pub mod embedding;
pub mod error;
pub mod pipeline;
pub mod processing;
pub mod storage;
pub mod transcript;

// Re-export main types for easy access
pub use crate::catalog::{Catalog, CatalogRecord};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::embedding::{Embedder, EmbeddingConfig, OpenAIEmbedder};
pub use crate::error::{ParseError, Result, TranscriptError};
pub use crate::pipeline::{ConvertedTranscript, TranscriptPipeline};
pub use crate::processing::{BatchProcessor, BatchReport, FailureRecord, ProcessingStatus, VideoProcessingResult};
pub use crate::storage::{CaptionSource, DirectoryCaptionSource, LocalStore, ObjectStore, StoreCaptionSource};
pub use crate::transcript::{
    CaptionParser, Chunk, Chunker, ChunkerConfig, Cue, DialogicTranscript, Segment, SegmentBuilder, TopicClassifier,
    TopicMarker, TranscriptAssembler,
};
