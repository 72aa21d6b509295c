pub mod vtt;
pub mod segment;
pub mod topics;
pub mod chunker;
pub mod assembler;

pub use vtt::{CaptionParser, Cue, ParsedCaptions};
pub use segment::{CaptionRecord, PacingConfig, Segment, SegmentBuilder};
pub use topics::{TopicClassifier, TopicMarker, TopicRule};
pub use chunker::{Chunk, Chunker, ChunkerConfig};
pub use assembler::{DialogicTranscript, TranscriptAssembler, TranscriptMetadata, FORMAT_VERSION};
