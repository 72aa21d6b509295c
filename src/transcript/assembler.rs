use serde::{Deserialize, Serialize};

use super::segment::Segment;
use crate::error::Result;

/// Schema version written into every assembled transcript
pub const FORMAT_VERSION: &str = "1.0";

/// Provenance of an assembled transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptMetadata {
    /// Catalog the captions came from, e.g. "khan-academy"
    pub source: String,
    /// Creation stamp, supplied by the caller
    pub created: String,
    pub format_version: String,
}

/// Final structured document for one video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogicTranscript {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<String>,
    pub video_id: String,
    pub title: String,
    pub segments: Vec<Segment>,
    pub total_segments: usize,
    /// Sum of segment durations in seconds
    pub total_duration: u64,
    pub metadata: TranscriptMetadata,
}

impl DialogicTranscript {
    /// Whether this build understands the transcript's schema
    pub fn is_supported_version(&self) -> bool {
        self.metadata.format_version == FORMAT_VERSION
    }

    /// Check that the aggregate fields agree with the segment list
    pub fn totals_consistent(&self) -> bool {
        self.total_segments == self.segments.len()
            && self.total_duration == self.segments.iter().map(|s| s.duration).sum::<u64>()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Combines built segments and source metadata into a `DialogicTranscript`
#[derive(Debug, Clone, Default)]
pub struct TranscriptAssembler {
    class_id: Option<String>,
}

impl TranscriptAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag every assembled transcript with a class identifier
    pub fn with_class_id(mut self, class_id: impl Into<String>) -> Self {
        self.class_id = Some(class_id.into());
        self
    }

    pub fn assemble(
        &self,
        video_id: impl Into<String>,
        title: impl Into<String>,
        segments: Vec<Segment>,
        source: impl Into<String>,
        created: impl Into<String>,
    ) -> DialogicTranscript {
        let total_segments = segments.len();
        let total_duration = segments.iter().map(|s| s.duration).sum();

        DialogicTranscript {
            class_id: self.class_id.clone(),
            video_id: video_id.into(),
            title: title.into(),
            segments,
            total_segments,
            total_duration,
            metadata: TranscriptMetadata {
                source: source.into(),
                created: created.into(),
                format_version: FORMAT_VERSION.to_string(),
            },
        }
    }
}
