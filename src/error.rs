/// Result type for transcript pipeline operations
pub type Result<T> = std::result::Result<T, TranscriptError>;

/// A single caption block that could not be turned into a cue
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("caption block {block}: {reason}")]
pub struct ParseError {
    /// 1-based position of the block in the caption file
    pub block: usize,
    /// What was wrong with it
    pub reason: String,
}

impl ParseError {
    pub fn new(block: usize, reason: impl Into<String>) -> Self {
        Self {
            block,
            reason: reason.into(),
        }
    }
}

/// Error types for the transcript pipeline and its collaborators
#[derive(thiserror::Error, Debug)]
pub enum TranscriptError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("No usable cues in captions for video {video_id}")]
    EmptySource { video_id: String },

    #[error("Catalog record has no usable video identifier: {record}")]
    MissingIdentifier { record: String },

    #[error("Captions not available for video {video_id}")]
    CaptionsUnavailable { video_id: String },

    #[error("Storage error for {key}: {reason}")]
    Storage { key: String, reason: String },

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TranscriptError {
    /// Short machine-friendly kind, used in persisted failure lists
    pub fn kind(&self) -> &'static str {
        match self {
            TranscriptError::Parse(_) => "parse",
            TranscriptError::EmptySource { .. } => "empty_source",
            TranscriptError::MissingIdentifier { .. } => "missing_identifier",
            TranscriptError::CaptionsUnavailable { .. } => "captions_unavailable",
            TranscriptError::Storage { .. } => "storage",
            TranscriptError::Embedding(_) => "embedding",
            TranscriptError::InvalidConfig(_) => "invalid_config",
            TranscriptError::Io(_) => "io",
            TranscriptError::Json(_) => "json",
        }
    }

    /// Whether re-running the same input could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TranscriptError::Storage { .. } | TranscriptError::Embedding(_) | TranscriptError::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new(3, "invalid timestamp '00:xx:01.000'");
        assert_eq!(err.to_string(), "caption block 3: invalid timestamp '00:xx:01.000'");
    }

    #[test]
    fn test_parse_error_converts() {
        let err: TranscriptError = ParseError::new(2, "missing timing line").into();
        assert_eq!(err.kind(), "parse");
        assert_eq!(err.to_string(), "Parse error: caption block 2: missing timing line");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_error_kinds() {
        let empty = TranscriptError::EmptySource { video_id: "abc".to_string() };
        assert_eq!(empty.kind(), "empty_source");
        assert!(!empty.is_retryable());
        assert!(empty.to_string().contains("abc"));

        let storage = TranscriptError::Storage {
            key: "processed/abc.json".to_string(),
            reason: "disk full".to_string(),
        };
        assert!(storage.is_retryable());
    }
}
