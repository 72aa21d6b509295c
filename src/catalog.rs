use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;
use tracing::info;

use crate::error::{Result, TranscriptError};

/// One video entry of a discovery catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube_id: Option<String>,
    /// Catalog-specific id; some sources use numbers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Any other catalog fields, kept for persistence
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl CatalogRecord {
    pub fn with_id(youtube_id: impl Into<String>) -> Self {
        Self {
            youtube_id: Some(youtube_id.into()),
            ..Self::default()
        }
    }

    /// Resolve the video identifier: `youtube_id`, then `id`, then the id in `url`
    pub fn video_id(&self) -> Option<String> {
        let non_empty = |s: &str| {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };

        if let Some(id) = self.youtube_id.as_deref().and_then(non_empty) {
            return Some(id);
        }

        match &self.id {
            Some(Value::String(s)) => {
                if let Some(id) = non_empty(s) {
                    return Some(id);
                }
            }
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }

        self.url.as_deref().and_then(extract_youtube_id)
    }

    /// Like `video_id`, but reports the record when nothing usable is found
    pub fn require_video_id(&self) -> Result<String> {
        self.video_id().ok_or_else(|| TranscriptError::MissingIdentifier {
            record: self.describe(),
        })
    }

    /// Title, falling back to the video id
    pub fn display_title(&self, video_id: &str) -> String {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(video_id)
            .to_string()
    }

    fn describe(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Many(Vec<CatalogRecord>),
    One(CatalogRecord),
}

/// Ordered list of catalog records
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: Vec<CatalogRecord>,
}

impl Catalog {
    pub fn new(records: Vec<CatalogRecord>) -> Self {
        Self { records }
    }

    /// Parse a catalog from JSON; a single object is treated as a one-record catalog
    pub fn from_json(json: &str) -> Result<Self> {
        let records = match serde_json::from_str::<CatalogFile>(json)? {
            CatalogFile::Many(records) => records,
            CatalogFile::One(record) => vec![record],
        };
        Ok(Self { records })
    }

    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        let catalog = Self::from_json(&content)?;
        info!("📚 Loaded catalog with {} records from: {}", catalog.len(), path.as_ref().display());
        Ok(catalog)
    }

    /// Keep only the first `max` records
    pub fn truncate(&mut self, max: usize) {
        self.records.truncate(max);
    }

    pub fn records(&self) -> &[CatalogRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<CatalogRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn youtube_patterns() -> &'static [Regex; 2] {
    static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/)([a-zA-Z0-9_-]{11})")
                .expect("youtube url pattern is valid"),
            Regex::new(r"youtube\.com/.*[?&]v=([a-zA-Z0-9_-]{11})").expect("youtube query pattern is valid"),
        ]
    })
}

/// Extract an 11-character YouTube id from watch, short, or embed URLs
pub fn extract_youtube_id(url: &str) -> Option<String> {
    youtube_patterns()
        .iter()
        .find_map(|pattern| pattern.captures(url))
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

/// Video id from a caption file name: `abc123.en.vtt` -> `abc123`
pub fn video_id_from_caption_path(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_suffix(".vtt").unwrap_or(name);
    let stem = stem.strip_suffix(".en").unwrap_or(stem);
    (!stem.is_empty()).then(|| stem.to_string())
}
