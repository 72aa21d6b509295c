use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::debug;

use crate::error::{Result, TranscriptError};

/// Key/value blob storage (local directory, bucket, ...)
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object; `None` when the key does not exist
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store an object, replacing any existing one
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;
}

/// Object store backed by a local directory
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key to a path under the root, refusing keys that escape it
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

        if key.is_empty() || escapes {
            return Err(TranscriptError::Storage {
                key: key.to_string(),
                reason: "invalid object key".to_string(),
            });
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TranscriptError::Storage {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let storage_error = |e: std::io::Error| TranscriptError::Storage {
            key: key.to_string(),
            reason: e.to_string(),
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(storage_error)?;
        }
        fs::write(&path, &bytes).await.map_err(storage_error)?;

        debug!("💾 Stored {} ({} bytes, {})", path.display(), bytes.len(), content_type);
        Ok(())
    }
}

/// Supplies raw caption text for a video
#[async_trait]
pub trait CaptionSource: Send + Sync {
    /// `None` when the video has no captions available
    async fn fetch(&self, video_id: &str) -> Result<Option<String>>;
}

/// Reads `{video_id}.en.vtt` or `{video_id}.vtt` from a directory
#[derive(Debug, Clone)]
pub struct DirectoryCaptionSource {
    dir: PathBuf,
}

impl DirectoryCaptionSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn candidates(&self, video_id: &str) -> [PathBuf; 2] {
        [
            self.dir.join(format!("{}.en.vtt", video_id)),
            self.dir.join(format!("{}.vtt", video_id)),
        ]
    }
}

#[async_trait]
impl CaptionSource for DirectoryCaptionSource {
    async fn fetch(&self, video_id: &str) -> Result<Option<String>> {
        for path in self.candidates(video_id) {
            match fs::read_to_string(&path).await {
                Ok(text) => return Ok(Some(text)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }
}

/// Reads captions stored under `{prefix}/{video_id}.vtt` in an object store
pub struct StoreCaptionSource {
    store: Arc<dyn ObjectStore>,
    prefix: String,
}

impl StoreCaptionSource {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl CaptionSource for StoreCaptionSource {
    async fn fetch(&self, video_id: &str) -> Result<Option<String>> {
        let key = format!("{}/{}.vtt", self.prefix.trim_end_matches('/'), video_id);
        match self.store.get(&key).await? {
            Some(bytes) => String::from_utf8(bytes).map(Some).map_err(|e| TranscriptError::Storage {
                key,
                reason: format!("captions for {} are not valid UTF-8: {}", video_id, e),
            }),
            None => Ok(None),
        }
    }
}
