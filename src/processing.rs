use anyhow::Result;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::catalog::{video_id_from_caption_path, Catalog, CatalogRecord};
use crate::config::Config;
use crate::embedding::Embedder;
use crate::error::TranscriptError;
use crate::pipeline::{today_stamp, TranscriptPipeline};
use crate::storage::{CaptionSource, ObjectStore};
use crate::transcript::Chunk;

/// Key under which the batch report is persisted
pub const REPORT_KEY: &str = "metadata/batch_results.json";

/// Concurrent embedding requests per video
const EMBEDDING_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingStatus {
    Completed,
    Failed,
}

/// Outcome for a single catalog record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoProcessingResult {
    /// Position of the record in the catalog
    pub index: usize,
    pub video_id: Option<String>,
    pub title: Option<String>,
    pub status: ProcessingStatus,
    pub total_segments: usize,
    pub total_duration: u64,
    pub word_count: usize,
    /// Caption blocks skipped as malformed
    pub skipped_blocks: usize,
    pub chunk_count: Option<usize>,
    pub transcript_key: Option<String>,
    pub chunks_key: Option<String>,
    pub error_message: Option<String>,
    pub processing_time: Duration,
}

/// A failed record, kept for re-runs and debugging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub video_id: Option<String>,
    pub kind: String,
    pub error: String,
    pub record: CatalogRecord,
}

/// Overall batch processing results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub total_time: Duration,
    pub results: Vec<VideoProcessingResult>,
    pub failures: Vec<FailureRecord>,
}

impl BatchReport {
    pub fn success_rate(&self) -> f64 {
        if self.total > 0 {
            self.successful as f64 / self.total as f64 * 100.0
        } else {
            0.0
        }
    }
}

/// Runs catalog records through the transcript pipeline with a bounded worker pool
pub struct BatchProcessor {
    state: ProcessorState,
    worker_semaphore: Arc<Semaphore>,
    max_concurrent: usize,
    max_videos: Option<usize>,
}

impl BatchProcessor {
    pub fn new(config: Config, captions: Arc<dyn CaptionSource>, store: Arc<dyn ObjectStore>) -> Result<Self> {
        config.validate()?;
        let max_workers = config.batch.max_workers;
        info!("🔧 Initializing BatchProcessor with {} workers", max_workers);

        let pipeline = TranscriptPipeline::from_config(&config)?;

        Ok(Self {
            state: ProcessorState {
                pipeline,
                captions,
                store,
                embedder: None,
                index_chunks: config.batch.index_chunks,
                rate_limit_delay: config.rate_limit_delay(),
                created: today_stamp(),
            },
            worker_semaphore: Arc::new(Semaphore::new(max_workers)),
            max_concurrent: max_workers,
            max_videos: config.batch.max_videos,
        })
    }

    /// Attach an embedding generator for indexed chunks
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.state.embedder = Some(embedder);
        self
    }

    /// Override the `created` stamp written into transcripts
    pub fn with_created(mut self, created: impl Into<String>) -> Self {
        self.state.created = created.into();
        self
    }

    /// Process every record of a catalog and persist the report
    pub async fn process_catalog(&self, catalog: Catalog) -> Result<BatchReport> {
        let start_time = Instant::now();
        let mut records = catalog.into_records();
        if let Some(max) = self.max_videos {
            records.truncate(max);
        }

        info!("🚀 Starting batch processing of {} videos...", records.len());

        let mut results = self.process_records_parallel(records).await;
        results.sort_by_key(|(result, _)| result.index);

        let (results, failures): (Vec<_>, Vec<_>) = results.into_iter().unzip();
        let failures: Vec<FailureRecord> = failures.into_iter().flatten().collect();

        let total = results.len();
        let successful = results
            .iter()
            .filter(|r| r.status == ProcessingStatus::Completed)
            .count();

        let report = BatchReport {
            total,
            successful,
            failed: total - successful,
            total_time: start_time.elapsed(),
            results,
            failures,
        };

        let json_data = serde_json::to_vec_pretty(&report)?;
        self.state.store.put(REPORT_KEY, json_data, "application/json").await?;
        info!("💾 Results saved to: {}", REPORT_KEY);

        info!(
            "✅ Batch complete: {} successful, {} failed, {} total",
            report.successful, report.failed, report.total
        );
        Ok(report)
    }

    /// Process records in parallel with controlled concurrency
    async fn process_records_parallel(
        &self,
        records: Vec<CatalogRecord>,
    ) -> Vec<(VideoProcessingResult, Option<FailureRecord>)> {
        let total_videos = records.len();
        let mut handles = Vec::with_capacity(total_videos);

        for (index, record) in records.into_iter().enumerate() {
            let processor = self.state.clone();
            let semaphore = Arc::clone(&self.worker_semaphore);
            let task_record = record.clone();

            let handle = tokio::spawn(async move {
                match semaphore.acquire_owned().await {
                    Ok(_permit) => {
                        debug!("📹 Processing video {}/{}", index + 1, total_videos);
                        processor.process_record(index, task_record).await
                    }
                    Err(e) => processor.failure(index, task_record, None, "worker_pool", e.to_string(), Instant::now()),
                }
            });
            handles.push((index, record, handle));
        }

        let mut results = Vec::with_capacity(total_videos);
        for (index, record, handle) in handles {
            match handle.await {
                Ok(outcome) => results.push(outcome),
                Err(e) => {
                    // A panicking worker still gets a row in the report
                    error!("❌ Worker for catalog record {} failed: {}", index, e);
                    let video_id = record.video_id();
                    results.push(self.state.failure(
                        index,
                        record,
                        video_id,
                        "worker_panic",
                        e.to_string(),
                        Instant::now(),
                    ));
                }
            }
        }
        results
    }

    pub fn get_stats(&self) -> ProcessingStats {
        ProcessingStats {
            max_workers: self.max_concurrent,
            available_permits: self.worker_semaphore.available_permits(),
        }
    }
}

/// Everything a worker task needs, cheap to clone
#[derive(Clone)]
struct ProcessorState {
    pipeline: TranscriptPipeline,
    captions: Arc<dyn CaptionSource>,
    store: Arc<dyn ObjectStore>,
    embedder: Option<Arc<dyn Embedder>>,
    index_chunks: bool,
    rate_limit_delay: Duration,
    created: String,
}

/// What a successfully processed video produced
struct VideoOutput {
    title: String,
    total_segments: usize,
    total_duration: u64,
    word_count: usize,
    skipped_blocks: usize,
    transcript_key: String,
    chunks: Option<(usize, String)>,
}

impl ProcessorState {
    async fn process_record(&self, index: usize, record: CatalogRecord) -> (VideoProcessingResult, Option<FailureRecord>) {
        let start_time = Instant::now();

        let video_id = match record.require_video_id() {
            Ok(id) => id,
            Err(e) => {
                warn!("❌ Skipping catalog record {}: {}", index, e);
                return self.failure(index, record, None, e.kind(), e.to_string(), start_time);
            }
        };

        match self.process_video(&video_id, &record).await {
            Ok(output) => {
                info!(
                    "✅ Completed: {} ({} segments) in {:.2}s",
                    video_id,
                    output.total_segments,
                    start_time.elapsed().as_secs_f64()
                );
                let result = VideoProcessingResult {
                    index,
                    video_id: Some(video_id),
                    title: Some(output.title),
                    status: ProcessingStatus::Completed,
                    total_segments: output.total_segments,
                    total_duration: output.total_duration,
                    word_count: output.word_count,
                    skipped_blocks: output.skipped_blocks,
                    chunk_count: output.chunks.as_ref().map(|(count, _)| *count),
                    transcript_key: Some(output.transcript_key),
                    chunks_key: output.chunks.map(|(_, key)| key),
                    error_message: None,
                    processing_time: start_time.elapsed(),
                };
                (result, None)
            }
            Err(e) => {
                warn!("❌ Failed: {} - {}", video_id, e);
                self.failure(index, record, Some(video_id), e.kind(), e.to_string(), start_time)
            }
        }
    }

    async fn process_video(&self, video_id: &str, record: &CatalogRecord) -> crate::error::Result<VideoOutput> {
        if !self.rate_limit_delay.is_zero() {
            tokio::time::sleep(self.rate_limit_delay).await;
        }

        let caption_text = self
            .captions
            .fetch(video_id)
            .await?
            .ok_or_else(|| TranscriptError::CaptionsUnavailable {
                video_id: video_id.to_string(),
            })?;

        let title = record.display_title(video_id);
        let converted = self
            .pipeline
            .convert_detailed(video_id, &title, &caption_text, &self.created)?;

        let transcript_key = format!("processed/{}_dialogic_transcript.json", video_id);
        let json_data = serde_json::to_vec_pretty(&converted.transcript)?;
        self.store.put(&transcript_key, json_data, "application/json").await?;

        let chunks = if self.index_chunks {
            let chunks = self.build_chunks(video_id, &title, &converted.full_text).await?;
            let chunks_key = format!("chunks/{}_chunks.json", video_id);
            let count = chunks.len();
            self.store
                .put(&chunks_key, serde_json::to_vec_pretty(&chunks)?, "application/json")
                .await?;
            info!("📦 Indexed {} chunks for {}", count, video_id);
            Some((count, chunks_key))
        } else {
            None
        };

        Ok(VideoOutput {
            title,
            total_segments: converted.transcript.total_segments,
            total_duration: converted.transcript.total_duration,
            word_count: converted.word_count,
            skipped_blocks: converted.skipped.len(),
            transcript_key,
            chunks,
        })
    }

    async fn build_chunks(&self, video_id: &str, title: &str, full_text: &str) -> crate::error::Result<Vec<Chunk>> {
        let mut chunks = self.pipeline.index(full_text);
        for chunk in chunks.iter_mut() {
            chunk.metadata.insert("video_id".to_string(), Value::from(video_id));
            chunk.metadata.insert("title".to_string(), Value::from(title));
            chunk.metadata.insert("source".to_string(), Value::from(self.pipeline.source()));
        }

        let Some(embedder) = &self.embedder else {
            return Ok(chunks);
        };

        debug!("Generating embeddings for {} chunks of {}", chunks.len(), video_id);
        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.chunk_text.clone()).collect();
        let embeddings: Vec<_> = stream::iter(texts.into_iter().map(|text| {
            let embedder = Arc::clone(embedder);
            async move { embedder.embed(&text).await }
        }))
        .buffered(EMBEDDING_CONCURRENCY)
        .collect()
        .await;

        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            let vector = embedding.map_err(|e| {
                TranscriptError::Embedding(format!("{} chunk {}: {}", video_id, chunk.chunk_index, e))
            })?;
            chunk.embedding = Some(vector);
        }

        Ok(chunks)
    }

    fn failure(
        &self,
        index: usize,
        record: CatalogRecord,
        video_id: Option<String>,
        kind: &str,
        message: String,
        start_time: Instant,
    ) -> (VideoProcessingResult, Option<FailureRecord>) {
        let result = VideoProcessingResult {
            index,
            video_id: video_id.clone(),
            title: record.title.clone(),
            status: ProcessingStatus::Failed,
            total_segments: 0,
            total_duration: 0,
            word_count: 0,
            skipped_blocks: 0,
            chunk_count: None,
            transcript_key: None,
            chunks_key: None,
            error_message: Some(message.clone()),
            processing_time: start_time.elapsed(),
        };
        let failure = FailureRecord {
            video_id,
            kind: kind.to_string(),
            error: message,
            record,
        };
        (result, Some(failure))
    }
}

#[derive(Debug, Clone)]
pub struct ProcessingStats {
    pub max_workers: usize,
    pub available_permits: usize,
}

/// Caption files (`*.vtt`) directly inside a directory, sorted by name
pub fn discover_caption_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(anyhow::anyhow!("Caption directory does not exist: {}", dir.display()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        let is_vtt = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext.eq_ignore_ascii_case("vtt"));

        if entry.file_type().is_file() && is_vtt {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

/// Build a catalog from caption file names, one record per video id
pub fn catalog_from_caption_files(files: &[PathBuf]) -> Catalog {
    let mut seen = std::collections::HashSet::new();
    let records = files
        .iter()
        .filter_map(|path| video_id_from_caption_path(path))
        .filter(|id| seen.insert(id.clone()))
        .map(CatalogRecord::with_id)
        .collect();
    Catalog::new(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use crate::storage::{DirectoryCaptionSource, LocalStore};
    use tempfile::TempDir;

    fn processor(temp_dir: &TempDir) -> BatchProcessor {
        let config = ConfigBuilder::new().with_workers(2).with_rate_limit_delay_ms(0).build();
        let captions = Arc::new(DirectoryCaptionSource::new(temp_dir.path().join("captions")));
        let store = Arc::new(LocalStore::new(temp_dir.path().join("out")));
        BatchProcessor::new(config, captions, store).unwrap()
    }

    #[tokio::test]
    async fn test_batch_processor_creation() {
        let temp_dir = TempDir::new().unwrap();
        let stats = processor(&temp_dir).get_stats();

        assert_eq!(stats.max_workers, 2);
        assert_eq!(stats.available_permits, 2);
    }

    #[tokio::test]
    async fn test_empty_catalog() {
        let temp_dir = TempDir::new().unwrap();
        let report = processor(&temp_dir).process_catalog(Catalog::default()).await.unwrap();

        assert_eq!(report.total, 0);
        assert_eq!(report.successful, 0);
        assert_eq!(report.failed, 0);
        assert!(temp_dir.path().join("out").join(REPORT_KEY).exists());
    }

    #[tokio::test]
    async fn test_discover_caption_files() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["b.en.vtt", "a.vtt", "a.en.vtt", "notes.txt"] {
            tokio::fs::write(temp_dir.path().join(name), "WEBVTT").await.unwrap();
        }
        tokio::fs::create_dir(temp_dir.path().join("nested.vtt")).await.unwrap();

        let files = discover_caption_files(temp_dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.en.vtt", "a.vtt", "b.en.vtt"]);

        let catalog = catalog_from_caption_files(&files);
        let ids: Vec<String> = catalog.records().iter().filter_map(|r| r.video_id()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_missing_directory() {
        assert!(discover_caption_files(Path::new("/definitely/not/here")).is_err());
    }
}
