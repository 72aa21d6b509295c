use async_trait::async_trait;
use dialogic_transcripts::error::Result as TranscriptResult;
use dialogic_transcripts::processing::{catalog_from_caption_files, discover_caption_files, REPORT_KEY};
use dialogic_transcripts::{
    BatchProcessor, CaptionSource, Catalog, Chunk, ConfigBuilder, DialogicTranscript, DirectoryCaptionSource, Embedder,
    LocalStore, ObjectStore, ProcessingStatus, TranscriptError,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::fs;

const LESSON: &str = "WEBVTT

00:00:00.000 --> 00:00:02.500
Welcome to today's lesson.

00:00:02.500 --> 00:00:05.000
Let's look at an example.
";

/// Returns a constant vector, or fails for texts containing a marker word
struct FixedEmbedder {
    dimensions: usize,
    fail_on: Option<&'static str>,
}

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, text: &str) -> TranscriptResult<Vec<f32>> {
        if let Some(marker) = self.fail_on {
            if text.contains(marker) {
                return Err(TranscriptError::Embedding("rate limited".to_string()));
            }
        }
        Ok(vec![0.5; self.dimensions])
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Caption source whose fetch panics for one video id
struct PanickyCaptions {
    inner: DirectoryCaptionSource,
    panic_on: &'static str,
}

#[async_trait]
impl CaptionSource for PanickyCaptions {
    async fn fetch(&self, video_id: &str) -> TranscriptResult<Option<String>> {
        if video_id == self.panic_on {
            panic!("caption backend crashed for {}", video_id);
        }
        self.inner.fetch(video_id).await
    }
}

struct Workspace {
    temp_dir: TempDir,
}

impl Workspace {
    async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("captions")).await.unwrap();
        Self { temp_dir }
    }

    fn captions_dir(&self) -> std::path::PathBuf {
        self.temp_dir.path().join("captions")
    }

    fn out_dir(&self) -> std::path::PathBuf {
        self.temp_dir.path().join("out")
    }

    async fn add_captions(&self, file_name: &str, content: &str) {
        fs::write(self.captions_dir().join(file_name), content).await.unwrap();
    }

    fn processor(&self, builder: ConfigBuilder) -> BatchProcessor {
        let config = builder.with_workers(3).with_rate_limit_delay_ms(0).build();
        BatchProcessor::new(
            config,
            Arc::new(DirectoryCaptionSource::new(self.captions_dir())),
            Arc::new(LocalStore::new(self.out_dir())),
        )
        .unwrap()
        .with_created("2025-01-20")
    }

    async fn read_json(&self, key: &str) -> serde_json::Value {
        let bytes = fs::read(self.out_dir().join(key)).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}

#[tokio::test]
async fn test_mixed_catalog_collects_failures() {
    let workspace = Workspace::new().await;
    workspace.add_captions("good1.en.vtt", LESSON).await;
    workspace.add_captions("broken.vtt", "WEBVTT\n\nnot a timestamp --> at all\nText\n").await;

    let catalog = Catalog::from_json(
        r#"[
            {"youtube_id": "good1", "title": "Lesson One"},
            {"title": "No identifier"},
            {"id": "missing"},
            {"youtube_id": "broken"}
        ]"#,
    )
    .unwrap();

    let report = workspace.processor(ConfigBuilder::new()).process_catalog(catalog).await.unwrap();

    assert_eq!(report.total, 4);
    assert_eq!(report.successful, 1);
    assert_eq!(report.failed, 3);

    let indices: Vec<usize> = report.results.iter().map(|r| r.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
    assert_eq!(report.results[0].status, ProcessingStatus::Completed);
    assert_eq!(report.results[0].total_segments, 2);
    assert_eq!(report.results[0].total_duration, 5);

    let kinds: Vec<&str> = report.failures.iter().map(|f| f.kind.as_str()).collect();
    assert_eq!(kinds, vec!["missing_identifier", "captions_unavailable", "empty_source"]);
    assert_eq!(report.failures[0].record.title.as_deref(), Some("No identifier"));

    let saved = workspace.read_json(REPORT_KEY).await;
    assert_eq!(saved["successful"], 1);
    assert_eq!(saved["failed"], 3);
    assert_eq!(saved["total"], 4);
}

#[tokio::test]
async fn test_transcript_written_to_processed_key() {
    let workspace = Workspace::new().await;
    workspace.add_captions("abc123.vtt", LESSON).await;

    let catalog = Catalog::from_json(r#"[{"youtube_id": "abc123", "title": "Intro to Algebra"}]"#).unwrap();
    let report = workspace
        .processor(ConfigBuilder::new().with_class_id("algebra-basics-intro"))
        .process_catalog(catalog)
        .await
        .unwrap();

    let key = "processed/abc123_dialogic_transcript.json";
    assert_eq!(report.results[0].transcript_key.as_deref(), Some(key));

    let content = fs::read_to_string(workspace.out_dir().join(key)).await.unwrap();
    let transcript = DialogicTranscript::from_json(&content).unwrap();
    assert_eq!(transcript.title, "Intro to Algebra");
    assert_eq!(transcript.class_id.as_deref(), Some("algebra-basics-intro"));
    assert_eq!(transcript.metadata.created, "2025-01-20");
    assert!(transcript.totals_consistent());
}

#[tokio::test]
async fn test_indexing_with_embeddings() {
    let workspace = Workspace::new().await;
    workspace.add_captions("abc123.en.vtt", LESSON).await;

    let catalog = Catalog::from_json(r#"[{"youtube_id": "abc123", "title": "Intro"}]"#).unwrap();
    let report = workspace
        .processor(ConfigBuilder::new().with_chunking(20, 10).enable_indexing(true))
        .with_embedder(Arc::new(FixedEmbedder {
            dimensions: 4,
            fail_on: None,
        }))
        .process_catalog(catalog)
        .await
        .unwrap();

    assert_eq!(report.successful, 1);
    let chunk_count = report.results[0].chunk_count.unwrap();
    assert!(chunk_count > 1);

    let content = fs::read(workspace.out_dir().join("chunks/abc123_chunks.json")).await.unwrap();
    let chunks: Vec<Chunk> = serde_json::from_slice(&content).unwrap();
    assert_eq!(chunks.len(), chunk_count);
    for chunk in &chunks {
        assert_eq!(chunk.embedding.as_deref(), Some(&[0.5f32; 4][..]));
        assert_eq!(chunk.metadata["video_id"], "abc123");
        assert_eq!(chunk.metadata["source"], "khan-academy");
    }
}

#[tokio::test]
async fn test_embedding_failure_fails_video() {
    let workspace = Workspace::new().await;
    workspace.add_captions("abc123.vtt", LESSON).await;

    let catalog = Catalog::from_json(r#"[{"youtube_id": "abc123"}]"#).unwrap();
    let report = workspace
        .processor(ConfigBuilder::new().with_chunking(20, 0).enable_indexing(true))
        .with_embedder(Arc::new(FixedEmbedder {
            dimensions: 4,
            fail_on: Some("example"),
        }))
        .process_catalog(catalog)
        .await
        .unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.failures[0].kind, "embedding");
    assert!(report.failures[0].error.contains("abc123 chunk"));
    assert!(!workspace.out_dir().join("chunks/abc123_chunks.json").exists());
}

#[tokio::test]
async fn test_max_videos_limits_catalog() {
    let workspace = Workspace::new().await;
    for id in ["a", "b", "c"] {
        workspace.add_captions(&format!("{}.vtt", id), LESSON).await;
    }

    let catalog = Catalog::from_json(r#"[{"id": "a"}, {"id": "b"}, {"id": "c"}]"#).unwrap();
    let report = workspace
        .processor(ConfigBuilder::new().with_max_videos(2))
        .process_catalog(catalog)
        .await
        .unwrap();

    assert_eq!(report.total, 2);
    assert!(!workspace.out_dir().join("processed/c_dialogic_transcript.json").exists());
}

#[tokio::test]
async fn test_caption_directory_batch() {
    let workspace = Workspace::new().await;
    workspace.add_captions("one.en.vtt", LESSON).await;
    workspace.add_captions("two.vtt", LESSON).await;
    workspace.add_captions("readme.txt", "not captions").await;

    let files = discover_caption_files(&workspace.captions_dir()).unwrap();
    assert_eq!(files.len(), 2);

    let report = workspace
        .processor(ConfigBuilder::new())
        .process_catalog(catalog_from_caption_files(&files))
        .await
        .unwrap();

    assert_eq!(report.successful, 2);
    for id in ["one", "two"] {
        let key = format!("processed/{}_dialogic_transcript.json", id);
        assert!(workspace.out_dir().join(Path::new(&key)).exists());
    }
}

#[tokio::test]
async fn test_panicking_worker_is_reported() {
    let workspace = Workspace::new().await;
    workspace.add_captions("good.vtt", LESSON).await;

    let config = ConfigBuilder::new().with_workers(2).with_rate_limit_delay_ms(0).build();
    let processor = BatchProcessor::new(
        config,
        Arc::new(PanickyCaptions {
            inner: DirectoryCaptionSource::new(workspace.captions_dir()),
            panic_on: "bad",
        }),
        Arc::new(LocalStore::new(workspace.out_dir())),
    )
    .unwrap();

    let catalog = Catalog::from_json(r#"[{"id": "bad", "title": "Crashes"}, {"id": "good"}]"#).unwrap();
    let report = processor.process_catalog(catalog).await.unwrap();

    assert_eq!(report.total, 2);
    assert_eq!(report.successful, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.results[0].status, ProcessingStatus::Failed);
    assert_eq!(report.results[1].status, ProcessingStatus::Completed);

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].kind, "worker_panic");
    assert_eq!(report.failures[0].video_id.as_deref(), Some("bad"));
    assert_eq!(report.failures[0].record.title.as_deref(), Some("Crashes"));

    let saved = workspace.read_json(REPORT_KEY).await;
    assert_eq!(saved["total"], 2);
    assert_eq!(saved["failed"], 1);
}

#[tokio::test]
async fn test_unparseable_timestamps_do_not_abort_batch() {
    let workspace = Workspace::new().await;
    workspace
        .add_captions(
            "huge.vtt",
            "WEBVTT\n\n9999999999999999:00:00.000 --> 9999999999999999:00:01.000\nhuge\n\n00:00:01.000 --> 00:00:02.000\nWelcome\n",
        )
        .await;
    workspace.add_captions("good.vtt", LESSON).await;

    let catalog = Catalog::from_json(r#"[{"id": "huge"}, {"id": "good"}]"#).unwrap();
    let report = workspace.processor(ConfigBuilder::new()).process_catalog(catalog).await.unwrap();

    assert_eq!(report.total, 2);
    assert_eq!(report.successful, 2);
    assert_eq!(report.results[0].total_segments, 1);
    assert_eq!(report.results[0].skipped_blocks, 1);
}

#[test]
fn test_local_store_from_sync_context() {
    let temp_dir = TempDir::new().unwrap();
    let store = LocalStore::new(temp_dir.path());

    tokio_test::block_on(async {
        store
            .put("metadata/note.json", b"{\"ok\":true}".to_vec(), "application/json")
            .await
            .unwrap();
        let bytes = store.get("metadata/note.json").await.unwrap().unwrap();
        assert_eq!(bytes, b"{\"ok\":true}");
    });
}
