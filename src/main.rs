use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use dialogic_transcripts::pipeline::{full_text, today_stamp};
use dialogic_transcripts::processing::{catalog_from_caption_files, discover_caption_files, BatchReport};
use dialogic_transcripts::{
    BatchProcessor, CaptionParser, Catalog, Config, DialogicTranscript, DirectoryCaptionSource, LocalStore,
    OpenAIEmbedder, TranscriptPipeline,
};

#[derive(Parser)]
#[command(name = "dialogic")]
#[command(version, author = "TigreRoll")]
#[command(about = "Convert video captions into dialogic transcripts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to dialogic.toml or config/dialogic.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output directory for results
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// Number of parallel workers
    #[arg(short, long, global = true)]
    workers: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a single WebVTT file into a dialogic transcript
    Convert {
        /// Caption file
        input: PathBuf,
        /// Video identifier (defaults to the file name)
        #[arg(long)]
        video_id: Option<String>,
        /// Transcript title (defaults to the video identifier)
        #[arg(long)]
        title: Option<String>,
        /// Write the transcript here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Convert every caption file in a directory
    ConvertDir {
        /// Directory containing `{video_id}.en.vtt` or `{video_id}.vtt` files
        input_dir: PathBuf,
    },
    /// Split captions, a transcript JSON, or plain text into retrieval chunks
    Chunk {
        /// Input file (.vtt, transcript .json, or text)
        input: PathBuf,
        /// Target chunk size in characters
        #[arg(long)]
        chunk_size: Option<usize>,
        /// Overlap in characters (one word per 10)
        #[arg(long)]
        overlap: Option<usize>,
        /// Write chunks here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Process a discovery catalog
    Batch {
        /// Catalog JSON file
        #[arg(long)]
        catalog: PathBuf,
        /// Directory containing the catalog's caption files
        #[arg(long)]
        captions_dir: PathBuf,
        /// Process at most this many videos
        #[arg(long = "max")]
        max_videos: Option<usize>,
        /// Chunk transcripts for retrieval
        #[arg(long)]
        index: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => Config::from_file(path),
        None => Config::load(),
    };
    let (mut config, load_error) = match loaded {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("dialogic_transcripts=debug,dialogic=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.output.log_level))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Some(e) = load_error {
        warn!("Failed to load config, using defaults: {}", e);
    }

    if let Some(output_dir) = cli.output_dir {
        config.output.base_dir = output_dir;
    }
    if let Some(workers) = cli.workers {
        config.batch.max_workers = workers;
    }
    config.validate()?;

    info!("🚀 Dialogic transcripts starting...");

    match cli.command {
        Commands::Convert {
            input,
            video_id,
            title,
            output,
        } => convert_file(&config, &input, video_id, title, output).await,
        Commands::ConvertDir { input_dir } => {
            let files = discover_caption_files(&input_dir)?;
            info!("📁 Found {} caption files in {}", files.len(), input_dir.display());
            let catalog = catalog_from_caption_files(&files);
            let report = run_batch(config, catalog, &input_dir).await?;
            print_report(&report);
            Ok(())
        }
        Commands::Chunk {
            input,
            chunk_size,
            overlap,
            output,
        } => {
            if let Some(chunk_size) = chunk_size {
                config.pipeline.chunk_size = chunk_size;
            }
            if let Some(overlap) = overlap {
                config.pipeline.chunk_overlap = overlap;
            }
            chunk_file(&config, &input, output).await
        }
        Commands::Batch {
            catalog,
            captions_dir,
            max_videos,
            index,
        } => {
            if let Some(max) = max_videos {
                config.batch.max_videos = Some(max);
            }
            if index {
                config.batch.index_chunks = true;
            }
            let catalog = Catalog::load(&catalog).await?;
            let report = run_batch(config, catalog, &captions_dir).await?;
            print_report(&report);
            Ok(())
        }
    }
}

async fn convert_file(
    config: &Config,
    input: &Path,
    video_id: Option<String>,
    title: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let caption_text = tokio::fs::read_to_string(input)
        .await
        .map_err(|e| anyhow!("Cannot read {}: {}", input.display(), e))?;

    let video_id = video_id
        .or_else(|| dialogic_transcripts::catalog::video_id_from_caption_path(input))
        .ok_or_else(|| anyhow!("Cannot derive a video id from {}", input.display()))?;
    let title = title.unwrap_or_else(|| video_id.clone());

    let pipeline = TranscriptPipeline::from_config(config)?;
    let converted = pipeline.convert_detailed(&video_id, &title, &caption_text, &today_stamp())?;
    let json = converted.transcript.to_json_pretty()?;

    info!(
        "✅ {}: {} segments, {}s, {} skipped blocks",
        video_id,
        converted.transcript.total_segments,
        converted.transcript.total_duration,
        converted.skipped.len()
    );

    write_output(output.as_deref(), &json).await
}

async fn chunk_file(config: &Config, input: &Path, output: Option<PathBuf>) -> Result<()> {
    let content = tokio::fs::read_to_string(input)
        .await
        .map_err(|e| anyhow!("Cannot read {}: {}", input.display(), e))?;

    let text = match input.extension().and_then(|ext| ext.to_str()) {
        Some("vtt") => full_text(&CaptionParser::new().parse(&content)),
        Some("json") => {
            let transcript = DialogicTranscript::from_json(&content)?;
            transcript
                .segments
                .iter()
                .map(|segment| segment.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        }
        _ => content,
    };

    let pipeline = TranscriptPipeline::from_config(config)?;
    let chunks = pipeline.index(&text);
    info!("📦 Produced {} chunks from {}", chunks.len(), input.display());

    write_output(output.as_deref(), &serde_json::to_string_pretty(&chunks)?).await
}

async fn run_batch(config: Config, catalog: Catalog, captions_dir: &Path) -> Result<BatchReport> {
    info!("{}", config.summary());

    let store = Arc::new(LocalStore::new(config.output.base_dir.clone()));
    let captions = Arc::new(DirectoryCaptionSource::new(captions_dir));
    let embedding = config.embedding.clone();

    let mut processor = BatchProcessor::new(config, captions, store)?;
    if embedding.enabled {
        processor = processor.with_embedder(Arc::new(OpenAIEmbedder::new(embedding)?));
    }

    processor.process_catalog(catalog).await
}

async fn write_output(output: Option<&Path>, json: &str) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(path, json).await?;
            info!("💾 Saved to: {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn print_report(report: &BatchReport) {
    info!("🎉 Processing completed in {:.2}s", report.total_time.as_secs_f64());
    info!("✅ Successful: {}", report.successful);
    info!("❌ Failed: {}", report.failed);
    info!("📊 Success rate: {:.1}%", report.success_rate());

    for failure in &report.failures {
        error!(
            "   {} [{}]: {}",
            failure.video_id.as_deref().unwrap_or("<no id>"),
            failure.kind,
            failure.error
        );
    }
}
