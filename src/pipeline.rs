use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{ParseError, Result, TranscriptError};
use crate::transcript::{
    CaptionParser, CaptionRecord, Chunk, Chunker, Cue, DialogicTranscript, SegmentBuilder, TopicClassifier,
    TranscriptAssembler,
};

/// A converted transcript together with what was learned along the way
#[derive(Debug, Clone)]
pub struct ConvertedTranscript {
    pub transcript: DialogicTranscript,
    /// Cue texts joined with single spaces, input for chunking
    pub full_text: String,
    pub word_count: usize,
    /// Caption blocks that could not be parsed
    pub skipped: Vec<ParseError>,
}

/// Parser, segment builder, classifier, assembler and chunker wired together
#[derive(Debug, Clone)]
pub struct TranscriptPipeline {
    parser: CaptionParser,
    builder: SegmentBuilder,
    classifier: TopicClassifier,
    assembler: TranscriptAssembler,
    chunker: Chunker,
    source: String,
}

impl TranscriptPipeline {
    pub fn new(
        builder: SegmentBuilder,
        classifier: TopicClassifier,
        assembler: TranscriptAssembler,
        chunker: Chunker,
        source: impl Into<String>,
    ) -> Self {
        Self {
            parser: CaptionParser::new(),
            builder,
            classifier,
            assembler,
            chunker,
            source: source.into(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let mut assembler = TranscriptAssembler::new();
        if let Some(class_id) = &config.metadata.class_id {
            assembler = assembler.with_class_id(class_id.clone());
        }

        Ok(Self::new(
            SegmentBuilder::new(config.pacing_config()),
            TopicClassifier::new(),
            assembler,
            Chunker::new(config.chunker_config())?,
            config.metadata.source.clone(),
        ))
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Convert raw caption text into a dialogic transcript
    pub fn convert(&self, video_id: &str, title: &str, caption_text: &str, created: &str) -> Result<DialogicTranscript> {
        Ok(self.convert_detailed(video_id, title, caption_text, created)?.transcript)
    }

    /// Like `convert`, also returning the flattened text and skipped blocks
    pub fn convert_detailed(
        &self,
        video_id: &str,
        title: &str,
        caption_text: &str,
        created: &str,
    ) -> Result<ConvertedTranscript> {
        let parsed = self.parser.parse_with_report(caption_text);
        for skipped in &parsed.skipped {
            warn!("⚠️ {}: skipped {}", video_id, skipped);
        }

        let transcript = self.assemble_cues(video_id, title, &parsed.cues, created)?;
        let full_text = full_text(&parsed.cues);

        Ok(ConvertedTranscript {
            word_count: word_count(&full_text),
            transcript,
            full_text,
            skipped: parsed.skipped,
        })
    }

    /// Convert caption records from a processed-transcript JSON
    pub fn convert_records(
        &self,
        video_id: &str,
        title: &str,
        records: Vec<CaptionRecord>,
        created: &str,
    ) -> Result<DialogicTranscript> {
        let cues: Vec<Cue> = records
            .into_iter()
            .map(CaptionRecord::into_cue)
            .filter(|cue| !cue.text.is_empty())
            .collect();

        self.assemble_cues(video_id, title, &cues, created)
    }

    fn assemble_cues(&self, video_id: &str, title: &str, cues: &[Cue], created: &str) -> Result<DialogicTranscript> {
        if cues.is_empty() {
            return Err(TranscriptError::EmptySource {
                video_id: video_id.to_string(),
            });
        }

        let mut segments = self.builder.build(cues);
        self.classifier.tag(&mut segments);

        let transcript = self.assembler.assemble(video_id, title, segments, self.source.as_str(), created);
        debug!(
            "📝 {}: {} segments, {}s total",
            video_id, transcript.total_segments, transcript.total_duration
        );
        Ok(transcript)
    }

    /// Split flattened transcript text into retrieval chunks
    pub fn index(&self, text: &str) -> Vec<Chunk> {
        self.chunker.chunk(text)
    }
}

/// Join cue texts with single spaces
pub fn full_text(cues: &[Cue]) -> String {
    cues.iter().map(|cue| cue.text.as_str()).collect::<Vec<_>>().join(" ")
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Date stamp used for the `created` metadata field
pub fn today_stamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}
