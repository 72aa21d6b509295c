use serde::{Deserialize, Serialize};

use super::topics::TopicMarker;
use super::vtt::Cue;

/// Dialogic playback unit derived from exactly one cue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// 1-based position in the transcript
    pub segment_id: u32,
    pub text: String,
    /// Start time in whole seconds (truncated)
    pub start_time: u64,
    /// End time in whole seconds (truncated)
    pub end_time: u64,
    /// `end_time - start_time`, never negative
    pub duration: u64,
    pub allows_questions: bool,
    /// Pause inserted after the segment during interactive playback (ms)
    pub pause_duration: u64,
    pub topic_marker: Option<TopicMarker>,
}

/// Pacing rules for the pause inserted after each segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Lower bound in milliseconds
    pub min_pause_ms: u64,
    /// Upper bound in milliseconds
    pub max_pause_ms: u64,
    /// Milliseconds of pause per second of segment
    pub pause_ms_per_second: f64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_pause_ms: 1500,
            max_pause_ms: 3000,
            pause_ms_per_second: 200.0,
        }
    }
}

impl PacingConfig {
    /// Pause for a segment of the given length, clamped to the configured bounds
    pub fn pause_for(&self, duration_seconds: f64) -> u64 {
        let proportional = (duration_seconds.max(0.0) * self.pause_ms_per_second).round();
        (proportional as u64).clamp(self.min_pause_ms, self.max_pause_ms)
    }
}

/// A caption record from a processed-transcript JSON, which may carry either
/// an end time or a duration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionRecord {
    #[serde(default, alias = "start")]
    pub start_time: f64,
    #[serde(default, alias = "end")]
    pub end_time: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub text: String,
}

impl CaptionRecord {
    /// Convert to a cue, deriving the end time from the duration when needed
    pub fn into_cue(self) -> Cue {
        let end = match (self.end_time, self.duration) {
            (Some(end), _) => end,
            (None, Some(duration)) => self.start_time + duration,
            (None, None) => self.start_time,
        };
        Cue::new(self.start_time, end, super::vtt::CaptionParser::clean_text(&self.text))
    }
}

/// Converts cues into dialogic segments
#[derive(Debug, Clone, Default)]
pub struct SegmentBuilder {
    pacing: PacingConfig,
}

impl SegmentBuilder {
    pub fn new(pacing: PacingConfig) -> Self {
        Self { pacing }
    }

    pub fn pacing(&self) -> &PacingConfig {
        &self.pacing
    }

    /// Build one segment per cue, in order; topic markers are left unset
    pub fn build(&self, cues: &[Cue]) -> Vec<Segment> {
        cues.iter()
            .enumerate()
            .map(|(index, cue)| self.build_segment(index as u32 + 1, cue))
            .collect()
    }

    fn build_segment(&self, segment_id: u32, cue: &Cue) -> Segment {
        let start_time = truncate_seconds(cue.start);
        let end_time = truncate_seconds(cue.end);

        Segment {
            segment_id,
            text: cue.text.clone(),
            start_time,
            end_time,
            duration: end_time.saturating_sub(start_time),
            allows_questions: true,
            pause_duration: self.pacing.pause_for(cue.duration()),
            topic_marker: None,
        }
    }
}

/// Integer seconds, truncated toward zero; negative inputs become 0
fn truncate_seconds(seconds: f64) -> u64 {
    seconds.max(0.0).trunc() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_truncates_times() {
        let cues = vec![
            Cue::new(0.0, 2.5, "Welcome to today's lesson."),
            Cue::new(2.5, 5.0, "Let's look at an example."),
        ];
        let segments = SegmentBuilder::default().build(&cues);

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].segment_id, 1);
        assert_eq!((segments[0].start_time, segments[0].end_time, segments[0].duration), (0, 2, 2));
        assert_eq!(segments[1].segment_id, 2);
        assert_eq!((segments[1].start_time, segments[1].end_time, segments[1].duration), (2, 5, 3));
        assert!(segments.iter().all(|s| s.allows_questions && s.topic_marker.is_none()));
    }

    #[test]
    fn test_zero_length_segment_is_kept() {
        let cues = vec![Cue::new(3.1, 3.9, "uh")];
        let segments = SegmentBuilder::default().build(&cues);

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].duration, 0);
        assert_eq!(segments[0].pause_duration, 1500);
    }

    #[test]
    fn test_pause_duration_bounds() {
        let pacing = PacingConfig::default();
        assert_eq!(pacing.pause_for(0.0), 1500);
        assert_eq!(pacing.pause_for(7.5), 1500);
        assert_eq!(pacing.pause_for(10.0), 2000);
        assert_eq!(pacing.pause_for(12.34), 2468);
        assert_eq!(pacing.pause_for(15.0), 3000);
        assert_eq!(pacing.pause_for(600.0), 3000);
    }

    #[test]
    fn test_pause_within_bounds_for_many_lengths() {
        let builder = SegmentBuilder::default();
        let cues: Vec<Cue> = (0..200)
            .map(|i| Cue::new(i as f64, i as f64 + (i as f64) * 0.173 + 0.01, "x"))
            .collect();

        for segment in builder.build(&cues) {
            assert!((1500..=3000).contains(&segment.pause_duration));
        }
    }

    #[test]
    fn test_caption_record_with_duration_only() {
        let record: CaptionRecord =
            serde_json::from_str(r#"{"start_time": 4.2, "duration": 3.0, "text": "hello  world"}"#).unwrap();
        let cue = record.into_cue();

        assert_eq!(cue.start, 4.2);
        assert!((cue.end - 7.2).abs() < 1e-9);
        assert_eq!(cue.text, "hello world");

        let segment = &SegmentBuilder::default().build(&[cue])[0];
        assert_eq!((segment.start_time, segment.end_time, segment.duration), (4, 7, 3));
    }

    #[test]
    fn test_caption_record_prefers_end_time() {
        let record: CaptionRecord =
            serde_json::from_str(r#"{"start": 1.0, "end": 2.0, "duration": 9.0, "text": "a"}"#).unwrap();
        assert_eq!(record.into_cue().end, 2.0);
    }
}
