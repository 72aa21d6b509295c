use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::error::ParseError;

/// A single timed caption entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Cleaned caption text
    pub text: String,
}

impl Cue {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    /// Build a cue from a source that reports a duration instead of an end time
    pub fn from_duration(start: f64, duration: f64, text: impl Into<String>) -> Self {
        Self::new(start, start + duration, text)
    }

    /// Length of the cue in seconds
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} --> {}\n{}\n",
            format_timestamp(self.start),
            format_timestamp(self.end),
            self.text
        )
    }
}

/// Outcome of parsing one caption file
#[derive(Debug, Clone, Default)]
pub struct ParsedCaptions {
    /// Cues in file order
    pub cues: Vec<Cue>,
    /// Blocks that were skipped because they could not be parsed
    pub skipped: Vec<ParseError>,
}

impl ParsedCaptions {
    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }
}

/// Parser for WebVTT-style caption files
#[derive(Debug, Clone, Default)]
pub struct CaptionParser;

impl CaptionParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse caption text into cues, skipping malformed blocks
    pub fn parse(&self, text: &str) -> Vec<Cue> {
        self.parse_with_report(text).cues
    }

    /// Parse caption text and keep track of every block that was skipped
    pub fn parse_with_report(&self, text: &str) -> ParsedCaptions {
        let normalized = text.trim_start_matches('\u{feff}').replace("\r\n", "\n").replace('\r', "\n");
        let mut parsed = ParsedCaptions::default();

        for (index, block) in split_blocks(&normalized).into_iter().enumerate() {
            let position = index + 1;
            match parse_block(position, &block) {
                Ok(Some(cue)) => parsed.cues.push(cue),
                Ok(None) => {}
                Err(e) => {
                    warn!("Skipping malformed {}", e);
                    parsed.skipped.push(e);
                }
            }
        }

        debug!(
            "Parsed {} cues ({} blocks skipped)",
            parsed.cues.len(),
            parsed.skipped.len()
        );
        parsed
    }

    /// Parse a single `HH:MM:SS.mmm` (or `MM:SS.mmm`) timestamp into seconds
    pub fn parse_timestamp(timestamp: &str) -> Result<f64, String> {
        parse_timestamp(timestamp)
    }

    /// Clean caption text: strip markup, collapse whitespace, trim
    pub fn clean_text(text: &str) -> String {
        clean_text(text)
    }
}

/// Group lines into blank-line separated blocks
fn split_blocks(text: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
}

/// Blocks that never carry a cue
const NON_CUE_BLOCKS: [&str; 4] = ["WEBVTT", "NOTE", "STYLE", "REGION"];

/// Returns `Ok(None)` for blocks that carry no cue (header, NOTE, STYLE, REGION) or
/// whose text is empty after cleaning
fn parse_block(position: usize, lines: &[&str]) -> Result<Option<Cue>, ParseError> {
    let Some(timing_index) = lines.iter().position(|line| line.contains("-->")) else {
        let first = lines.first().map_or("", |line| line.trim_start());
        if NON_CUE_BLOCKS.iter().any(|keyword| first.starts_with(keyword)) {
            return Ok(None);
        }
        return Err(ParseError::new(position, "missing timing line"));
    };

    let (start, end) = parse_timing_line(lines[timing_index]).map_err(|reason| ParseError::new(position, reason))?;

    if end <= start {
        return Err(ParseError::new(
            position,
            format!("end time {:.3}s is not after start time {:.3}s", end, start),
        ));
    }

    let text = clean_text(&lines[timing_index + 1..].join("\n"));
    if text.is_empty() {
        return Ok(None);
    }

    Ok(Some(Cue::new(start, end, text)))
}

fn parse_timing_line(line: &str) -> Result<(f64, f64), String> {
    let (left, right) = line
        .split_once("-->")
        .ok_or_else(|| format!("missing '-->' in timing line '{}'", line))?;

    // Cue settings such as `align:start position:0%` may follow the end time
    let end_token = right
        .split_whitespace()
        .next()
        .ok_or_else(|| format!("missing end timestamp in '{}'", line.trim()))?;

    let start = parse_timestamp(left.trim())?;
    let end = parse_timestamp(end_token)?;
    Ok((start, end))
}

fn parse_timestamp(timestamp: &str) -> Result<f64, String> {
    let invalid = || format!("invalid timestamp '{}'", timestamp);

    let parts: Vec<&str> = timestamp.split(':').collect();
    let (hours, minutes, seconds_field) = match parts.as_slice() {
        [h, m, s] => (parse_digits(h).ok_or_else(invalid)?, parse_digits(m).ok_or_else(invalid)?, *s),
        [m, s] => (0, parse_digits(m).ok_or_else(invalid)?, *s),
        _ => return Err(invalid()),
    };

    let (whole, millis) = match seconds_field.split_once('.') {
        Some((whole, millis)) if millis.len() == 3 => (
            parse_digits(whole).ok_or_else(invalid)?,
            parse_digits(millis).ok_or_else(invalid)?,
        ),
        Some(_) => return Err(invalid()),
        None => (parse_digits(seconds_field).ok_or_else(invalid)?, 0),
    };

    if minutes >= 60 || whole >= 60 {
        return Err(format!("timestamp field out of range in '{}'", timestamp));
    }

    let total_seconds = hours
        .checked_mul(3600)
        .and_then(|h| h.checked_add(minutes * 60 + whole))
        .ok_or_else(|| format!("timestamp out of range in '{}'", timestamp))?;

    Ok(total_seconds as f64 + millis as f64 / 1000.0)
}

fn parse_digits(field: &str) -> Option<u64> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

fn markup_regex() -> &'static Regex {
    static MARKUP: OnceLock<Regex> = OnceLock::new();
    MARKUP.get_or_init(|| Regex::new(r"<[^>]*>").expect("markup pattern is valid"))
}

fn clean_text(text: &str) -> String {
    markup_regex()
        .replace_all(text, "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Format seconds as a WebVTT timestamp (HH:MM:SS.mmm)
pub fn format_timestamp(seconds: f64) -> String {
    let total_millis = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let secs = (total_millis % 60_000) / 1000;
    let millis = total_millis % 1000;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}
