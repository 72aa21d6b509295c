use serde::{Deserialize, Serialize};
use std::fmt;

use super::segment::Segment;

/// Rhetorical role of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicMarker {
    Introduction,
    Example,
    Summary,
    Definition,
}

impl TopicMarker {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopicMarker::Introduction => "introduction",
            TopicMarker::Example => "example",
            TopicMarker::Summary => "summary",
            TopicMarker::Definition => "definition",
        }
    }
}

impl fmt::Display for TopicMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classification rule: the marker and the keywords that trigger it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicRule {
    pub marker: TopicMarker,
    /// Lower-case keywords, matched as substrings
    pub keywords: Vec<String>,
}

impl TopicRule {
    pub fn new(marker: TopicMarker, keywords: &[&str]) -> Self {
        Self {
            marker,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|keyword| lowered.contains(keyword.as_str()))
    }
}

/// Ordered keyword classifier; the first matching rule wins.
///
/// Matching is plain substring containment, so "letterbox" counts as a
/// definition. The rules are a coarse heuristic, not a language model.
#[derive(Debug, Clone)]
pub struct TopicClassifier {
    rules: Vec<TopicRule>,
}

impl TopicClassifier {
    /// Classifier with the default rule table
    pub fn new() -> Self {
        Self::with_rules(Self::default_rules())
    }

    /// Classifier with a custom ordered rule table
    pub fn with_rules(rules: Vec<TopicRule>) -> Self {
        Self { rules }
    }

    pub fn default_rules() -> Vec<TopicRule> {
        vec![
            TopicRule::new(TopicMarker::Introduction, &["welcome", "introduction", "today"]),
            TopicRule::new(TopicMarker::Example, &["example", "for instance", "let's say"]),
            TopicRule::new(TopicMarker::Summary, &["conclusion", "summary", "recap", "that's"]),
            TopicRule::new(TopicMarker::Definition, &["variable", "symbol", "letter"]),
        ]
    }

    pub fn rules(&self) -> &[TopicRule] {
        &self.rules
    }

    /// Classify a piece of segment text
    pub fn classify(&self, text: &str) -> Option<TopicMarker> {
        let lowered = text.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&lowered))
            .map(|rule| rule.marker)
    }

    /// Set the topic marker of every segment
    pub fn tag(&self, segments: &mut [Segment]) {
        for segment in segments.iter_mut() {
            segment.topic_marker = self.classify(&segment.text);
        }
    }
}

impl Default for TopicClassifier {
    fn default() -> Self {
        Self::new()
    }
}
