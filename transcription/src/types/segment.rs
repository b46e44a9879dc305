//! Timed spans produced by providers.

use serde::{Deserialize, Serialize};

/// Which detector produced a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Language,
    Speaker,
    Chapter,
}

/// A labeled time span: a language run, a speaker turn, or a chapter.
///
/// For language segments `label` is the language code, for speaker segments the
/// speaker name, for chapters the headline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub kind: SegmentKind,
    pub start_ms: i64,
    pub end_ms: i64,
    pub label: String,
    pub text: String,
    pub confidence: f64,
}

impl Segment {
    pub fn new(
        kind: SegmentKind,
        start_ms: i64,
        end_ms: i64,
        label: impl Into<String>,
        text: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            kind,
            start_ms,
            end_ms,
            label: label.into(),
            text: text.into(),
            confidence,
        }
    }

    pub fn duration_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }

    /// Half-open `[start, end)` intersection test.
    pub fn overlaps(&self, other: &Segment) -> bool {
        self.start_ms < other.end_ms && other.start_ms < self.end_ms
    }
}

/// Emotional tone classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

/// Sentiment detected for a stretch of speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSpan {
    pub text: String,
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub start_ms: i64,
    pub end_ms: i64,
    pub speaker: Option<String>,
}

/// Named entity (person, location, ...) found in the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpan {
    pub entity_type: String,
    pub text: String,
    pub start_ms: i64,
    pub end_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_is_half_open() {
        let a = Segment::new(SegmentKind::Speaker, 0, 1000, "A", "", 0.9);
        let b = Segment::new(SegmentKind::Speaker, 1000, 2000, "B", "", 0.9);
        let c = Segment::new(SegmentKind::Speaker, 999, 1500, "C", "", 0.9);

        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
    }
}
