//! Provider-native transcription payload, normalized just enough to be read.

use super::request::LanguageCode;
use super::segment::{EntitySpan, Segment, SegmentKind, SentimentSpan};

/// Result of a finished job as an adapter decoded it.
///
/// Adapters build it with the `with_*` methods. Everything downstream reads it
/// through accessors only; segment lists are raw hypotheses and may overlap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResult {
    transcript: String,
    confidence: Option<f64>,
    duration_ms: Option<i64>,
    reported_word_count: Option<usize>,
    detected_language: Option<LanguageCode>,
    language_confidence: Option<f64>,
    segments: Vec<Segment>,
    sentiments: Vec<SentimentSpan>,
    entities: Vec<EntitySpan>,
}

impl RawResult {
    pub fn new(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            ..Self::default()
        }
    }

    pub fn with_confidence(mut self, confidence: Option<f64>) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: Option<i64>) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_reported_word_count(mut self, count: Option<usize>) -> Self {
        self.reported_word_count = count;
        self
    }

    pub fn with_detected_language(
        mut self,
        language: Option<LanguageCode>,
        confidence: Option<f64>,
    ) -> Self {
        self.detected_language = language;
        self.language_confidence = confidence;
        self
    }

    pub fn with_segments(mut self, segments: impl IntoIterator<Item = Segment>) -> Self {
        self.segments.extend(segments);
        self
    }

    pub fn with_sentiments(mut self, sentiments: Vec<SentimentSpan>) -> Self {
        self.sentiments = sentiments;
        self
    }

    pub fn with_entities(mut self, entities: Vec<EntitySpan>) -> Self {
        self.entities = entities;
        self
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.duration_ms
    }

    /// Word count as claimed by the provider. Informational only.
    pub fn reported_word_count(&self) -> Option<usize> {
        self.reported_word_count
    }

    pub fn detected_language(&self) -> Option<&LanguageCode> {
        self.detected_language.as_ref()
    }

    pub fn language_confidence(&self) -> Option<f64> {
        self.language_confidence
    }

    /// All raw segment hypotheses of one kind, in provider order.
    pub fn segments(&self, kind: SegmentKind) -> impl Iterator<Item = &Segment> + '_ {
        self.segments.iter().filter(move |s| s.kind == kind)
    }

    pub fn sentiments(&self) -> &[SentimentSpan] {
        &self.sentiments
    }

    pub fn entities(&self) -> &[EntitySpan] {
        &self.entities
    }
}
