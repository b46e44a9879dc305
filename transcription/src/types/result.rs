//! The canonical, provider-independent transcription result.

use std::collections::BTreeSet;

use serde::Serialize;

use super::job::Status;
use super::request::LanguageCode;
use super::segment::{EntitySpan, Segment, SentimentSpan};

/// Final result of one job. Built once by the assembler and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalResult {
    pub(crate) transcript: String,
    pub(crate) word_count: usize,
    pub(crate) confidence: Option<f64>,
    pub(crate) duration_ms: Option<i64>,
    pub(crate) language_segments: Vec<Segment>,
    pub(crate) speaker_segments: Vec<Segment>,
    pub(crate) chapters: Vec<Segment>,
    pub(crate) sentiments: Vec<SentimentSpan>,
    pub(crate) entities: Vec<EntitySpan>,
    pub(crate) detected_language: Option<LanguageCode>,
    pub(crate) language_confidence: Option<f64>,
    pub(crate) language_hint: Option<LanguageCode>,
    pub(crate) status: Status,
    pub(crate) provider_id: String,
    pub(crate) job_id: String,
}

impl CanonicalResult {
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.duration_ms
    }

    pub fn language_segments(&self) -> &[Segment] {
        &self.language_segments
    }

    pub fn speaker_segments(&self) -> &[Segment] {
        &self.speaker_segments
    }

    pub fn chapters(&self) -> &[Segment] {
        &self.chapters
    }

    pub fn sentiments(&self) -> &[SentimentSpan] {
        &self.sentiments
    }

    pub fn entities(&self) -> &[EntitySpan] {
        &self.entities
    }

    pub fn detected_language(&self) -> Option<&LanguageCode> {
        self.detected_language.as_ref()
    }

    pub fn language_confidence(&self) -> Option<f64> {
        self.language_confidence
    }

    /// The language the caller asked for, if any.
    pub fn language_hint(&self) -> Option<&LanguageCode> {
        self.language_hint.as_ref()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Distinct language labels across the language segments, sorted.
    pub fn languages_found(&self) -> Vec<&str> {
        self.language_segments
            .iter()
            .map(|s| s.label.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// True when the audio switches between more than one language.
    pub fn language_switching_detected(&self) -> bool {
        self.languages_found().len() > 1
    }
}
