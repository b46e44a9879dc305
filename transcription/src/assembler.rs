//! Builds the canonical result from a raw result and reconciled segments.

use crate::reconciler::ReconciledSegments;
use crate::types::job::JobHandle;
use crate::types::raw::RawResult;
use crate::types::request::LanguageCode;
use crate::types::result::CanonicalResult;
use crate::types::segment::Segment;

/// Assemble the canonical result. Pure and deterministic for identical inputs.
///
/// Word count always comes from whitespace tokenization of the transcript.
/// Confidence is the length-weighted average over the language segments (or the
/// speaker segments when no language runs exist); without segments the provider's
/// overall figure is used.
pub fn assemble(
    raw: &RawResult,
    segments: ReconciledSegments,
    handle: &JobHandle,
    language_hint: Option<&LanguageCode>,
) -> CanonicalResult {
    let contributing = if segments.language.is_empty() {
        &segments.speaker
    } else {
        &segments.language
    };
    let confidence = weighted_confidence(contributing)
        .or(raw.confidence())
        .map(|c| c.clamp(0.0, 1.0));

    let mut sentiments = raw.sentiments().to_vec();
    sentiments.sort_by_key(|s| (s.start_ms, s.end_ms));
    let mut entities = raw.entities().to_vec();
    entities.sort_by_key(|e| (e.start_ms, e.end_ms));

    CanonicalResult {
        transcript: raw.transcript().to_string(),
        word_count: word_count(raw.transcript()),
        confidence,
        duration_ms: raw.duration_ms(),
        language_segments: segments.language,
        speaker_segments: segments.speaker,
        chapters: segments.chapters,
        sentiments,
        entities,
        detected_language: raw.detected_language().cloned(),
        language_confidence: raw.language_confidence(),
        language_hint: language_hint.cloned(),
        status: handle.status,
        provider_id: handle.provider_id.clone(),
        job_id: handle.external_job_id.clone(),
    }
}

pub fn word_count(transcript: &str) -> usize {
    transcript.split_whitespace().count()
}

/// Length-weighted mean confidence, `None` for an empty or zero-length set.
pub fn weighted_confidence(segments: &[Segment]) -> Option<f64> {
    let (weighted, total) = segments.iter().fold((0.0, 0.0), |(weighted, total), s| {
        let len = s.duration_ms().max(0) as f64;
        (weighted + s.confidence * len, total + len)
    });

    if total > 0.0 {
        Some(weighted / total)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::job::Status;
    use crate::types::segment::SegmentKind;

    fn completed_handle() -> JobHandle {
        JobHandle::completed("assemblyai", "job-42")
    }

    #[test]
    fn test_hello_world_result() {
        let raw = RawResult::new("hello world")
            .with_confidence(Some(0.9))
            .with_duration_ms(Some(2000));

        let result = assemble(&raw, ReconciledSegments::default(), &completed_handle(), None);

        assert_eq!(result.transcript(), "hello world");
        assert_eq!(result.word_count(), 2);
        assert_eq!(result.confidence(), Some(0.9));
        assert_eq!(result.duration_ms(), Some(2000));
        assert_eq!(result.status(), Status::Completed);
        assert_eq!(result.provider_id(), "assemblyai");
        assert_eq!(result.job_id(), "job-42");
    }

    #[test]
    fn test_word_count_ignores_provider_figure() {
        let raw = RawResult::new("  namaste\tduniya \n hello  ").with_reported_word_count(Some(17));

        let result = assemble(&raw, ReconciledSegments::default(), &completed_handle(), None);
        assert_eq!(result.word_count(), 3);
    }

    #[test]
    fn test_word_count_of_empty_transcript() {
        assert_eq!(word_count(""), 0);
        assert_eq!(word_count("   "), 0);
    }

    #[test]
    fn test_confidence_is_length_weighted() {
        let segments = ReconciledSegments {
            language: vec![
                Segment::new(SegmentKind::Language, 0, 9000, "hi", "", 1.0),
                Segment::new(SegmentKind::Language, 9000, 10_000, "en", "", 0.0),
            ],
            ..ReconciledSegments::default()
        };
        let raw = RawResult::new("a b").with_confidence(Some(0.1));

        let result = assemble(&raw, segments, &completed_handle(), None);
        let confidence = result.confidence().unwrap();
        assert!((confidence - 0.9).abs() < 1e-9, "got {confidence}");
    }

    #[test]
    fn test_speaker_segments_contribute_without_language_runs() {
        let segments = ReconciledSegments {
            speaker: vec![
                Segment::new(SegmentKind::Speaker, 0, 1000, "A", "", 0.5),
                Segment::new(SegmentKind::Speaker, 1000, 4000, "B", "", 0.9),
            ],
            ..ReconciledSegments::default()
        };

        let result = assemble(&RawResult::new("x"), segments, &completed_handle(), None);
        let confidence = result.confidence().unwrap();
        assert!((confidence - 0.8).abs() < 1e-9, "got {confidence}");
    }

    #[test]
    fn test_language_switching_is_derived_from_segments() {
        let segments = ReconciledSegments {
            language: vec![
                Segment::new(SegmentKind::Language, 0, 1000, "hi", "", 0.8),
                Segment::new(SegmentKind::Language, 1000, 2000, "en", "", 0.8),
                Segment::new(SegmentKind::Language, 2000, 3000, "hi", "", 0.8),
            ],
            ..ReconciledSegments::default()
        };

        let result = assemble(&RawResult::new("x"), segments, &completed_handle(), None);
        assert!(result.language_switching_detected());
        assert_eq!(result.languages_found(), vec!["en", "hi"]);

        let single = assemble(
            &RawResult::new("x"),
            ReconciledSegments::default(),
            &completed_handle(),
            None,
        );
        assert!(!single.language_switching_detected());
    }

    #[test]
    fn test_assembly_is_deterministic() {
        let raw = RawResult::new("same input")
            .with_confidence(Some(0.5))
            .with_segments(vec![Segment::new(
                SegmentKind::Language,
                0,
                100,
                "en",
                "same input",
                0.5,
            )]);
        let segments = ReconciledSegments {
            language: raw.segments(SegmentKind::Language).cloned().collect(),
            ..ReconciledSegments::default()
        };
        let hint = LanguageCode::new("en");

        let first = assemble(&raw, segments.clone(), &completed_handle(), Some(&hint));
        let second = assemble(&raw, segments, &completed_handle(), Some(&hint));
        assert_eq!(first, second);
    }
}
