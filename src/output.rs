//! JSON response printed on success.

use serde_json::{json, Value};
use transcription::CanonicalResult;

/// `{ "transcript": ..., "metadata": { ... } }`
///
/// `audio_url` is only reported for jobs submitted by URL.
pub fn response(result: &CanonicalResult, audio_url: Option<&str>) -> Value {
    let languages = result.languages_found();

    let mut value = json!({
        "transcript": result.transcript(),
        "metadata": {
            "transcription_id": result.job_id(),
            "provider": result.provider_id(),
            "status": result.status(),
            "word_count": result.word_count(),
            "confidence": result.confidence(),
            "audio_duration_ms": result.duration_ms(),
            "detected_language": result.detected_language(),
            "language_confidence": result.language_confidence(),
            "requested_language": result.language_hint(),
            "language_detection_enabled": result.language_hint().is_none(),
            "multi_language_segments": result.language_segments(),
            "total_languages_detected": languages.len(),
            "languages_found": languages,
            "language_switching_detected": result.language_switching_detected(),
            "speakers": result.speaker_segments(),
            "chapters": result.chapters(),
            "sentiments": result.sentiments(),
            "entities": result.entities(),
        }
    });
    if let Some(url) = audio_url {
        value["metadata"]["audio_url"] = json!(url);
    }
    value
}
