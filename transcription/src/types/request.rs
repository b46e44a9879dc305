//! Types describing what the caller wants transcribed.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, InputErrorKind};

/// Opaque language code such as "hi", "ta" or "en".
///
/// Codes are never validated against a language table; unknown codes pass through.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageCode(String);

impl LanguageCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Optional analysis a provider may run alongside speech-to-text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    SpeakerLabels,
    Chapters,
    Sentiment,
    Entities,
}

impl Feature {
    pub const ALL: [Feature; 4] = [
        Feature::SpeakerLabels,
        Feature::Chapters,
        Feature::Sentiment,
        Feature::Entities,
    ];
}

/// Uploaded audio bytes plus the content type declared by the ingress layer.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioBlob {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub file_name: Option<String>,
}

impl fmt::Debug for AudioBlob {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AudioBlob")
            .field("len", &self.bytes.len())
            .field("content_type", &self.content_type)
            .field("file_name", &self.file_name)
            .finish()
    }
}

/// Where the audio comes from. Exactly one of a public URL or uploaded bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    Url(Url),
    Binary(AudioBlob),
}

impl AudioSource {
    /// Parse a public http(s) URL.
    pub fn url(raw: &str) -> Result<Self, Error> {
        let url = Url::parse(raw.trim()).map_err(|e| {
            Error::invalid_input(InputErrorKind::MalformedSource, "audio URL could not be parsed")
                .with_source(e)
        })?;
        match url.scheme() {
            "http" | "https" => Ok(AudioSource::Url(url)),
            scheme => Err(Error::invalid_input(
                InputErrorKind::MalformedSource,
                format!("unsupported URL scheme '{scheme}', expected http or https"),
            )),
        }
    }

    pub fn binary(bytes: Vec<u8>, content_type: Option<String>, file_name: Option<String>) -> Self {
        AudioSource::Binary(AudioBlob {
            bytes,
            content_type,
            file_name,
        })
    }

    /// Build a source from the two optional ingress fields, requiring exactly one.
    pub fn from_parts(url: Option<&str>, blob: Option<AudioBlob>) -> Result<Self, Error> {
        match (url, blob) {
            (Some(url), None) => Self::url(url),
            (None, Some(blob)) if blob.bytes.is_empty() => Err(Error::invalid_input(
                InputErrorKind::MalformedSource,
                "uploaded audio is empty",
            )),
            (None, Some(blob)) => Ok(AudioSource::Binary(blob)),
            (Some(_), Some(_)) => Err(Error::invalid_input(
                InputErrorKind::MalformedSource,
                "provide either an audio URL or an uploaded file, not both",
            )),
            (None, None) => Err(Error::invalid_input(
                InputErrorKind::MalformedSource,
                "an audio URL or an uploaded file is required",
            )),
        }
    }

    /// The public URL, for sources that have one.
    pub fn public_url(&self) -> Option<&Url> {
        match self {
            AudioSource::Url(url) => Some(url),
            AudioSource::Binary(_) => None,
        }
    }

    /// Size of the payload that would be uploaded, if any.
    pub fn payload_len(&self) -> Option<usize> {
        match self {
            AudioSource::Url(_) => None,
            AudioSource::Binary(blob) => Some(blob.bytes.len()),
        }
    }
}

/// A transcription request. Immutable once built; adapters only read it.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    source: AudioSource,
    language_hint: Option<LanguageCode>,
    features: BTreeSet<Feature>,
}

impl SubmitRequest {
    /// Create a request with every feature enabled and automatic language detection.
    pub fn new(source: AudioSource) -> Self {
        Self {
            source,
            language_hint: None,
            features: Feature::ALL.into_iter().collect(),
        }
    }

    pub fn with_language_hint(mut self, hint: Option<LanguageCode>) -> Self {
        // Empty hints mean "auto detect".
        self.language_hint = hint.filter(|code| !code.as_str().trim().is_empty());
        self
    }

    pub fn with_features(mut self, features: impl IntoIterator<Item = Feature>) -> Self {
        self.features = features.into_iter().collect();
        self
    }

    pub fn source(&self) -> &AudioSource {
        &self.source
    }

    pub fn language_hint(&self) -> Option<&LanguageCode> {
        self.language_hint.as_ref()
    }

    pub fn features(&self) -> &BTreeSet<Feature> {
        &self.features
    }

    pub fn wants(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_url_source_accepts_https() {
        let source = AudioSource::url("https://x/audio.mp3").unwrap();
        assert!(matches!(source, AudioSource::Url(_)));
        assert_eq!(source.payload_len(), None);
    }

    #[test]
    fn test_url_source_rejects_other_schemes() {
        let err = AudioSource::url("ftp://x/audio.mp3").unwrap_err();
        assert_eq!(
            err.error_kind,
            ErrorKind::InvalidInput(InputErrorKind::MalformedSource)
        );
    }

    #[test]
    fn test_url_source_rejects_garbage() {
        let err = AudioSource::url("not a url").unwrap_err();
        assert_eq!(
            err.error_kind,
            ErrorKind::InvalidInput(InputErrorKind::MalformedSource)
        );
    }

    #[test]
    fn test_from_parts_requires_exactly_one_source() {
        let blob = AudioBlob {
            bytes: vec![1, 2, 3],
            content_type: Some("audio/wav".to_string()),
            file_name: None,
        };

        assert!(AudioSource::from_parts(Some("https://x/a.mp3"), Some(blob.clone())).is_err());
        assert!(AudioSource::from_parts(None, None).is_err());
        assert_eq!(
            AudioSource::from_parts(None, Some(blob)).unwrap().payload_len(),
            Some(3)
        );
    }

    #[test]
    fn test_from_parts_rejects_empty_upload() {
        let blob = AudioBlob {
            bytes: vec![],
            content_type: None,
            file_name: None,
        };
        assert!(AudioSource::from_parts(None, Some(blob)).is_err());
    }

    #[test]
    fn test_request_defaults_to_all_features() {
        let request = SubmitRequest::new(AudioSource::url("https://x/a.mp3").unwrap());
        assert!(Feature::ALL.iter().all(|f| request.wants(*f)));
        assert!(request.language_hint().is_none());
    }

    #[test]
    fn test_blank_language_hint_means_auto_detect() {
        let request = SubmitRequest::new(AudioSource::url("https://x/a.mp3").unwrap())
            .with_language_hint(Some(LanguageCode::new("  ")));
        assert!(request.language_hint().is_none());

        let request = request.with_language_hint(Some(LanguageCode::new("ta")));
        assert_eq!(request.language_hint().map(|c| c.as_str()), Some("ta"));
    }
}
