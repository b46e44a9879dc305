//! OpenAI Whisper gateway.
//!
//! Whisper transcribes synchronously: `submit` uploads the audio, waits for the
//! transcription and returns a job that is already complete. Only uploaded audio
//! is supported because the endpoint does not fetch remote URLs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::*;
use provider_auth::http::{AuthenticatedClient, AuthenticatedClientBuilder};
use provider_auth::providers::ProviderConfig;
use reqwest::multipart::{Form, Part};
use secrecy::SecretString;
use serde::Deserialize;
use tokio::sync::Semaphore;
use transcription::{
    check_payload, AudioBlob, AudioSource, Error as TranscriptionError, InputErrorKind, JobHandle,
    LanguageCode, Limits, PollOutcome, Provider, RawResult, Segment, SegmentKind, Submission,
    SubmitRequest,
};
use uuid::Uuid;

use super::{check_status, decode, transport_error};
use crate::error::Error;

pub const PROVIDER_ID: &str = "openai_whisper";

const FALLBACK_LANGUAGE: &str = "en";

/// `verbose_json` transcription response
#[derive(Debug, Deserialize)]
pub struct VerboseTranscription {
    pub text: String,
    #[serde(default)]
    pub language: Option<String>,
    /// Seconds
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub segments: Vec<WhisperSegment>,
}

/// One decoded segment; times are in seconds.
#[derive(Debug, Deserialize, Clone)]
pub struct WhisperSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default)]
    pub avg_logprob: Option<f64>,
}

fn secs_to_ms(secs: f64) -> i64 {
    (secs * 1000.0).round() as i64
}

impl VerboseTranscription {
    /// Each Whisper segment becomes a language segment labelled with the detected
    /// (or requested) language. Confidence is the segment's mean token probability.
    pub fn into_raw_result(self, language_hint: Option<&LanguageCode>) -> RawResult {
        let label = self
            .language
            .clone()
            .or_else(|| language_hint.map(|code| code.as_str().to_string()))
            .unwrap_or_else(|| FALLBACK_LANGUAGE.to_string());

        let segments: Vec<Segment> = self
            .segments
            .into_iter()
            .map(|s| {
                let confidence = s
                    .avg_logprob
                    .map(|logprob| logprob.exp().clamp(0.0, 1.0))
                    .unwrap_or(0.0);
                Segment::new(
                    SegmentKind::Language,
                    secs_to_ms(s.start),
                    secs_to_ms(s.end),
                    label.clone(),
                    s.text.trim(),
                    confidence,
                )
            })
            .filter(|s| s.end_ms > s.start_ms)
            .collect();

        RawResult::new(self.text)
            .with_duration_ms(self.duration.map(secs_to_ms))
            .with_detected_language(self.language.map(LanguageCode::new), None)
            .with_segments(segments)
    }
}

/// OpenAI audio transcription client
pub struct OpenAiWhisperClient {
    client: AuthenticatedClient,
    config: ProviderConfig,
    model: String,
}

impl OpenAiWhisperClient {
    pub fn new(
        api_key: SecretString,
        config: ProviderConfig,
        model: &str,
        limiter: Arc<Semaphore>,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let client = AuthenticatedClientBuilder::new()
            .with_auth(config.authenticator(api_key)?)
            .with_shared_limiter(limiter)
            .with_timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            config,
            model: model.to_string(),
        })
    }

    /// Transcribe uploaded audio in one call.
    pub async fn transcribe(
        &self,
        blob: &AudioBlob,
        language: Option<&LanguageCode>,
    ) -> Result<VerboseTranscription, TranscriptionError> {
        let mut part = Part::bytes(blob.bytes.clone())
            .file_name(blob.file_name.clone().unwrap_or_else(|| "audio".to_string()));
        if let Some(content_type) = &blob.content_type {
            part = part.mime_str(content_type).map_err(|e| {
                TranscriptionError::invalid_input(
                    InputErrorKind::MalformedSource,
                    format!("invalid content type '{}'", content_type),
                )
                .with_source(e)
            })?;
        }

        let mut form = Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "segment");
        if let Some(language) = language {
            form = form.text("language", language.as_str().to_string());
        }

        debug!(
            "Sending {} bytes to OpenAI {} (language: {:?})",
            blob.bytes.len(),
            self.model,
            language.map(|l| l.as_str())
        );
        let builder = self
            .client
            .post(self.config.endpoint("audio/transcriptions"))
            .multipart(form);
        let response = self
            .client
            .send(builder)
            .await
            .map_err(|e| transport_error(PROVIDER_ID, e))?;
        let response = check_status(PROVIDER_ID, response).await?;

        decode(PROVIDER_ID, response).await
    }
}

#[async_trait]
impl Provider for OpenAiWhisperClient {
    async fn submit(&self, request: &SubmitRequest) -> Result<Submission, TranscriptionError> {
        let blob = match request.source() {
            AudioSource::Binary(blob) => blob,
            AudioSource::Url(_) => {
                return Err(TranscriptionError::invalid_input(
                    InputErrorKind::UnsupportedSource,
                    "OpenAI Whisper only accepts uploaded audio, not URLs",
                ))
            }
        };
        check_payload(request, self.limits())?;

        let transcription = self.transcribe(blob, request.language_hint()).await?;
        let job_id = Uuid::new_v4().to_string();
        info!("OpenAI transcription {} completed", job_id);

        Ok(Submission::finished(
            JobHandle::completed(PROVIDER_ID, job_id),
            transcription.into_raw_result(request.language_hint()),
        ))
    }

    async fn poll(&self, handle: &JobHandle) -> Result<PollOutcome, TranscriptionError> {
        Err(TranscriptionError::rejected(format!(
            "OpenAI transcriptions complete on submission; job {} cannot be polled",
            handle.external_job_id
        )))
    }

    async fn cancel(&self, _handle: &JobHandle) -> Result<(), TranscriptionError> {
        Ok(())
    }

    fn provider_id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn limits(&self) -> Limits {
        Limits {
            max_payload_bytes: self.config.max_upload_bytes,
        }
    }

    async fn verify_credentials(&self) -> Result<bool, TranscriptionError> {
        let builder = self.client.get(self.config.endpoint("models"));
        let response = self
            .client
            .send(builder)
            .await
            .map_err(|e| transport_error(PROVIDER_ID, e))?;

        match response.status() {
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => Ok(false),
            _ => check_status(PROVIDER_ID, response).await.map(|_| true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use provider_auth::http::shared_limiter;
    use provider_auth::providers::openai_config;
    use serde_json::json;
    use transcription::{ErrorKind, Status};

    fn client(server: &mockito::Server) -> OpenAiWhisperClient {
        OpenAiWhisperClient::new(
            SecretString::new("sk-test".to_string()),
            openai_config().with_base_url(&server.url()),
            "whisper-1",
            shared_limiter(4),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn upload() -> SubmitRequest {
        SubmitRequest::new(AudioSource::binary(
            b"RIFF....WAVE".to_vec(),
            Some("audio/wav".to_string()),
            Some("clip.wav".to_string()),
        ))
    }

    #[test]
    fn test_segments_become_language_runs() {
        let response = VerboseTranscription {
            text: "hello world".to_string(),
            language: Some("english".to_string()),
            duration: Some(2.5),
            segments: vec![
                WhisperSegment {
                    start: 0.0,
                    end: 1.2,
                    text: " hello".to_string(),
                    avg_logprob: Some(0.0),
                },
                WhisperSegment {
                    start: 1.2,
                    end: 2.5,
                    text: " world".to_string(),
                    avg_logprob: Some(-0.5),
                },
            ],
        };

        let raw = response.into_raw_result(None);
        let segments: Vec<_> = raw.segments(SegmentKind::Language).collect();

        assert_eq!(raw.duration_ms(), Some(2500));
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].label, "english");
        assert_eq!(segments[0].text, "hello");
        assert_eq!((segments[1].start_ms, segments[1].end_ms), (1200, 2500));
        assert_eq!(segments[0].confidence, 1.0);
        assert!((segments[1].confidence - (-0.5f64).exp()).abs() < 1e-9);
    }

    #[test]
    fn test_hint_labels_segments_without_detection() {
        let response = VerboseTranscription {
            text: "vanakkam".to_string(),
            language: None,
            duration: None,
            segments: vec![WhisperSegment {
                start: 0.0,
                end: 1.0,
                text: "vanakkam".to_string(),
                avg_logprob: None,
            }],
        };

        let raw = response.into_raw_result(Some(&LanguageCode::new("ta")));
        let segment = raw.segments(SegmentKind::Language).next().unwrap();
        assert_eq!(segment.label, "ta");
        assert_eq!(segment.confidence, 0.0);
        assert!(raw.detected_language().is_none());
    }

    #[tokio::test]
    async fn test_submit_returns_completed_job() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/audio/transcriptions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("verbose_json".to_string()),
                Matcher::Regex("whisper-1".to_string()),
                Matcher::Regex("clip.wav".to_string()),
            ]))
            .with_status(200)
            .with_body(
                json!({
                    "text": "hello world",
                    "language": "english",
                    "duration": 2.0,
                    "segments": [
                        {"start": 0.0, "end": 2.0, "text": "hello world", "avg_logprob": -0.1}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let submission = client(&server).submit(&upload()).await.unwrap();

        assert_eq!(submission.handle.status, Status::Completed);
        assert_eq!(submission.handle.provider_id, PROVIDER_ID);
        assert!(Uuid::parse_str(&submission.handle.external_job_id).is_ok());
        assert_eq!(submission.result.unwrap().transcript(), "hello world");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_url_source_is_unsupported() {
        let server = mockito::Server::new_async().await;
        let request = SubmitRequest::new(AudioSource::url("https://x/audio.mp3").unwrap());

        let err = client(&server).submit(&request).await.unwrap_err();
        assert_eq!(
            err.error_kind,
            ErrorKind::InvalidInput(InputErrorKind::UnsupportedSource)
        );
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/audio/transcriptions")
            .with_status(503)
            .create_async()
            .await;

        let err = client(&server).submit(&upload()).await.unwrap_err();
        assert!(err.error_kind.is_transient());
    }

    #[tokio::test]
    async fn test_poll_is_rejected() {
        let server = mockito::Server::new_async().await;
        let err = client(&server)
            .poll(&JobHandle::completed(PROVIDER_ID, "x"))
            .await
            .unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::ProviderRejected);
    }

    #[tokio::test]
    async fn test_verify_credentials_rejected_key() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/models")
            .with_status(401)
            .create_async()
            .await;

        assert!(!client(&server).verify_credentials().await.unwrap());
    }
}
