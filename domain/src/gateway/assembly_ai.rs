//! AssemblyAI API client for transcription services.
//!
//! This module provides an HTTP client for the AssemblyAI transcript API and adapts
//! it to the asynchronous `Provider` contract: binary audio is uploaded first, the
//! transcript is created, and the poller fetches it until it completes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::*;
use provider_auth::http::{AuthenticatedClient, AuthenticatedClientBuilder};
use provider_auth::providers::ProviderConfig;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use transcription::{
    check_payload, AudioBlob, AudioSource, EntitySpan, Error as TranscriptionError, Feature,
    JobHandle, LanguageCode, Limits, PollOutcome, Provider, RawResult, RemoteStatus, Segment,
    SegmentKind, SentimentSpan, Submission, SubmitRequest,
};

use super::{check_status, decode, transport_error};
use crate::error::Error;

pub const PROVIDER_ID: &str = "assemblyai";

/// Language assumed for words when AssemblyAI reports no code at all.
const FALLBACK_LANGUAGE: &str = "en";

/// Request to create a new transcription
#[derive(Debug, Serialize)]
pub struct CreateTranscriptRequest {
    pub audio_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    pub language_detection: bool,
    pub punctuate: bool,
    pub format_text: bool,
    pub speaker_labels: bool,
    pub sentiment_analysis: bool,
    pub auto_chapters: bool,
    pub entity_detection: bool,
}

impl CreateTranscriptRequest {
    /// Language detection is enabled exactly when no language was requested.
    pub fn new(audio_url: String, request: &SubmitRequest) -> Self {
        let language_code = request.language_hint().map(|code| code.as_str().to_string());
        Self {
            audio_url,
            language_detection: language_code.is_none(),
            language_code,
            punctuate: true,
            format_text: true,
            speaker_labels: request.wants(Feature::SpeakerLabels),
            sentiment_analysis: request.wants(Feature::Sentiment),
            auto_chapters: request.wants(Feature::Chapters),
            entity_detection: request.wants(Feature::Entities),
        }
    }
}

/// Response from uploading local audio
#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    pub upload_url: String,
}

/// Transcript resource returned by both create and get
#[derive(Debug, Deserialize)]
pub struct TranscriptResponse {
    pub id: String,
    pub status: TranscriptStatus,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub words: Option<Vec<Word>>,
    #[serde(default)]
    pub utterances: Option<Vec<Utterance>>,
    #[serde(default)]
    pub chapters: Option<Vec<Chapter>>,
    #[serde(default)]
    pub sentiment_analysis_results: Option<Vec<SentimentResult>>,
    #[serde(default)]
    pub entities: Option<Vec<Entity>>,
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Length of the audio in seconds
    #[serde(default)]
    pub audio_duration: Option<f64>,
    #[serde(default)]
    pub language_code: Option<String>,
    #[serde(default)]
    pub language_confidence: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Transcript processing status
#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptStatus {
    Queued,
    Processing,
    Completed,
    Error,
}

/// Word with timing information
#[derive(Debug, Deserialize, Clone)]
pub struct Word {
    pub text: String,
    pub start: i64,
    pub end: i64,
    pub confidence: f64,
    #[serde(default)]
    pub speaker: Option<String>,
    /// Present when code switching is detected
    #[serde(default)]
    pub language_code: Option<String>,
}

/// Utterance (speaker segment) with timing
#[derive(Debug, Deserialize, Clone)]
pub struct Utterance {
    pub text: String,
    pub start: i64,
    pub end: i64,
    pub confidence: f64,
    pub speaker: String,
}

/// Auto-generated chapter
#[derive(Debug, Deserialize, Clone)]
pub struct Chapter {
    pub summary: String,
    pub headline: String,
    pub start: i64,
    pub end: i64,
    #[serde(default)]
    pub gist: Option<String>,
}

/// Sentiment analysis result
#[derive(Debug, Deserialize, Clone)]
pub struct SentimentResult {
    pub text: String,
    pub start: i64,
    pub end: i64,
    pub sentiment: Sentiment,
    pub confidence: f64,
    #[serde(default)]
    pub speaker: Option<String>,
}

/// Sentiment classification
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl From<Sentiment> for transcription::Sentiment {
    fn from(sentiment: Sentiment) -> Self {
        match sentiment {
            Sentiment::Positive => transcription::Sentiment::Positive,
            Sentiment::Neutral => transcription::Sentiment::Neutral,
            Sentiment::Negative => transcription::Sentiment::Negative,
        }
    }
}

/// Detected entity
#[derive(Debug, Deserialize, Clone)]
pub struct Entity {
    pub entity_type: String,
    pub text: String,
    pub start: i64,
    pub end: i64,
}

impl TranscriptResponse {
    /// Normalize a completed transcript.
    pub fn into_raw_result(self) -> RawResult {
        let words = self.words.unwrap_or_default();
        let language_segments = language_runs(
            &words,
            self.language_code.as_deref().unwrap_or(FALLBACK_LANGUAGE),
        );

        let speaker_segments = self
            .utterances
            .unwrap_or_default()
            .into_iter()
            .map(|u| {
                Segment::new(
                    SegmentKind::Speaker,
                    u.start,
                    u.end,
                    u.speaker,
                    u.text,
                    u.confidence,
                )
            })
            .filter(covers_time);

        // AssemblyAI scores neither chapters nor their boundaries.
        let chapters = self.chapters.unwrap_or_default().into_iter().map(|c| {
            Segment::new(
                SegmentKind::Chapter,
                c.start,
                c.end,
                c.headline,
                c.summary,
                1.0,
            )
        })
        .filter(covers_time);

        let sentiments = self
            .sentiment_analysis_results
            .unwrap_or_default()
            .into_iter()
            .map(|s| SentimentSpan {
                text: s.text,
                sentiment: s.sentiment.into(),
                confidence: s.confidence,
                start_ms: s.start,
                end_ms: s.end,
                speaker: s.speaker,
            })
            .collect();

        let entities = self
            .entities
            .unwrap_or_default()
            .into_iter()
            .map(|e| EntitySpan {
                entity_type: e.entity_type,
                text: e.text,
                start_ms: e.start,
                end_ms: e.end,
            })
            .collect();

        RawResult::new(self.text.unwrap_or_default())
            .with_confidence(self.confidence)
            .with_duration_ms(self.audio_duration.map(|secs| (secs * 1000.0).round() as i64))
            .with_reported_word_count((!words.is_empty()).then_some(words.len()))
            .with_detected_language(
                self.language_code.map(LanguageCode::new),
                self.language_confidence,
            )
            .with_segments(language_segments)
            .with_segments(speaker_segments)
            .with_segments(chapters)
            .with_sentiments(sentiments)
            .with_entities(entities)
    }
}

/// Group consecutive words sharing a language code into one language segment.
///
/// Words without a code belong to `default_language`. A run's confidence is the
/// best confidence among its words. Runs that cover no time are skipped.
pub fn language_runs(words: &[Word], default_language: &str) -> Vec<Segment> {
    let mut runs: Vec<Segment> = Vec::new();

    for word in words {
        let language = word.language_code.as_deref().unwrap_or(default_language);
        match runs.last_mut() {
            Some(run) if run.label == language => {
                run.text.push(' ');
                run.text.push_str(&word.text);
                run.end_ms = word.end;
                run.confidence = run.confidence.max(word.confidence);
            }
            _ => runs.push(Segment::new(
                SegmentKind::Language,
                word.start,
                word.end,
                language,
                word.text.clone(),
                word.confidence,
            )),
        }
    }

    runs.retain(covers_time);
    runs
}

/// AssemblyAI emits zero-length words, utterances and chapters around silence.
fn covers_time(segment: &Segment) -> bool {
    let keep = segment.end_ms > segment.start_ms;
    if !keep {
        debug!(
            "Skipping zero-length {:?} segment '{}' at {}ms",
            segment.kind, segment.label, segment.start_ms
        );
    }
    keep
}

/// AssemblyAI API client
pub struct AssemblyAiClient {
    client: AuthenticatedClient,
    config: ProviderConfig,
}

impl AssemblyAiClient {
    /// Create a new AssemblyAI client. Requests count against `limiter`.
    pub fn new(
        api_key: SecretString,
        config: ProviderConfig,
        limiter: Arc<Semaphore>,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let client = AuthenticatedClientBuilder::new()
            .with_auth(config.authenticator(api_key)?)
            .with_shared_limiter(limiter)
            .with_timeout(timeout)
            .build()?;

        Ok(Self { client, config })
    }

    /// Upload local audio and return the private URL AssemblyAI serves it from.
    pub async fn upload(&self, blob: &AudioBlob) -> Result<String, TranscriptionError> {
        debug!("Uploading {} bytes to AssemblyAI", blob.bytes.len());

        let request = self
            .client
            .post(self.config.endpoint("upload"))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(blob.bytes.clone());
        let response = self
            .client
            .send(request)
            .await
            .map_err(|e| transport_error(PROVIDER_ID, e))?;
        let response = check_status(PROVIDER_ID, response).await?;
        let upload: UploadResponse = decode(PROVIDER_ID, response).await?;

        Ok(upload.upload_url)
    }

    /// Create a new transcription request
    pub async fn create_transcript(
        &self,
        request: &CreateTranscriptRequest,
    ) -> Result<TranscriptResponse, TranscriptionError> {
        debug!(
            "Creating AssemblyAI transcript (language: {:?})",
            request.language_code
        );

        let builder = self
            .client
            .post(self.config.endpoint("transcript"))
            .json(request);
        let response = self
            .client
            .send(builder)
            .await
            .map_err(|e| transport_error(PROVIDER_ID, e))?;
        let response = check_status(PROVIDER_ID, response).await?;
        let transcript: TranscriptResponse = decode(PROVIDER_ID, response).await?;

        info!("Created AssemblyAI transcript with ID: {}", transcript.id);
        Ok(transcript)
    }

    /// Get the status of a transcript
    pub async fn get_transcript(
        &self,
        transcript_id: &str,
    ) -> Result<TranscriptResponse, TranscriptionError> {
        let builder = self
            .client
            .get(self.config.endpoint(&format!("transcript/{}", transcript_id)));
        let response = self
            .client
            .send(builder)
            .await
            .map_err(|e| transport_error(PROVIDER_ID, e))?;
        let response = check_status(PROVIDER_ID, response).await?;

        decode(PROVIDER_ID, response).await
    }

    /// Verify the API key is valid by listing at most one transcript.
    pub async fn verify_api_key(&self) -> Result<bool, TranscriptionError> {
        let builder = self
            .client
            .get(self.config.endpoint("transcript"))
            .query(&[("limit", "1")]);
        let response = self
            .client
            .send(builder)
            .await
            .map_err(|e| transport_error(PROVIDER_ID, e))?;

        match response.status() {
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                warn!("AssemblyAI rejected the configured API key");
                Ok(false)
            }
            _ => check_status(PROVIDER_ID, response).await.map(|_| true),
        }
    }
}

#[async_trait]
impl Provider for AssemblyAiClient {
    async fn submit(&self, request: &SubmitRequest) -> Result<Submission, TranscriptionError> {
        check_payload(request, self.limits())?;

        let audio_url = match request.source() {
            AudioSource::Url(url) => url.to_string(),
            AudioSource::Binary(blob) => self.upload(blob).await?,
        };

        let transcript = self
            .create_transcript(&CreateTranscriptRequest::new(audio_url, request))
            .await?;

        Ok(Submission::pending(JobHandle::queued(
            PROVIDER_ID,
            transcript.id,
        )))
    }

    async fn poll(&self, handle: &JobHandle) -> Result<PollOutcome, TranscriptionError> {
        let transcript = self.get_transcript(&handle.external_job_id).await?;

        Ok(match transcript.status {
            TranscriptStatus::Queued => PollOutcome::pending(RemoteStatus::Queued),
            TranscriptStatus::Processing => PollOutcome::pending(RemoteStatus::Processing),
            TranscriptStatus::Error => PollOutcome {
                status: RemoteStatus::Failed(
                    transcript
                        .error
                        .unwrap_or_else(|| "no reason given".to_string()),
                ),
                result: None,
            },
            TranscriptStatus::Completed => PollOutcome::completed(transcript.into_raw_result()),
        })
    }

    async fn cancel(&self, handle: &JobHandle) -> Result<(), TranscriptionError> {
        // Queued transcripts cannot be aborted remotely.
        debug!(
            "AssemblyAI has no cancel endpoint; abandoning transcript {}",
            handle.external_job_id
        );
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
        self.verify_api_key().await
    }
}
