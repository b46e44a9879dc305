//! Transcription provider trait.

use crate::error::{Error, InputErrorKind};
use crate::types::job::{JobHandle, PollOutcome, Submission};
use crate::types::request::SubmitRequest;
use async_trait::async_trait;

/// Static limits a provider declares at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Largest binary upload the provider accepts, in bytes.
    pub max_payload_bytes: usize,
}

/// Abstraction for speech-to-text transcription services.
///
/// Each implementation translates a generic `SubmitRequest` into one provider's
/// API and decodes the reply into a `RawResult`. Adapters make exactly one
/// outbound call per method and never retry; retrying is the polling state
/// machine's job, so failures must be surfaced as-is with transient ones
/// classified as `ErrorKind::ProviderUnavailable`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Provider: Send + Sync {
    /// Start a transcription job.
    ///
    /// Asynchronous providers return a `Queued` handle. Synchronous providers finish
    /// the work here and return a `Completed` handle with the result attached.
    /// Oversized payloads must be rejected before any network call; see `check_payload`.
    async fn submit(&self, request: &SubmitRequest) -> Result<Submission, Error>;

    /// Fetch the current remote status; the result is attached once completed.
    async fn poll(&self, handle: &JobHandle) -> Result<PollOutcome, Error>;

    /// Best-effort cancellation. Providers without a cancel API return `Ok(())`.
    async fn cancel(&self, handle: &JobHandle) -> Result<(), Error>;

    /// Unique lowercase identifier for this provider (e.g., "assemblyai").
    fn provider_id(&self) -> &'static str;

    fn limits(&self) -> Limits;

    /// Validate API credentials with a lightweight request.
    async fn verify_credentials(&self) -> Result<bool, Error>;
}

/// Reject binary payloads above the provider's declared maximum.
pub fn check_payload(request: &SubmitRequest, limits: Limits) -> Result<(), Error> {
    match request.source().payload_len() {
        Some(size) if size > limits.max_payload_bytes => Err(Error::invalid_input(
            InputErrorKind::PayloadTooLarge {
                size,
                max: limits.max_payload_bytes,
            },
            format!(
                "audio payload of {} bytes exceeds the {} byte limit",
                size, limits.max_payload_bytes
            ),
        )),
        _ => Ok(()),
    }
}
