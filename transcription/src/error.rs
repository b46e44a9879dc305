//! Error types for transcription operations.
//!
//! Follows the same pattern as the other layers: a root `Error` struct holding an
//! `error_kind` tree and an optional `source`. Transcription errors also carry a
//! human-readable summary and the last known `JobHandle` so callers can diagnose
//! where a job stopped without ever seeing raw provider payloads.

use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use crate::types::job::JobHandle;

/// Top-level error type for the transcription core.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
    /// Human-readable summary. Never contains a raw provider response body.
    pub message: String,
    /// Last known state of the job, when a job existed at the time of failure.
    pub job: Option<JobHandle>,
}

/// Major categories of errors surfaced by the transcription core.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// The request was rejected locally, before any network call.
    InvalidInput(InputErrorKind),
    /// Transient provider failure (network, rate limit, server busy).
    /// `retries` is the number of retries spent before giving up.
    ProviderUnavailable {
        retries: u32,
        retry_after: Option<Duration>,
    },
    /// Permanent remote failure, e.g. unsupported audio codec. Never retried.
    ProviderRejected,
    /// The per-job deadline elapsed while polling.
    Timeout,
    /// The caller cancelled the job.
    Cancelled,
    /// Provider data violated its contract. Indicates a defect, not a user error.
    InternalReconciliation,
}

/// Reasons a `SubmitRequest` is rejected before submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputErrorKind {
    MalformedSource,
    UnsupportedSource,
    PayloadTooLarge { size: usize, max: usize },
}

impl ErrorKind {
    /// Transient kinds are retried by the polling state machine.
    pub fn is_transient(&self) -> bool {
        matches!(self, ErrorKind::ProviderUnavailable { .. })
    }
}

impl Error {
    pub fn new(error_kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            source: None,
            error_kind,
            message: message.into(),
            job: None,
        }
    }

    pub fn invalid_input(kind: InputErrorKind, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput(kind), message)
    }

    /// A single transient failure as reported by an adapter.
    pub fn unavailable(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self::new(
            ErrorKind::ProviderUnavailable {
                retries: 0,
                retry_after,
            },
            message,
        )
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ProviderRejected, message)
    }

    pub fn reconciliation(message: impl Into<String>, context: String) -> Self {
        Self {
            source: Some(context.into()),
            ..Self::new(ErrorKind::InternalReconciliation, message)
        }
    }

    pub fn with_source(mut self, source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attach the last known job state.
    pub fn with_job(mut self, job: &JobHandle) -> Self {
        self.job = Some(job.clone());
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::InvalidInput(kind) => write!(f, "Invalid input ({:?}): {}", kind, self.message),
            ErrorKind::ProviderUnavailable { retries, .. } => write!(
                f,
                "Provider unavailable after {} retries: {}",
                retries, self.message
            ),
            ErrorKind::ProviderRejected => write!(f, "Provider rejected request: {}", self.message),
            ErrorKind::Timeout => write!(f, "Timeout: {}", self.message),
            ErrorKind::Cancelled => write!(f, "Cancelled: {}", self.message),
            ErrorKind::InternalReconciliation => {
                write!(f, "Internal reconciliation error: {}", self.message)
            }
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}
