//! Job lifecycle types shared by adapters and the polling state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::raw::RawResult;

/// Lifecycle state of a transcription job as tracked locally.
///
/// `Queued` is initial. `Completed`, `Failed`, `TimedOut` and `Cancelled` are
/// terminal: once reached, nothing moves the job again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Queued,
    Processing,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

impl Status {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Status::Completed | Status::Failed | Status::TimedOut | Status::Cancelled
        )
    }
}

/// Job status as reported by the remote provider on a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatus {
    Queued,
    Processing,
    Completed,
    /// Permanent remote failure with the provider's short reason.
    Failed(String),
}

/// Handle to one submitted job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobHandle {
    pub provider_id: String,
    pub external_job_id: String,
    pub created_at: DateTime<Utc>,
    pub status: Status,
}

impl JobHandle {
    /// A freshly submitted asynchronous job.
    pub fn queued(provider_id: &str, external_job_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.to_string(),
            external_job_id: external_job_id.into(),
            created_at: Utc::now(),
            status: Status::Queued,
        }
    }

    /// A job a synchronous provider finished during submission.
    pub fn completed(provider_id: &str, external_job_id: impl Into<String>) -> Self {
        Self {
            status: Status::Completed,
            ..Self::queued(provider_id, external_job_id)
        }
    }
}

/// What `Provider::submit` hands back.
///
/// Synchronous providers return an already `Completed` handle with the result attached.
#[derive(Debug)]
pub struct Submission {
    pub handle: JobHandle,
    pub result: Option<RawResult>,
}

impl Submission {
    pub fn pending(handle: JobHandle) -> Self {
        Self {
            handle,
            result: None,
        }
    }

    pub fn finished(handle: JobHandle, result: RawResult) -> Self {
        Self {
            handle,
            result: Some(result),
        }
    }
}

/// What `Provider::poll` hands back. `result` is only populated on completion.
#[derive(Debug)]
pub struct PollOutcome {
    pub status: RemoteStatus,
    pub result: Option<RawResult>,
}

impl PollOutcome {
    pub fn pending(status: RemoteStatus) -> Self {
        Self {
            status,
            result: None,
        }
    }

    pub fn completed(result: RawResult) -> Self {
        Self {
            status: RemoteStatus::Completed,
            result: Some(result),
        }
    }
}
