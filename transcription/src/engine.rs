//! Entry point tying submission, polling, reconciliation and assembly together.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::*;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use crate::assembler::assemble;
use crate::backoff::PollingPolicy;
use crate::error::{Error, ErrorKind};
use crate::poller::JobDriver;
use crate::reconciler::reconcile_result;
use crate::traits::provider::Provider;
use crate::types::job::Submission;
use crate::types::request::SubmitRequest;
use crate::types::result::CanonicalResult;

/// Registry of providers plus the polling policy applied to every job.
///
/// Cheap to clone; every call to `transcribe` is an independent job that shares
/// nothing mutable with other jobs.
#[derive(Clone)]
pub struct TranscriptionEngine {
    providers: BTreeMap<&'static str, Arc<dyn Provider>>,
    default_provider: &'static str,
    policy: PollingPolicy,
}

impl TranscriptionEngine {
    /// Create an engine whose default provider is `default_provider`.
    pub fn new(default_provider: Arc<dyn Provider>, policy: PollingPolicy) -> Self {
        let id = default_provider.provider_id();
        let mut providers = BTreeMap::new();
        providers.insert(id, default_provider);
        Self {
            providers,
            default_provider: id,
            policy,
        }
    }

    /// Register an alternate provider.
    pub fn with_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.providers.insert(provider.provider_id(), provider);
        self
    }

    pub fn policy(&self) -> PollingPolicy {
        self.policy
    }

    pub fn default_provider_id(&self) -> &'static str {
        self.default_provider
    }

    pub fn provider_ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.providers.keys().copied()
    }

    pub fn provider(&self, provider_id: Option<&str>) -> Result<Arc<dyn Provider>, Error> {
        let id = provider_id.unwrap_or(self.default_provider);
        self.providers.get(id).cloned().ok_or_else(|| {
            Error::rejected(format!(
                "unknown provider '{}', expected one of: {}",
                id,
                self.providers.keys().copied().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    /// Transcribe one request end to end.
    pub async fn transcribe(
        &self,
        request: SubmitRequest,
        provider_id: Option<&str>,
        cancel: CancellationToken,
    ) -> Result<CanonicalResult, Error> {
        let provider = self.provider(provider_id)?;
        info!(
            "Submitting transcription to {} (language hint: {:?})",
            provider.provider_id(),
            request.language_hint().map(|c| c.as_str())
        );

        let deadline = Instant::now() + self.policy.deadline;
        let submission = self
            .submit(provider.as_ref(), &request, deadline, &cancel)
            .await?;
        let finished = JobDriver::new(provider, submission, self.policy, cancel)
            .with_deadline(deadline)
            .run()
            .await?;

        let segments = reconcile_result(&finished.result).map_err(|e| e.with_job(&finished.handle))?;
        let result = assemble(
            &finished.result,
            segments,
            &finished.handle,
            request.language_hint(),
        );

        info!(
            "Transcription {} completed: {} words, languages {:?}",
            result.job_id(),
            result.word_count(),
            result.languages_found()
        );
        Ok(result)
    }

    /// Run a job as its own task. The returned handle can cancel it cooperatively.
    pub fn spawn(&self, request: SubmitRequest, provider_id: Option<String>) -> RunningJob {
        let cancel = CancellationToken::new();
        let engine = self.clone();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            engine
                .transcribe(request, provider_id.as_deref(), token)
                .await
        });
        RunningJob { cancel, task }
    }

    /// Submit with the same transient-retry budget the poller uses.
    ///
    /// Retry waits count against the job deadline.
    async fn submit(
        &self,
        provider: &dyn Provider,
        request: &SubmitRequest,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<Submission, Error> {
        let mut failures = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(Error::new(ErrorKind::Cancelled, "job cancelled before submission"));
            }
            if Instant::now() >= deadline {
                return Err(Error::new(
                    ErrorKind::Timeout,
                    format!(
                        "job was not accepted within {}s",
                        self.policy.deadline.as_secs()
                    ),
                ));
            }

            match provider.submit(request).await {
                Ok(submission) => return Ok(submission),
                Err(err) if err.error_kind.is_transient() => {
                    failures += 1;
                    let retry_after = match err.error_kind {
                        ErrorKind::ProviderUnavailable { retry_after, .. } => retry_after,
                        _ => None,
                    };
                    if failures > self.policy.max_transient_retries {
                        return Err(Error {
                            error_kind: ErrorKind::ProviderUnavailable {
                                retries: failures - 1,
                                retry_after,
                            },
                            ..err
                        });
                    }
                    warn!(
                        "Transient failure submitting to {} ({}/{}): {}",
                        provider.provider_id(),
                        failures,
                        self.policy.max_transient_retries,
                        err
                    );
                    let delay = self.policy.retry_delay(failures - 1, retry_after);
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    tokio::select! {
                        _ = sleep(delay.min(remaining)) => {}
                        _ = cancel.cancelled() => {}
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// A job running on its own task.
pub struct RunningJob {
    cancel: CancellationToken,
    task: JoinHandle<Result<CanonicalResult, Error>>,
}

impl RunningJob {
    /// Request cooperative cancellation; observed at the next poll boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the job to finish.
    pub async fn wait(self) -> Result<CanonicalResult, Error> {
        match self.task.await {
            Ok(result) => result,
            Err(join_error) => Err(Error::new(
                ErrorKind::InternalReconciliation,
                "transcription task aborted",
            )
            .with_source(join_error)),
        }
    }
}
