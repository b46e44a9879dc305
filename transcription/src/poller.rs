//! Polling state machine that drives one submitted job to a terminal state.
//!
//! ```text
//! Queued ──first poll──▶ Processing ──▶ Completed | Failed | TimedOut | Cancelled
//! ```
//!
//! The driver owns the job's handle for its whole life. Between ticks it sleeps on
//! a timer instead of blocking a worker, so any number of jobs can be in flight on
//! one runtime. Cancellation is cooperative and observed at tick boundaries; the
//! deadline is per job and checked before every tick.

use std::sync::Arc;
use std::time::Duration;

use log::*;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use crate::backoff::PollingPolicy;
use crate::error::{Error, ErrorKind};
use crate::traits::provider::Provider;
use crate::types::job::{JobHandle, RemoteStatus, Status, Submission};
use crate::types::raw::RawResult;

/// Outcome of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Still running; wait this long before the next tick.
    Pending(Duration),
    /// The job reached a terminal state. Further ticks are no-ops.
    Done,
}

/// A job that finished successfully.
#[derive(Debug)]
pub struct FinishedJob {
    pub handle: JobHandle,
    pub result: RawResult,
}

pub struct JobDriver {
    provider: Arc<dyn Provider>,
    handle: JobHandle,
    policy: PollingPolicy,
    deadline: Instant,
    cancel: CancellationToken,
    polls: u32,
    transient_failures: u32,
    cancel_issued: bool,
    result: Option<RawResult>,
    failure: Option<Error>,
}

impl JobDriver {
    /// Take ownership of a freshly submitted job.
    ///
    /// An already terminal submission (synchronous providers) needs no polling.
    pub fn new(
        provider: Arc<dyn Provider>,
        submission: Submission,
        policy: PollingPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            provider,
            handle: submission.handle,
            deadline: Instant::now() + policy.deadline,
            policy,
            cancel,
            polls: 0,
            transient_failures: 0,
            cancel_issued: false,
            result: submission.result,
            failure: None,
        }
    }

    /// Count the deadline from an earlier instant, such as the start of submission.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn status(&self) -> Status {
        self.handle.status
    }

    pub fn handle(&self) -> &JobHandle {
        &self.handle
    }

    /// Advance the job by one poll.
    pub async fn tick(&mut self) -> Tick {
        if self.handle.status.is_terminal() {
            return Tick::Done;
        }
        if self.cancel.is_cancelled() {
            self.cancel_job().await;
            return Tick::Done;
        }
        if Instant::now() >= self.deadline {
            self.time_out().await;
            return Tick::Done;
        }

        debug!(
            "Polling {} job {} (poll #{})",
            self.handle.provider_id,
            self.handle.external_job_id,
            self.polls + 1
        );
        let polled = self.provider.poll(&self.handle).await;

        // A poll that was in flight when the caller cancelled is discarded.
        if self.cancel.is_cancelled() {
            self.cancel_job().await;
            return Tick::Done;
        }

        match polled {
            Ok(outcome) => {
                self.polls += 1;
                self.transient_failures = 0;
                if self.handle.status == Status::Queued {
                    self.transition(Status::Processing);
                }

                match (outcome.status, outcome.result) {
                    (RemoteStatus::Queued | RemoteStatus::Processing, _) => {
                        Tick::Pending(self.policy.exponential_delay(self.polls - 1))
                    }
                    (RemoteStatus::Completed, Some(result)) => {
                        self.result = Some(result);
                        self.transition(Status::Completed);
                        Tick::Done
                    }
                    (RemoteStatus::Completed, None) => {
                        self.fail(Error::reconciliation(
                            "provider reported completion without a result",
                            format!("{:?}", self.handle),
                        ));
                        Tick::Done
                    }
                    (RemoteStatus::Failed(reason), _) => {
                        self.fail(Error::rejected(format!("transcription failed: {reason}")));
                        Tick::Done
                    }
                }
            }
            Err(err) if err.error_kind.is_transient() => {
                self.transient_failures += 1;
                let retry_after = match err.error_kind {
                    ErrorKind::ProviderUnavailable { retry_after, .. } => retry_after,
                    _ => None,
                };

                if self.transient_failures > self.policy.max_transient_retries {
                    let retries = self.transient_failures - 1;
                    self.fail(Error {
                        error_kind: ErrorKind::ProviderUnavailable {
                            retries,
                            retry_after,
                        },
                        ..err
                    });
                    Tick::Done
                } else {
                    warn!(
                        "Transient failure polling job {} ({}/{}): {}",
                        self.handle.external_job_id,
                        self.transient_failures,
                        self.policy.max_transient_retries,
                        err
                    );
                    Tick::Pending(
                        self.policy
                            .retry_delay(self.transient_failures - 1, retry_after),
                    )
                }
            }
            Err(err) => {
                self.fail(err);
                Tick::Done
            }
        }
    }

    /// Tick until terminal, sleeping between ticks, and return the outcome.
    pub async fn run(mut self) -> Result<FinishedJob, Error> {
        loop {
            match self.tick().await {
                Tick::Done => break,
                Tick::Pending(delay) => {
                    let remaining = self.deadline.saturating_duration_since(Instant::now());
                    tokio::select! {
                        _ = sleep(delay.min(remaining)) => {}
                        _ = self.cancel.cancelled() => {}
                    }
                }
            }
        }
        self.finish()
    }

    fn finish(mut self) -> Result<FinishedJob, Error> {
        let handle = self.handle;
        match handle.status {
            Status::Completed => match self.result.take() {
                Some(result) => Ok(FinishedJob { handle, result }),
                None => Err(Error::reconciliation(
                    "job completed without a result",
                    format!("{:?}", handle),
                )
                .with_job(&handle)),
            },
            Status::Failed => Err(self
                .failure
                .take()
                .unwrap_or_else(|| Error::rejected("transcription failed"))
                .with_job(&handle)),
            Status::TimedOut => Err(Error::new(
                ErrorKind::Timeout,
                format!(
                    "job did not finish within {}s",
                    self.policy.deadline.as_secs()
                ),
            )
            .with_job(&handle)),
            Status::Cancelled => {
                Err(Error::new(ErrorKind::Cancelled, "job cancelled by caller").with_job(&handle))
            }
            Status::Queued | Status::Processing => Err(Error::reconciliation(
                "job stopped before reaching a terminal state",
                format!("{:?}", handle),
            )
            .with_job(&handle)),
        }
    }

    fn transition(&mut self, next: Status) {
        if self.handle.status.is_terminal() {
            warn!(
                "Ignoring transition {:?} -> {:?} for job {}",
                self.handle.status, next, self.handle.external_job_id
            );
            return;
        }
        info!(
            "{} job {}: {:?} -> {:?}",
            self.handle.provider_id, self.handle.external_job_id, self.handle.status, next
        );
        self.handle.status = next;
    }

    fn fail(&mut self, err: Error) {
        error!(
            "{} job {} failed: {}",
            self.handle.provider_id, self.handle.external_job_id, err
        );
        self.failure = Some(err);
        self.transition(Status::Failed);
    }

    async fn time_out(&mut self) {
        self.issue_cancel().await;
        self.transition(Status::TimedOut);
    }

    async fn cancel_job(&mut self) {
        self.issue_cancel().await;
        self.transition(Status::Cancelled);
    }

    /// Best-effort remote cancel, issued at most once per job.
    async fn issue_cancel(&mut self) {
        if self.cancel_issued {
            return;
        }
        self.cancel_issued = true;
        if let Err(err) = self.provider.cancel(&self.handle).await {
            warn!(
                "Best-effort cancel of job {} failed: {}",
                self.handle.external_job_id, err
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::provider::MockProvider;
    use crate::types::job::PollOutcome;

    fn policy() -> PollingPolicy {
        PollingPolicy {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
            deadline: Duration::from_secs(60),
            max_transient_retries: 3,
        }
    }

    fn queued() -> Submission {
        Submission::pending(JobHandle::queued("mock", "job-1"))
    }

    fn hello_world() -> RawResult {
        RawResult::new("hello world")
            .with_confidence(Some(0.9))
            .with_duration_ms(Some(2000))
    }

    fn driver(mock: MockProvider, submission: Submission) -> JobDriver {
        JobDriver::new(
            Arc::new(mock),
            submission,
            policy(),
            CancellationToken::new(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_then_completed() {
        let mut mock = MockProvider::new();
        let mut calls = 0;
        mock.expect_poll().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(PollOutcome::pending(RemoteStatus::Queued))
            } else {
                Ok(PollOutcome::completed(hello_world()))
            }
        });
        mock.expect_cancel().never();

        let finished = driver(mock, queued()).run().await.unwrap();
        assert_eq!(finished.handle.status, Status::Completed);
        assert_eq!(finished.result.transcript(), "hello world");
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_successful_poll_moves_to_processing() {
        let mut mock = MockProvider::new();
        mock.expect_poll()
            .returning(|_| Ok(PollOutcome::pending(RemoteStatus::Queued)));

        let mut driver = driver(mock, queued());
        assert_eq!(driver.status(), Status::Queued);
        assert_eq!(driver.tick().await, Tick::Pending(Duration::from_secs(1)));
        assert_eq!(driver.status(), Status::Processing);
        assert_eq!(driver.tick().await, Tick::Pending(Duration::from_secs(2)));
        assert_eq!(driver.status(), Status::Processing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_within_budget_recover() {
        let mut mock = MockProvider::new();
        let mut calls = 0;
        mock.expect_poll().times(3).returning(move |_| {
            calls += 1;
            if calls <= 2 {
                Err(Error::unavailable("connection reset", None))
            } else {
                Ok(PollOutcome::completed(hello_world()))
            }
        });

        let finished = driver(mock, queued()).run().await.unwrap();
        assert_eq!(finished.handle.status, Status::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_exhaust_budget() {
        let mut mock = MockProvider::new();
        mock.expect_poll()
            .times(4)
            .returning(|_| Err(Error::unavailable("server busy", None)));

        let err = driver(mock, queued()).run().await.unwrap_err();
        assert_eq!(
            err.error_kind,
            ErrorKind::ProviderUnavailable {
                retries: 3,
                retry_after: None
            }
        );
        assert_eq!(err.job.map(|j| j.status), Some(Status::Failed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_failure_is_permanent() {
        let mut mock = MockProvider::new();
        mock.expect_poll()
            .times(1)
            .returning(|_| Ok(PollOutcome::pending(RemoteStatus::Failed("unsupported codec".into()))));

        let err = driver(mock, queued()).run().await.unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::ProviderRejected);
        assert!(err.message.contains("unsupported codec"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_transient_adapter_error_fails_immediately() {
        let mut mock = MockProvider::new();
        mock.expect_poll()
            .times(1)
            .returning(|_| Err(Error::rejected("transcript not found")));

        let err = driver(mock, queued()).run().await.unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::ProviderRejected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_times_out_and_cancels_once() {
        let mut mock = MockProvider::new();
        mock.expect_poll()
            .returning(|_| Ok(PollOutcome::pending(RemoteStatus::Processing)));
        mock.expect_cancel().times(1).returning(|_| Ok(()));

        let err = driver(mock, queued()).run().await.unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::Timeout);
        assert_eq!(err.job.map(|j| j.status), Some(Status::TimedOut));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_cancel_does_not_mask_timeout() {
        let mut mock = MockProvider::new();
        mock.expect_poll()
            .returning(|_| Ok(PollOutcome::pending(RemoteStatus::Processing)));
        mock.expect_cancel()
            .times(1)
            .returning(|_| Err(Error::rejected("cannot cancel")));

        let err = driver(mock, queued()).run().await.unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inherited_deadline_already_passed() {
        let mut mock = MockProvider::new();
        mock.expect_poll().never();
        mock.expect_cancel().times(1).returning(|_| Ok(()));

        let err = driver(mock, queued())
            .with_deadline(Instant::now())
            .run()
            .await
            .unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_caller_cancellation() {
        let mut mock = MockProvider::new();
        mock.expect_poll().never();
        mock.expect_cancel().times(1).returning(|_| Ok(()));

        let token = CancellationToken::new();
        token.cancel();
        let err = JobDriver::new(Arc::new(mock), queued(), policy(), token)
            .run()
            .await
            .unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::Cancelled);
        assert_eq!(err.job.map(|j| j.status), Some(Status::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_of_in_flight_poll_is_discarded_after_cancel() {
        let token = CancellationToken::new();
        let poll_token = token.clone();

        let mut mock = MockProvider::new();
        mock.expect_poll().times(1).returning(move |_| {
            poll_token.cancel();
            Ok(PollOutcome::completed(hello_world()))
        });
        mock.expect_cancel().times(1).returning(|_| Ok(()));

        let err = JobDriver::new(Arc::new(mock), queued(), policy(), token)
            .run()
            .await
            .unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_synchronous_submission_needs_no_polling() {
        let mut mock = MockProvider::new();
        mock.expect_poll().never();
        mock.expect_cancel().never();

        let submission = Submission::finished(
            JobHandle::completed("mock", "sync-1"),
            hello_world(),
        );
        let finished = driver(mock, submission).run().await.unwrap();
        assert_eq!(finished.handle.status, Status::Completed);
        assert_eq!(finished.result.confidence(), Some(0.9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_state_is_absorbing() {
        let mut mock = MockProvider::new();
        mock.expect_poll()
            .times(1)
            .returning(|_| Ok(PollOutcome::completed(hello_world())));
        mock.expect_cancel().never();

        let token = CancellationToken::new();
        let mut driver = JobDriver::new(Arc::new(mock), queued(), policy(), token.clone());
        assert_eq!(driver.tick().await, Tick::Done);
        assert_eq!(driver.status(), Status::Completed);

        token.cancel();
        assert_eq!(driver.tick().await, Tick::Done);
        assert_eq!(driver.tick().await, Tick::Done);
        assert_eq!(driver.status(), Status::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_without_result_is_a_defect() {
        let mut mock = MockProvider::new();
        mock.expect_poll()
            .times(1)
            .returning(|_| Ok(PollOutcome::pending(RemoteStatus::Completed)));

        let err = driver(mock, queued()).run().await.unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::InternalReconciliation);
    }
}
