//! Saga engine.
//!
//! A saga is an ordered list of named steps sharing one mutable context.
//! Steps run strictly one after the other. When a step fails, the steps that
//! already ran (and the failing one, which may have applied part of its
//! effect) are compensated in reverse order, then the original error is
//! handed back inside a [`SagaFailure`].
//!
//! Steps must be idempotent: a transient failure may be retried under the
//! saga's [`RetryPolicy`], and compensations must tolerate running after a
//! partial or absent effect.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::KennelError;

#[async_trait]
pub trait SagaStep<C>: Send + Sync
where
    C: Send + 'static,
{
    fn name(&self) -> &'static str;

    async fn execute(&self, ctx: &mut C) -> Result<()>;

    /// Undo whatever `execute` managed to apply. Default: nothing to undo.
    async fn compensate(&self, _ctx: &mut C) -> Result<()> {
        Ok(())
    }

    /// Whether a failure of this step may be retried.
    fn is_retryable(&self, err: &anyhow::Error) -> bool {
        KennelError::kind_of(err).is_some_and(|kind| kind.is_transient())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Total executions allowed per step, first one included.
    pub max_attempts: u32,
    #[serde(with = "humantime_serde")]
    pub initial_backoff: Duration,
    #[serde(with = "humantime_serde")]
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::once()
    }
}

impl RetryPolicy {
    /// Run each step exactly once.
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Delay after the `failures`-th failed attempt: `initial * 2^(failures - 1)`,
    /// capped at `max_backoff`.
    pub fn backoff(&self, failures: u32) -> Duration {
        let factor = 2u32.saturating_pow(failures.saturating_sub(1));
        std::cmp::min(self.initial_backoff.saturating_mul(factor), self.max_backoff)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SagaState {
    Pending,
    Running { step: &'static str },
    Completed,
    Compensating { failed_step: &'static str },
    Compensated { failed_step: &'static str },
    CompensationFailed { failed_step: &'static str },
    /// Failed with compensation disabled; completed steps stay applied.
    Failed { failed_step: &'static str },
}

impl SagaState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SagaState::Completed
                | SagaState::Compensated { .. }
                | SagaState::CompensationFailed { .. }
                | SagaState::Failed { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompensationFailure {
    pub step: &'static str,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SagaReport {
    pub saga: &'static str,
    pub state: SagaState,
    pub completed: Vec<&'static str>,
    pub compensated: Vec<&'static str>,
    pub compensation_failures: Vec<CompensationFailure>,
    /// Step executions, retries included.
    pub attempts: u32,
}

impl SagaReport {
    fn new(saga: &'static str) -> Self {
        Self {
            saga,
            state: SagaState::Pending,
            completed: Vec::new(),
            compensated: Vec::new(),
            compensation_failures: Vec::new(),
            attempts: 0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("saga `{saga}` failed at step `{step}`: {error}")]
pub struct SagaFailure {
    pub saga: &'static str,
    pub step: &'static str,
    #[source]
    pub error: anyhow::Error,
    pub report: SagaReport,
}

impl SagaFailure {
    /// The error raised by the failing step, untouched.
    pub fn into_error(self) -> anyhow::Error {
        self.error
    }
}

pub struct Saga<C>
where
    C: Send + 'static,
{
    name: &'static str,
    steps: Vec<Arc<dyn SagaStep<C>>>,
    retry: RetryPolicy,
    compensate_on_failure: bool,
}

impl<C> Saga<C>
where
    C: Send + 'static,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
            retry: RetryPolicy::once(),
            compensate_on_failure: true,
        }
    }

    pub fn step<S>(mut self, step: S) -> Self
    where
        S: SagaStep<C> + 'static,
    {
        self.steps.push(Arc::new(step));
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn compensate_on_failure(mut self, enabled: bool) -> Self {
        self.compensate_on_failure = enabled;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub async fn run(&self, ctx: &mut C) -> std::result::Result<SagaReport, SagaFailure> {
        let mut report = SagaReport::new(self.name);

        for (index, step) in self.steps.iter().enumerate() {
            report.state = SagaState::Running { step: step.name() };
            debug!(saga = self.name, step = step.name(), "executing saga step");

            if let Err(error) = self.execute_with_retry(step.as_ref(), ctx, &mut report).await {
                let failed_step = step.name();
                warn!(saga = self.name, step = failed_step, error = %error, "saga step failed");

                if self.compensate_on_failure {
                    self.compensate(index, failed_step, ctx, &mut report).await;
                } else {
                    report.state = SagaState::Failed { failed_step };
                }

                return Err(SagaFailure {
                    saga: self.name,
                    step: failed_step,
                    error,
                    report,
                });
            }

            report.completed.push(step.name());
        }

        report.state = SagaState::Completed;
        info!(saga = self.name, steps = report.completed.len(), "saga completed");
        Ok(report)
    }

    async fn execute_with_retry(
        &self,
        step: &dyn SagaStep<C>,
        ctx: &mut C,
        report: &mut SagaReport,
    ) -> Result<()> {
        let mut failures = 0;
        loop {
            report.attempts += 1;
            match step.execute(ctx).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    failures += 1;
                    if failures >= self.retry.max_attempts || !step.is_retryable(&err) {
                        return Err(err);
                    }
                    let delay = self.retry.backoff(failures);
                    warn!(
                        saga = self.name,
                        step = step.name(),
                        attempt = failures,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying saga step"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Compensate steps `0..=failed_index` in reverse order. Best effort:
    /// a failing compensation is recorded and the walk continues.
    async fn compensate(
        &self,
        failed_index: usize,
        failed_step: &'static str,
        ctx: &mut C,
        report: &mut SagaReport,
    ) {
        report.state = SagaState::Compensating { failed_step };

        for step in self.steps[..=failed_index].iter().rev() {
            match step.compensate(ctx).await {
                Ok(()) => report.compensated.push(step.name()),
                Err(err) => {
                    warn!(
                        saga = self.name,
                        step = step.name(),
                        error = %err,
                        "compensation failed"
                    );
                    report.compensation_failures.push(CompensationFailure {
                        step: step.name(),
                        error: err.to_string(),
                    });
                }
            }
        }

        report.state = if report.compensation_failures.is_empty() {
            SagaState::Compensated { failed_step }
        } else {
            SagaState::CompensationFailed { failed_step }
        };
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::errors::ErrorKind;

    /// Journal of everything the steps did.
    type Journal = Vec<String>;

    struct Record {
        name: &'static str,
        fail_times: AtomicU32,
        fail_kind: ErrorKind,
        compensation_fails: bool,
    }

    impl Record {
        fn ok(name: &'static str) -> Self {
            Self {
                name,
                fail_times: AtomicU32::new(0),
                fail_kind: ErrorKind::GeneralError,
                compensation_fails: false,
            }
        }

        fn failing(name: &'static str, times: u32, kind: ErrorKind) -> Self {
            Self {
                name,
                fail_times: AtomicU32::new(times),
                fail_kind: kind,
                compensation_fails: false,
            }
        }

        fn broken_undo(mut self) -> Self {
            self.compensation_fails = true;
            self
        }
    }

    #[async_trait]
    impl SagaStep<Journal> for Record {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn execute(&self, ctx: &mut Journal) -> Result<()> {
            let left = self.fail_times.load(Ordering::SeqCst);
            if left > 0 {
                self.fail_times.store(left - 1, Ordering::SeqCst);
                ctx.push(format!("fail:{}", self.name));
                let message = format!("{} broke", self.name);
                return Err(KennelError::new(self.fail_kind, message).into_anyhow());
            }
            ctx.push(format!("do:{}", self.name));
            Ok(())
        }

        async fn compensate(&self, ctx: &mut Journal) -> Result<()> {
            if self.compensation_fails {
                return Err(anyhow::anyhow!("cannot undo {}", self.name));
            }
            ctx.push(format!("undo:{}", self.name));
            Ok(())
        }
    }

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::once()
            .with_max_attempts(max_attempts)
            .with_backoff(Duration::from_millis(1), Duration::from_millis(2))
    }

    #[tokio::test]
    async fn runs_steps_in_order() {
        let saga = Saga::<Journal>::new("demo")
            .step(Record::ok("a"))
            .step(Record::ok("b"))
            .step(Record::ok("c"));

        let mut journal = Journal::new();
        let report = saga.run(&mut journal).await.unwrap();

        assert_eq!(journal, vec!["do:a", "do:b", "do:c"]);
        assert_eq!(report.state, SagaState::Completed);
        assert_eq!(report.completed, vec!["a", "b", "c"]);
        assert_eq!(report.attempts, 3);
        assert!(report.state.is_terminal());
    }

    #[tokio::test]
    async fn failure_compensates_in_reverse_and_keeps_error() {
        let saga = Saga::<Journal>::new("demo")
            .step(Record::ok("a"))
            .step(Record::ok("b"))
            .step(Record::failing("c", 1, ErrorKind::NotFound))
            .step(Record::ok("d"));

        let mut journal = Journal::new();
        let failure = saga.run(&mut journal).await.unwrap_err();

        assert_eq!(failure.step, "c");
        assert_eq!(KennelError::kind_of(&failure.error), Some(ErrorKind::NotFound));
        assert_eq!(
            journal,
            vec!["do:a", "do:b", "fail:c", "undo:c", "undo:b", "undo:a"]
        );
        assert_eq!(failure.report.state, SagaState::Compensated { failed_step: "c" });
        assert_eq!(failure.report.completed, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn compensation_can_be_disabled() {
        let saga = Saga::<Journal>::new("demo")
            .step(Record::ok("a"))
            .step(Record::failing("b", 1, ErrorKind::GeneralError))
            .compensate_on_failure(false);

        let mut journal = Journal::new();
        let failure = saga.run(&mut journal).await.unwrap_err();

        assert_eq!(journal, vec!["do:a", "fail:b"]);
        assert_eq!(failure.report.state, SagaState::Failed { failed_step: "b" });
        assert!(failure.report.compensated.is_empty());
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let saga = Saga::<Journal>::new("demo")
            .step(Record::failing("flaky", 2, ErrorKind::Unavailable))
            .with_retry(fast_retry(3));

        let mut journal = Journal::new();
        let report = saga.run(&mut journal).await.unwrap();

        assert_eq!(journal, vec!["fail:flaky", "fail:flaky", "do:flaky"]);
        assert_eq!(report.attempts, 3);
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retried() {
        let saga = Saga::<Journal>::new("demo")
            .step(Record::failing("strict", 1, ErrorKind::GeneralError))
            .with_retry(fast_retry(5));

        let mut journal = Journal::new();
        let failure = saga.run(&mut journal).await.unwrap_err();

        assert_eq!(failure.report.attempts, 1);
        assert_eq!(journal, vec!["fail:strict", "undo:strict"]);
    }

    #[tokio::test]
    async fn retries_stop_at_max_attempts() {
        let saga = Saga::<Journal>::new("demo")
            .step(Record::failing("down", 10, ErrorKind::Timeout))
            .with_retry(fast_retry(2));

        let mut journal = Journal::new();
        let failure = saga.run(&mut journal).await.unwrap_err();

        assert_eq!(failure.report.attempts, 2);
        assert_eq!(KennelError::kind_of(&failure.error), Some(ErrorKind::Timeout));
    }

    #[tokio::test]
    async fn failed_compensation_is_recorded_not_raised() {
        let saga = Saga::<Journal>::new("demo")
            .step(Record::ok("a").broken_undo())
            .step(Record::ok("b"))
            .step(Record::failing("c", 1, ErrorKind::Conflict));

        let mut journal = Journal::new();
        let failure = saga.run(&mut journal).await.unwrap_err();

        assert_eq!(KennelError::kind_of(&failure.error), Some(ErrorKind::Conflict));
        assert_eq!(failure.report.state, SagaState::CompensationFailed { failed_step: "c" });
        assert_eq!(failure.report.compensated, vec!["c", "b"]);
        assert_eq!(failure.report.compensation_failures.len(), 1);
        assert_eq!(failure.report.compensation_failures[0].step, "a");
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::once()
            .with_backoff(Duration::from_secs(1), Duration::from_secs(5));
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(3), Duration::from_secs(4));
        assert_eq!(policy.backoff(4), Duration::from_secs(5));
        assert_eq!(policy.backoff(40), Duration::from_secs(5));
    }

    #[test]
    fn max_attempts_never_drops_below_one() {
        assert_eq!(RetryPolicy::once().with_max_attempts(0).max_attempts, 1);
    }
}
