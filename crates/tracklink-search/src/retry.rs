//! Retry scheduling for a single search task.
//!
//! A task moves through an explicit state machine:
//!
//! ```text
//! Queued -> InFlight -> Succeeded
//!                    -> Failed
//!                    -> Retrying -> InFlight ...
//! (any non-terminal) -> Aborted
//! ```
//!
//! `attempt` is the only counter; it is bumped when a resolver call starts.

use futures::FutureExt;
use rand::Rng;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracklink_core::{ErrorKind, JobConfig, Link, Query, TaskState};
use tracklink_resolver::{LinkResolver, ResolveError, Resolution};

/// Default ceiling for backoff waits, as a multiple of the job delay.
pub const DEFAULT_CAP_MULTIPLIER: u32 = 10;

/// Backoff and attempt limits for one job.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    base_delay: Duration,
    max_attempts: u32,
    cap: Duration,
    jitter: Duration,
}

impl RetryPolicy {
    /// Policy seeded from the job configuration.
    #[must_use]
    pub fn new(config: &JobConfig) -> Self {
        Self {
            base_delay: config.delay,
            max_attempts: config.max_retries,
            cap: config.delay.saturating_mul(DEFAULT_CAP_MULTIPLIER),
            jitter: Duration::ZERO,
        }
    }

    /// Cap backoff at `multiplier` times the base delay.
    #[must_use]
    pub fn with_cap_multiplier(mut self, multiplier: u32) -> Self {
        self.cap = self.base_delay.saturating_mul(multiplier.max(1));
        self
    }

    /// Add up to `jitter` of random extra wait to each backoff.
    #[must_use]
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Total attempts allowed for transient failures.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Longest wait between attempts.
    #[must_use]
    pub fn cap(&self) -> Duration {
        self.cap
    }

    /// Exponential backoff after the given (1-based) failed attempt.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.cap)
    }

    /// Wait before retrying after `error` ended `attempt`.
    ///
    /// A server-requested `Retry-After` stretches the wait, but never past
    /// the cap.
    #[must_use]
    pub fn wait_for(&self, attempt: u32, error: &ResolveError) -> Duration {
        let backoff = self.backoff(attempt);
        let wanted = error.retry_after().map_or(backoff, |after| after.max(backoff));
        (wanted + self.sample_jitter()).min(self.cap)
    }

    fn sample_jitter(&self) -> Duration {
        if self.jitter.is_zero() {
            return Duration::ZERO;
        }
        let millis = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rand::thread_rng().gen_range(0..=millis))
    }
}

/// Mutable per-row state, owned by one worker at a time.
#[derive(Debug, Clone)]
pub struct SearchTask {
    /// The query being resolved
    pub query: Query,
    /// Resolver calls started so far
    pub attempt: u32,
    /// Current state
    pub state: TaskState,
    /// Link, once found
    pub result: Option<Link>,
    /// Most recent failure
    pub last_error: Option<ErrorKind>,
    /// Detail for the most recent failure
    pub message: Option<String>,
    bonus_attempt_used: bool,
}

impl SearchTask {
    /// New task in the `Queued` state.
    #[must_use]
    pub fn new(query: Query) -> Self {
        Self {
            query,
            attempt: 0,
            state: TaskState::Queued,
            result: None,
            last_error: None,
            message: None,
            bonus_attempt_used: false,
        }
    }

    fn begin_attempt(&mut self) {
        self.attempt += 1;
        self.state = TaskState::InFlight;
    }

    fn succeed(&mut self, link: Link) {
        self.state = TaskState::Succeeded;
        self.result = Some(link);
        self.last_error = None;
        self.message = None;
    }

    fn fail(&mut self, kind: ErrorKind, message: Option<String>) {
        self.state = TaskState::Failed;
        self.last_error = Some(kind);
        self.message = message;
    }

    fn schedule_retry(&mut self, kind: ErrorKind, message: String) {
        self.state = TaskState::Retrying;
        self.last_error = Some(kind);
        self.message = Some(message);
    }

    /// Terminate the task because its job was cancelled.
    pub fn abort(&mut self) {
        if !self.state.is_terminal() {
            self.state = TaskState::Aborted;
            self.last_error = Some(ErrorKind::JobAborted);
            self.message = Some("job aborted".to_string());
        }
    }
}

/// Runs one task to a terminal state under a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryScheduler {
    policy: RetryPolicy,
}

impl RetryScheduler {
    /// Create a scheduler.
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// The active policy.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Drive `task` until it is terminal.
    ///
    /// `emit` is called after every state transition. Cancellation interrupts
    /// an in-flight call or a backoff wait and leaves the task `Aborted`; a
    /// call that has already finished still counts.
    pub async fn execute<F>(
        &self,
        task: &mut SearchTask,
        resolver: &dyn LinkResolver,
        cancel: &CancellationToken,
        mut emit: F,
    ) where
        F: FnMut(&SearchTask),
    {
        let mut budget = self.policy.max_attempts;

        loop {
            if cancel.is_cancelled() {
                task.abort();
                emit(task);
                return;
            }

            task.begin_attempt();
            emit(task);
            debug!(row = task.query.row_index, attempt = task.attempt, "Resolving {}", task.query.label());

            let outcome = tokio::select! {
                biased;
                outcome = call_resolver(resolver, &task.query) => outcome,
                () = cancel.cancelled() => {
                    task.abort();
                    emit(task);
                    return;
                }
            };

            let error = match outcome {
                Ok(Resolution::Found(link)) => {
                    task.succeed(link);
                    emit(task);
                    return;
                }
                Ok(Resolution::NotFound) => {
                    task.fail(ErrorKind::NotFound, None);
                    emit(task);
                    return;
                }
                Err(e) if !e.is_retryable() => {
                    task.fail(e.kind(), Some(e.to_string()));
                    emit(task);
                    return;
                }
                Err(e) => e,
            };

            if error.kind() == ErrorKind::Unexpected && !task.bonus_attempt_used {
                task.bonus_attempt_used = true;
                budget += 1;
            }

            if task.attempt >= budget {
                warn!(
                    row = task.query.row_index,
                    attempts = task.attempt,
                    "Giving up on {}: {}",
                    task.query.label(),
                    error
                );
                task.fail(ErrorKind::RetriesExhausted, Some(error.to_string()));
                emit(task);
                return;
            }

            let wait = self.policy.wait_for(task.attempt, &error);
            warn!(
                row = task.query.row_index,
                "Attempt {}/{} failed ({}), retrying in {:?}",
                task.attempt,
                budget,
                error,
                wait
            );
            task.schedule_retry(error.kind(), error.to_string());
            emit(task);

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    task.abort();
                    emit(task);
                    return;
                }
                () = tokio::time::sleep(wait) => {}
            }
        }
    }
}

/// Call the resolver, turning a panic into an `Unexpected` error.
async fn call_resolver(
    resolver: &dyn LinkResolver,
    query: &Query,
) -> Result<Resolution, ResolveError> {
    match AssertUnwindSafe(resolver.resolve(query)).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic) => {
            let detail = panic
                .downcast_ref::<&str>()
                .map(ToString::to_string)
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "resolver panicked".to_string());
            Err(ResolveError::Unexpected(detail))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;
    use tracklink_core::Platform;

    fn transient() -> ResolveError {
        ResolveError::Transient {
            platform: Platform::YouTube,
            message: "timeout".to_string(),
        }
    }

    fn found() -> Resolution {
        Resolution::Found(Link::new(
            Platform::YouTube,
            "https://www.youtube.com/watch?v=yKNxeF4KMsY",
        ))
    }

    enum Step {
        Answer(tracklink_resolver::Result<Resolution>),
        Panic,
    }

    /// Replays a fixed script; the last step repeats.
    struct Scripted {
        steps: Mutex<VecDeque<Step>>,
        repeat: fn() -> Step,
    }

    impl Scripted {
        fn new(steps: Vec<Step>, repeat: fn() -> Step) -> Self {
            Self {
                steps: Mutex::new(steps.into()),
                repeat,
            }
        }
    }

    #[async_trait]
    impl LinkResolver for Scripted {
        async fn resolve(&self, _query: &Query) -> tracklink_resolver::Result<Resolution> {
            let step = self
                .steps
                .lock()
                .expect("acquire script lock")
                .pop_front()
                .unwrap_or_else(self.repeat);
            match step {
                Step::Answer(answer) => answer,
                Step::Panic => panic!("scraper blew up"),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn policy(delay_ms: u64, max_retries: u32) -> RetryPolicy {
        let config = JobConfig {
            delay: Duration::from_millis(delay_ms),
            max_retries,
            concurrency: 1,
        };
        RetryPolicy::new(&config)
    }

    async fn run(resolver: &Scripted, max_retries: u32) -> (SearchTask, Vec<TaskState>) {
        let scheduler = RetryScheduler::new(policy(100, max_retries));
        let mut task = SearchTask::new(Query::new(0, "Clocks", "Coldplay"));
        let mut states = Vec::new();
        scheduler
            .execute(&mut task, resolver, &CancellationToken::new(), |t| states.push(t.state))
            .await;
        (task, states)
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = policy(1000, 5);
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(4), Duration::from_secs(8));
        assert_eq!(policy.backoff(5), Duration::from_secs(10));
        assert_eq!(policy.backoff(40), Duration::from_secs(10));

        let tight = policy.with_cap_multiplier(3);
        assert_eq!(tight.backoff(3), Duration::from_secs(3));
    }

    #[test]
    fn test_retry_after_stretches_wait_up_to_cap() {
        let policy = policy(1000, 5);
        let limited = |secs| ResolveError::RateLimited {
            platform: Platform::FourShared,
            retry_after: Some(Duration::from_secs(secs)),
        };
        assert_eq!(policy.wait_for(1, &limited(4)), Duration::from_secs(4));
        assert_eq!(policy.wait_for(3, &limited(1)), Duration::from_secs(4));
        assert_eq!(policy.wait_for(1, &limited(120)), Duration::from_secs(10));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let policy = policy(1000, 5).with_jitter(Duration::from_millis(250));
        for _ in 0..50 {
            let wait = policy.wait_for(1, &transient());
            assert!(wait >= Duration::from_secs(1));
            assert!(wait <= Duration::from_millis(1250));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_then_success() {
        let resolver = Scripted::new(
            vec![Step::Answer(Err(transient())), Step::Answer(Err(transient()))],
            || Step::Answer(Ok(found())),
        );
        let (task, states) = run(&resolver, 3).await;

        assert_eq!(task.state, TaskState::Succeeded);
        assert_eq!(task.attempt, 3);
        assert_eq!(
            states,
            vec![
                TaskState::InFlight,
                TaskState::Retrying,
                TaskState::InFlight,
                TaskState::Retrying,
                TaskState::InFlight,
                TaskState::Succeeded,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_exhausted_uses_every_attempt() {
        let resolver = Scripted::new(vec![], || Step::Answer(Err(transient())));
        let (task, _) = run(&resolver, 2).await;

        assert_eq!(task.state, TaskState::Failed);
        assert_eq!(task.last_error, Some(ErrorKind::RetriesExhausted));
        assert_eq!(task.attempt, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_and_permanent_do_not_retry() {
        let resolver = Scripted::new(vec![], || Step::Answer(Ok(Resolution::NotFound)));
        let (task, _) = run(&resolver, 5).await;
        assert_eq!(task.attempt, 1);
        assert_eq!(task.last_error, Some(ErrorKind::NotFound));

        let resolver = Scripted::new(vec![], || {
            Step::Answer(Err(ResolveError::Permanent {
                platform: Platform::YouTube,
                message: "HTTP 403".to_string(),
            }))
        });
        let (task, _) = run(&resolver, 5).await;
        assert_eq!(task.attempt, 1);
        assert_eq!(task.state, TaskState::Failed);
        assert_eq!(task.last_error, Some(ErrorKind::Permanent));
    }

    #[tokio::test(start_paused = true)]
    async fn test_panic_gets_one_extra_attempt() {
        let resolver = Scripted::new(vec![Step::Panic], || Step::Answer(Err(transient())));
        let (task, _) = run(&resolver, 2).await;
        assert_eq!(task.last_error, Some(ErrorKind::RetriesExhausted));
        assert_eq!(task.attempt, 3);

        // only once per task
        let resolver = Scripted::new(vec![], || Step::Panic);
        let (task, _) = run(&resolver, 1).await;
        assert_eq!(task.attempt, 2);
        assert_eq!(task.state, TaskState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_waits_between_attempts() {
        let resolver = Scripted::new(
            vec![Step::Answer(Err(transient())), Step::Answer(Err(transient()))],
            || Step::Answer(Ok(found())),
        );
        let start = Instant::now();
        run(&resolver, 3).await;
        // 100ms after attempt 1, 200ms after attempt 2
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff_aborts() {
        let resolver = Scripted::new(vec![], || Step::Answer(Err(transient())));
        let scheduler = RetryScheduler::new(policy(1000, 5));
        let cancel = CancellationToken::new();
        let mut task = SearchTask::new(Query::new(0, "Clocks", "Coldplay"));

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                cancel.cancel();
            })
        };
        scheduler.execute(&mut task, &resolver, &cancel, |_| {}).await;
        canceller.await.expect("canceller");

        assert_eq!(task.state, TaskState::Aborted);
        assert_eq!(task.last_error, Some(ErrorKind::JobAborted));
        assert_eq!(task.attempt, 1);
    }
}
