//! Job orchestrator.
//!
//! Runs one job with a fixed pool of workers pulling from a shared FIFO
//! queue. Each worker paces itself: after finishing a task it waits the job
//! delay before taking the next one, so the aggregate request rate scales with
//! the worker count.

use crate::assembler::{ResultAssembler, RowOutcome};
use crate::broadcaster::ProgressBroadcaster;
use crate::event::ProgressEvent;
use crate::retry::{RetryPolicy, RetryScheduler, SearchTask, DEFAULT_CAP_MULTIPLIER};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracklink_core::{JobConfig, JobId, JobStatus, Query};
use tracklink_resolver::LinkResolver;

/// A submitted job.
#[derive(Debug, Clone)]
pub struct Job {
    /// Job identifier
    pub id: JobId,
    /// Validated parameters
    pub config: JobConfig,
    /// Rows to resolve, in row order
    pub queries: Vec<Query>,
}

impl Job {
    /// Create a job with a fresh id.
    #[must_use]
    pub fn new(config: JobConfig, mut queries: Vec<Query>) -> Self {
        queries.sort_by_key(|q| q.row_index);
        Self {
            id: JobId::generate(),
            config,
            queries,
        }
    }
}

/// FIFO of tasks not yet picked up by a worker.
struct TaskQueue {
    tasks: Mutex<VecDeque<SearchTask>>,
}

impl TaskQueue {
    fn new(tasks: VecDeque<SearchTask>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
        }
    }

    fn pop(&self) -> Option<SearchTask> {
        self.tasks.lock().expect("acquire lock on task queue").pop_front()
    }

    fn is_empty(&self) -> bool {
        self.tasks.lock().expect("acquire lock on task queue").is_empty()
    }

    fn drain(&self) -> Vec<SearchTask> {
        self.tasks
            .lock()
            .expect("acquire lock on task queue")
            .drain(..)
            .collect()
    }
}

/// Drives jobs to completion against a resolver.
pub struct SearchOrchestrator {
    resolver: Arc<dyn LinkResolver>,
    broadcaster: Arc<ProgressBroadcaster>,
    cap_multiplier: u32,
    jitter: Duration,
}

impl SearchOrchestrator {
    /// Create an orchestrator.
    #[must_use]
    pub fn new(resolver: Arc<dyn LinkResolver>, broadcaster: Arc<ProgressBroadcaster>) -> Self {
        Self {
            resolver,
            broadcaster,
            cap_multiplier: DEFAULT_CAP_MULTIPLIER,
            jitter: Duration::ZERO,
        }
    }

    /// Cap retry backoff at `multiplier` times the job delay.
    #[must_use]
    pub fn with_backoff_cap(mut self, multiplier: u32) -> Self {
        self.cap_multiplier = multiplier;
        self
    }

    /// Add random jitter of up to `jitter` to retry waits.
    #[must_use]
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// The broadcaster events are published to.
    #[must_use]
    pub fn broadcaster(&self) -> &Arc<ProgressBroadcaster> {
        &self.broadcaster
    }

    /// Run `job` until every task is terminal or `cancel` fires.
    ///
    /// Outcomes go into `assembler`; progress events go to the broadcaster
    /// (the job's channel must already be open). Returns `Completed`, or
    /// `Aborted` if cancelled, in which case every task that had not finished
    /// is recorded as aborted before returning.
    pub async fn run(
        &self,
        job: &Job,
        assembler: &Mutex<ResultAssembler>,
        cancel: CancellationToken,
    ) -> JobStatus {
        info!(
            job_id = %job.id,
            rows = job.queries.len(),
            concurrency = job.config.concurrency,
            "Starting job"
        );

        let tasks: VecDeque<SearchTask> = job.queries.iter().cloned().map(SearchTask::new).collect();
        for task in &tasks {
            self.emit(job.id, task);
        }
        let queue = TaskQueue::new(tasks);

        let scheduler = RetryScheduler::new(
            RetryPolicy::new(&job.config)
                .with_cap_multiplier(self.cap_multiplier)
                .with_jitter(self.jitter),
        );

        let mut workers: FuturesUnordered<_> = (0..job.config.concurrency)
            .map(|worker| self.worker(worker, job, &queue, &scheduler, assembler, &cancel))
            .collect();
        while workers.next().await.is_some() {}

        let leftover = queue.drain();
        if !leftover.is_empty() {
            debug!(job_id = %job.id, count = leftover.len(), "Aborting queued tasks");
        }
        for mut task in leftover {
            task.abort();
            self.emit(job.id, &task);
            self.record(job.id, assembler, &task);
        }

        let status = if cancel.is_cancelled() {
            JobStatus::Aborted
        } else {
            JobStatus::Completed
        };
        info!(job_id = %job.id, %status, "Job finished");
        status
    }

    async fn worker(
        &self,
        worker: usize,
        job: &Job,
        queue: &TaskQueue,
        scheduler: &RetryScheduler,
        assembler: &Mutex<ResultAssembler>,
        cancel: &CancellationToken,
    ) {
        let mut paced = false;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            if paced {
                // the queue only shrinks, so an empty one means we are done
                if queue.is_empty() {
                    break;
                }
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(job.config.delay) => {}
                }
            }

            let Some(mut task) = queue.pop() else {
                break;
            };
            debug!(job_id = %job.id, worker, row = task.query.row_index, "Picked up task");

            scheduler
                .execute(&mut task, self.resolver.as_ref(), cancel, |t| self.emit(job.id, t))
                .await;
            self.record(job.id, assembler, &task);
            paced = true;
        }

        debug!(job_id = %job.id, worker, "Worker exiting");
    }

    fn emit(&self, job_id: JobId, task: &SearchTask) {
        self.broadcaster.publish(ProgressEvent::from_task(job_id, task));
    }

    fn record(&self, job_id: JobId, assembler: &Mutex<ResultAssembler>, task: &SearchTask) {
        let result = assembler
            .lock()
            .expect("acquire lock on result assembler")
            .record(RowOutcome::from_task(task));
        if let Err(e) = result {
            error!(job_id = %job_id, row = task.query.row_index, "Failed to record outcome: {e}");
        }
    }
}
