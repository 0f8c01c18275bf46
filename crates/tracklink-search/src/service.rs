//! Job service: the entry point for submitting and observing jobs.

use crate::assembler::{ExportRow, JobStats, ResultAssembler};
use crate::broadcaster::ProgressBroadcaster;
use crate::error::{Result, SearchError};
use crate::event::ProgressEvent;
use crate::orchestrator::{Job, SearchOrchestrator};
use futures::stream::BoxStream;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracklink_core::{AppConfig, JobConfig, JobId, JobStatus, Query};
use tracklink_resolver::LinkResolver;

/// Point-in-time view of a job for polling clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSnapshot {
    /// Job identifier
    pub job_id: JobId,
    /// Lifecycle status
    pub status: JobStatus,
    /// Rows in the job
    pub total: usize,
    /// Rows with a terminal outcome
    pub completed: usize,
    /// Per-platform totals
    pub stats: JobStats,
    /// Description of the latest finished row
    pub last_message: Option<String>,
}

struct JobEntry {
    assembler: Mutex<ResultAssembler>,
    status: watch::Sender<JobStatus>,
    cancel: CancellationToken,
}

type JobMap = RwLock<HashMap<JobId, Arc<JobEntry>>>;

impl JobEntry {
    fn status(&self) -> JobStatus {
        *self.status.borrow()
    }
}

/// Owns running and finished jobs.
///
/// A finished job is kept for the retention period so its export can be
/// fetched, then released automatically unless [`JobService::release`] got
/// to it first.
pub struct JobService {
    orchestrator: Arc<SearchOrchestrator>,
    jobs: Arc<JobMap>,
    retention: Duration,
}

impl JobService {
    /// Create a service from application settings.
    #[must_use]
    pub fn new(resolver: Arc<dyn LinkResolver>, config: &AppConfig) -> Self {
        let broadcaster = Arc::new(ProgressBroadcaster::new(config.progress.backlog_capacity));
        let orchestrator = SearchOrchestrator::new(resolver, broadcaster)
            .with_backoff_cap(config.search.backoff_cap_multiplier)
            .with_jitter(Duration::from_millis(config.search.jitter_ms));
        Self::with_orchestrator(orchestrator, Duration::from_secs(config.jobs.retention_secs))
    }

    /// Create a service around a configured orchestrator.
    #[must_use]
    pub fn with_orchestrator(orchestrator: SearchOrchestrator, retention: Duration) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            jobs: Arc::new(RwLock::new(HashMap::new())),
            retention,
        }
    }

    /// Validate and start a job in the background.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// `InvalidConfig` for out-of-range parameters, `EmptyJob` for no queries,
    /// `DuplicateRow` when two queries share a row index.
    pub fn submit_job(&self, config: JobConfig, queries: Vec<Query>) -> Result<JobId> {
        let config = JobConfig::new(
            config.delay.as_secs_f64(),
            config.max_retries,
            config.concurrency,
        )?;
        if queries.is_empty() {
            return Err(SearchError::EmptyJob);
        }
        let mut seen = HashSet::with_capacity(queries.len());
        if let Some(query) = queries.iter().find(|q| !seen.insert(q.row_index)) {
            return Err(SearchError::DuplicateRow {
                row_index: query.row_index,
            });
        }

        let job = Job::new(config, queries);
        let job_id = job.id;
        let (status, _) = watch::channel(JobStatus::Pending);
        let entry = Arc::new(JobEntry {
            assembler: Mutex::new(ResultAssembler::new(job_id, job.queries.clone())),
            status,
            cancel: CancellationToken::new(),
        });

        self.orchestrator.broadcaster().open(job_id);
        self.jobs
            .write()
            .expect("acquire write lock on jobs")
            .insert(job_id, Arc::clone(&entry));

        info!(
            job_id = %job_id,
            rows = job.queries.len(),
            delay = ?config.delay,
            max_retries = config.max_retries,
            concurrency = config.concurrency,
            "Submitted job"
        );

        let orchestrator = Arc::clone(&self.orchestrator);
        let jobs = Arc::clone(&self.jobs);
        let retention = self.retention;
        tokio::spawn(async move {
            entry.status.send_replace(JobStatus::Running);
            let status = orchestrator
                .run(&job, &entry.assembler, entry.cancel.clone())
                .await;

            entry.status.send_replace(status);
            orchestrator.broadcaster().seal(job.id);
            drop(entry);

            tokio::time::sleep(retention).await;
            if forget(&jobs, &orchestrator, job.id).is_some() {
                info!(job_id = %job.id, "Released job after retention period");
            }
        });

        Ok(job_id)
    }

    fn entry(&self, job_id: JobId) -> Result<Arc<JobEntry>> {
        self.jobs
            .read()
            .expect("acquire read lock on jobs")
            .get(&job_id)
            .cloned()
            .ok_or(SearchError::JobNotFound(job_id))
    }

    /// Follow a job's progress events, optionally resuming after `since`.
    pub fn subscribe(
        &self,
        job_id: JobId,
        since: Option<u64>,
    ) -> Result<BoxStream<'static, ProgressEvent>> {
        self.entry(job_id)?;
        self.orchestrator.broadcaster().subscribe(job_id, since)
    }

    /// Ordered export rows, once the job is finished.
    ///
    /// # Errors
    /// `NotReady` while the job is pending or running.
    pub fn get_export(&self, job_id: JobId) -> Result<Vec<ExportRow>> {
        let entry = self.entry(job_id)?;
        let status = entry.status();
        let assembler = entry.assembler.lock().expect("acquire lock on result assembler");
        assembler.finalize(status)
    }

    /// Current status and counters.
    pub fn status(&self, job_id: JobId) -> Result<JobSnapshot> {
        let entry = self.entry(job_id)?;
        let status = entry.status();
        let assembler = entry.assembler.lock().expect("acquire lock on result assembler");
        Ok(JobSnapshot {
            job_id,
            status,
            total: assembler.total(),
            completed: assembler.completed(),
            stats: assembler.stats(),
            last_message: assembler.last_message().map(ToString::to_string),
        })
    }

    /// Cancel a job. Unfinished rows end up `Aborted`.
    pub fn abort(&self, job_id: JobId) -> Result<()> {
        let entry = self.entry(job_id)?;
        if !entry.status().is_terminal() {
            info!(job_id = %job_id, "Aborting job");
            entry.cancel.cancel();
        }
        Ok(())
    }

    /// Wait until the job is `Completed` or `Aborted`.
    pub async fn wait(&self, job_id: JobId) -> Result<JobStatus> {
        let entry = self.entry(job_id)?;
        let mut receiver = entry.status.subscribe();
        let status = *receiver
            .wait_for(JobStatus::is_terminal)
            .await
            .map_err(|_| SearchError::JobNotFound(job_id))?;
        Ok(status)
    }

    /// Forget a job, cancelling it if it is still running.
    pub fn release(&self, job_id: JobId) -> Result<()> {
        let entry =
            forget(&self.jobs, &self.orchestrator, job_id).ok_or(SearchError::JobNotFound(job_id))?;
        entry.cancel.cancel();
        info!(job_id = %job_id, "Released job");
        Ok(())
    }

    /// Number of jobs currently held.
    #[must_use]
    pub fn job_count(&self) -> usize {
        self.jobs.read().expect("acquire read lock on jobs").len()
    }
}

/// Drop a job and its progress channel. Returns the entry if it was held.
fn forget(
    jobs: &JobMap,
    orchestrator: &SearchOrchestrator,
    job_id: JobId,
) -> Option<Arc<JobEntry>> {
    let entry = jobs
        .write()
        .expect("acquire write lock on jobs")
        .remove(&job_id)?;
    orchestrator.broadcaster().release(job_id);
    Some(entry)
}
