//! Ordered result collection.

use crate::error::{Result, SearchError};
use crate::retry::SearchTask;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;
use tracklink_core::{ErrorKind, JobId, JobStatus, Link, Platform, Query, TaskState};

/// Terminal outcome of one row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowOutcome {
    /// Row the outcome belongs to
    pub row_index: usize,
    /// Terminal state
    pub state: TaskState,
    /// Link, when found
    pub link: Option<Link>,
    /// Failure kind, when not found
    pub error: Option<ErrorKind>,
    /// Failure detail
    pub message: Option<String>,
    /// Attempts used
    pub attempts: u32,
}

impl RowOutcome {
    /// Outcome of a finished task.
    #[must_use]
    pub fn from_task(task: &SearchTask) -> Self {
        Self {
            row_index: task.query.row_index,
            state: task.state,
            link: task.result.clone(),
            error: task.last_error,
            message: task.message.clone(),
            attempts: task.attempt,
        }
    }

    fn aborted(row_index: usize) -> Self {
        Self {
            row_index,
            state: TaskState::Aborted,
            link: None,
            error: Some(ErrorKind::JobAborted),
            message: None,
            attempts: 0,
        }
    }

    fn describe(&self) -> String {
        match (&self.link, self.error) {
            (Some(link), _) => format!("found on {}", link.platform.display_name()),
            (None, Some(kind)) => kind.to_string(),
            (None, None) => self.state.to_string(),
        }
    }
}

/// One line of the final export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    /// Original row position
    pub row_index: usize,
    /// Track title
    pub track_name: String,
    /// Artist name(s)
    pub artist_name: String,
    /// Raw input cells
    pub source_fields: Vec<String>,
    /// `Succeeded`, `Failed`, `Aborted` or `Skipped`
    pub status: TaskState,
    /// Resolved link, if any
    pub link: Option<Link>,
    /// Failure kind, if any
    pub error: Option<ErrorKind>,
    /// Attempts used
    pub attempts: u32,
}

impl ExportRow {
    /// Line for an input row that was never searched.
    #[must_use]
    pub fn skipped(row_index: usize, source_fields: Vec<String>) -> Self {
        Self {
            row_index,
            track_name: String::new(),
            artist_name: String::new(),
            source_fields,
            status: TaskState::Skipped,
            link: None,
            error: None,
            attempts: 0,
        }
    }
}

/// Running totals for a job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobStats {
    /// Rows in the job
    pub total_songs: usize,
    /// Rows resolved on YouTube
    pub youtube_found: usize,
    /// Rows resolved on 4shared
    pub fourshared_found: usize,
    /// Rows no platform matched
    pub not_found: usize,
    /// Rows that failed for any other reason
    pub errors: usize,
    /// Rows cut short by cancellation
    pub aborted: usize,
}

/// Collects terminal outcomes keyed by row index.
#[derive(Debug)]
pub struct ResultAssembler {
    job_id: JobId,
    queries: Vec<Query>,
    outcomes: BTreeMap<usize, RowOutcome>,
    last_message: Option<String>,
}

impl ResultAssembler {
    /// Create an assembler for the given rows.
    #[must_use]
    pub fn new(job_id: JobId, mut queries: Vec<Query>) -> Self {
        queries.sort_by_key(|q| q.row_index);
        Self {
            job_id,
            queries,
            outcomes: BTreeMap::new(),
            last_message: None,
        }
    }

    /// Record a row's terminal outcome. Each row accepts exactly one.
    pub fn record(&mut self, outcome: RowOutcome) -> Result<()> {
        let row_index = outcome.row_index;
        let query = self
            .query(row_index)
            .ok_or(SearchError::UnknownRow { row_index })?;
        if self.outcomes.contains_key(&row_index) {
            return Err(SearchError::DuplicateOutcome { row_index });
        }

        let message = format!("{}: {}", query.label(), outcome.describe());
        debug!(job_id = %self.job_id, row_index, "{message}");
        self.last_message = Some(message);
        self.outcomes.insert(row_index, outcome);
        Ok(())
    }

    fn query(&self, row_index: usize) -> Option<&Query> {
        self.queries
            .binary_search_by_key(&row_index, |q| q.row_index)
            .ok()
            .map(|i| &self.queries[i])
    }

    /// Rows in the job.
    #[must_use]
    pub fn total(&self) -> usize {
        self.queries.len()
    }

    /// Rows with a recorded outcome.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether every row has an outcome.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.outcomes.len() == self.queries.len()
    }

    /// Description of the most recently recorded row.
    #[must_use]
    pub fn last_message(&self) -> Option<&str> {
        self.last_message.as_deref()
    }

    /// Totals over the recorded outcomes.
    #[must_use]
    pub fn stats(&self) -> JobStats {
        let mut stats = JobStats {
            total_songs: self.queries.len(),
            ..JobStats::default()
        };
        for outcome in self.outcomes.values() {
            match (&outcome.link, outcome.state, outcome.error) {
                (Some(link), _, _) => match link.platform {
                    Platform::YouTube => stats.youtube_found += 1,
                    Platform::FourShared => stats.fourshared_found += 1,
                },
                (None, TaskState::Aborted, _) => stats.aborted += 1,
                (None, _, Some(ErrorKind::NotFound)) => stats.not_found += 1,
                (None, _, _) => stats.errors += 1,
            }
        }
        stats
    }

    /// Build the export, one row per query in row order.
    ///
    /// Only valid once the job is `Completed` or `Aborted`; rows that never
    /// finished are exported as `Aborted`.
    pub fn finalize(&self, status: JobStatus) -> Result<Vec<ExportRow>> {
        if !status.is_terminal() {
            return Err(SearchError::NotReady {
                job_id: self.job_id,
                status,
            });
        }

        Ok(self
            .queries
            .iter()
            .map(|query| {
                let outcome = self
                    .outcomes
                    .get(&query.row_index)
                    .cloned()
                    .unwrap_or_else(|| RowOutcome::aborted(query.row_index));
                ExportRow {
                    row_index: query.row_index,
                    track_name: query.track_name.clone(),
                    artist_name: query.artist_name.clone(),
                    source_fields: query.source_fields.clone(),
                    status: outcome.state,
                    link: outcome.link,
                    error: outcome.error,
                    attempts: outcome.attempts,
                }
            })
            .collect())
    }
}
