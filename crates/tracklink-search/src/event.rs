//! Progress events.

use crate::retry::SearchTask;
use serde::{Deserialize, Serialize};
use tracklink_core::{ErrorKind, JobId, Link, TaskState, Timestamp};

/// One status update for one row.
///
/// `seq` is assigned by the broadcaster on publish and increases by one per
/// event within a job, so subscribers can resume from the last value seen.
///
/// Per row the sequence is `Queued`, then `InFlight` for every attempt with
/// a `Retrying` between consecutive attempts, then exactly one of
/// `Succeeded`, `Failed` or `Aborted`. A row that succeeds on its third
/// attempt emits `Queued, InFlight, Retrying, InFlight, Retrying, InFlight,
/// Succeeded`. A row aborted while still queued goes straight from `Queued`
/// to `Aborted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Owning job
    pub job_id: JobId,
    /// Per-job sequence number (starts at 1)
    pub seq: u64,
    /// Row the event is about
    pub row_index: usize,
    /// Task state after the transition
    pub state: TaskState,
    /// Attempts started so far
    pub attempt: u32,
    /// Link, once found
    pub result: Option<Link>,
    /// Error kind for failed or retrying tasks
    pub error: Option<ErrorKind>,
    /// Human-readable detail
    pub message: Option<String>,
    /// When the transition happened
    pub timestamp: Timestamp,
}

impl ProgressEvent {
    /// Capture the current state of a task.
    #[must_use]
    pub fn from_task(job_id: JobId, task: &SearchTask) -> Self {
        Self {
            job_id,
            seq: 0,
            row_index: task.query.row_index,
            state: task.state,
            attempt: task.attempt,
            result: task.result.clone(),
            error: task.last_error,
            message: task.message.clone(),
            timestamp: Timestamp::now(),
        }
    }

    /// Whether this event closes the row.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
