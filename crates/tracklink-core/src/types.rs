//! Shared types used across tracklink.
//!
//! This module defines the domain vocabulary of a lookup job: the job
//! identifier, the queries parsed from an upload, the links resolved for
//! them, the per-job configuration, and the task/job state enums.

use crate::error::{ConfigError, TracklinkError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Unique identifier of a lookup job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Create a new random `JobId` using UUID v4.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a `JobId` from its hyphenated string form.
    ///
    /// # Errors
    /// Returns error if the string is not a valid UUID.
    pub fn parse(id: &str) -> Result<Self, TracklinkError> {
        Uuid::parse_str(id)
            .map(Self)
            .map_err(|e| TracklinkError::Validation(format!("invalid job ID '{id}': {e}")))
    }

    /// Get the inner UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// External platform a link can be resolved on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    /// youtube.com video pages
    #[serde(rename = "youtube")]
    YouTube,
    /// 4shared.com file pages
    #[serde(rename = "4shared")]
    FourShared,
}

impl Platform {
    /// Get a human-readable name for the platform.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::YouTube => "YouTube",
            Self::FourShared => "4shared",
        }
    }

    /// Configuration key for the platform.
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Self::YouTube => "youtube",
            Self::FourShared => "4shared",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for Platform {
    type Err = TracklinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "youtube" | "yt" => Ok(Self::YouTube),
            "4shared" | "fourshared" => Ok(Self::FourShared),
            other => Err(TracklinkError::Validation(format!(
                "unknown platform '{other}'"
            ))),
        }
    }
}

/// A resolved link on an external platform. Immutable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    /// Platform the link points at
    pub platform: Platform,
    /// Absolute URL
    pub url: String,
}

impl Link {
    /// Create a new link.
    #[must_use]
    pub fn new(platform: Platform, url: impl Into<String>) -> Self {
        Self {
            platform,
            url: url.into(),
        }
    }
}

/// One track/artist pair to resolve, tagged with its position in the upload.
///
/// `row_index` is the 0-based data-row position in the uploaded file and is
/// stable for the lifetime of the job. `source_fields` keeps the raw record so
/// the export can reproduce the original columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// 0-based data-row index in the uploaded file
    pub row_index: usize,
    /// Track title
    pub track_name: String,
    /// Artist name(s)
    pub artist_name: String,
    /// Raw record cells, in input column order
    #[serde(default)]
    pub source_fields: Vec<String>,
}

impl Query {
    /// Create a query without source fields.
    #[must_use]
    pub fn new(
        row_index: usize,
        track_name: impl Into<String>,
        artist_name: impl Into<String>,
    ) -> Self {
        Self {
            row_index,
            track_name: track_name.into(),
            artist_name: artist_name.into(),
            source_fields: Vec::new(),
        }
    }

    /// Attach the raw record cells.
    #[must_use]
    pub fn with_source_fields(mut self, fields: Vec<String>) -> Self {
        self.source_fields = fields;
        self
    }

    /// Short label used in logs and progress messages.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} - {}", self.track_name, self.artist_name)
    }
}

/// Validated per-job configuration.
///
/// Ranges are enforced by [`JobConfig::new`]; the fields are public for
/// reading but a `JobConfig` obtained any other way than through the
/// constructor (or `Default`) is not guaranteed to be in range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JobConfig {
    /// Per-worker pacing delay, also the backoff seed
    pub delay: Duration,
    /// Total attempts allowed per task (not additional retries)
    pub max_retries: u32,
    /// Worker pool size
    pub concurrency: usize,
}

impl JobConfig {
    /// Lowest accepted delay, in seconds.
    pub const MIN_DELAY_SECS: f64 = 0.1;
    /// Highest accepted delay, in seconds.
    pub const MAX_DELAY_SECS: f64 = 10.0;
    /// Accepted range for `max_retries`.
    pub const MAX_RETRIES_RANGE: std::ops::RangeInclusive<u32> = 1..=10;
    /// Accepted range for `concurrency`.
    pub const CONCURRENCY_RANGE: std::ops::RangeInclusive<usize> = 1..=3;

    /// Validate and build a job configuration.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` when any parameter is out of range.
    pub fn new(delay_secs: f64, max_retries: u32, concurrency: usize) -> Result<Self, ConfigError> {
        if !delay_secs.is_finite()
            || !(Self::MIN_DELAY_SECS..=Self::MAX_DELAY_SECS).contains(&delay_secs)
        {
            return Err(ConfigError::invalid(
                "delay_secs",
                format!(
                    "must be between {} and {} seconds, got {delay_secs}",
                    Self::MIN_DELAY_SECS,
                    Self::MAX_DELAY_SECS
                ),
            ));
        }

        if !Self::MAX_RETRIES_RANGE.contains(&max_retries) {
            return Err(ConfigError::invalid(
                "max_retries",
                format!("must be between 1 and 10, got {max_retries}"),
            ));
        }

        if !Self::CONCURRENCY_RANGE.contains(&concurrency) {
            return Err(ConfigError::invalid(
                "concurrency",
                format!("must be between 1 and 3, got {concurrency}"),
            ));
        }

        Ok(Self {
            delay: Duration::from_secs_f64(delay_secs),
            max_retries,
            concurrency,
        })
    }
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(1500),
            max_retries: 3,
            concurrency: 2,
        }
    }
}

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Created, workers not yet started
    Pending,
    /// Workers are draining the queue
    Running,
    /// Every task reached a terminal state
    Completed,
    /// Cancelled by the user
    Aborted,
}

impl JobStatus {
    /// Whether the job has finished (export may be requested).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Running => write!(f, "Running"),
            Self::Completed => write!(f, "Completed"),
            Self::Aborted => write!(f, "Aborted"),
        }
    }
}

/// State of a single search task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    /// Waiting in the job queue
    Queued,
    /// A resolver call is running
    InFlight,
    /// Waiting for backoff before the next attempt
    Retrying,
    /// Resolved to a link
    Succeeded,
    /// Terminated without a link
    Failed,
    /// Terminated by job cancellation
    Aborted,
    /// Dropped at ingestion; never searched
    Skipped,
}

impl TaskState {
    /// Whether the state is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::Aborted | Self::Skipped
        )
    }

    /// Whether a worker currently owns a task in this state.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::InFlight | Self::Retrying)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Queued => "Queued",
            Self::InFlight => "InFlight",
            Self::Retrying => "Retrying",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Aborted => "Aborted",
            Self::Skipped => "Skipped",
        };
        write!(f, "{s}")
    }
}

/// Per-row error taxonomy carried in progress events and exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Network or timeout failure; retryable
    Transient,
    /// Platform asked us to slow down; retryable
    RateLimited,
    /// Malformed or blocked query; not retryable
    Permanent,
    /// No platform had a match
    NotFound,
    /// Transient failures used up every attempt
    RetriesExhausted,
    /// Job was cancelled before the row finished
    JobAborted,
    /// Resolver failed in an unexpected way (treated as transient)
    Unexpected,
}

impl ErrorKind {
    /// Whether a failure of this kind may be retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient | Self::RateLimited | Self::Unexpected)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Transient => "TransientError",
            Self::RateLimited => "RateLimited",
            Self::Permanent => "PermanentError",
            Self::NotFound => "NotFound",
            Self::RetriesExhausted => "RetriesExhausted",
            Self::JobAborted => "JobAborted",
            Self::Unexpected => "UnexpectedError",
        };
        write!(f, "{s}")
    }
}

/// Wrapper around `chrono::DateTime<Utc>` for consistent timestamp handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp representing the current moment.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Get the inner `DateTime<Utc>`.
    #[must_use]
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Format as RFC3339 string.
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_roundtrip_and_uniqueness() {
        let id = JobId::generate();
        let parsed = JobId::parse(&id.to_string()).expect("parse job ID");
        assert_eq!(id, parsed);
        assert_ne!(JobId::generate(), JobId::generate());
    }

    #[test]
    fn test_job_id_invalid() {
        assert!(JobId::parse("not-a-uuid").is_err());
        assert!(JobId::parse("").is_err());
    }

    #[test]
    fn test_platform_from_str() {
        assert_eq!("YouTube".parse::<Platform>().expect("youtube"), Platform::YouTube);
        assert_eq!("4shared".parse::<Platform>().expect("4shared"), Platform::FourShared);
        assert_eq!(
            " fourshared ".parse::<Platform>().expect("fourshared"),
            Platform::FourShared
        );
        assert!("soundcloud".parse::<Platform>().is_err());
    }

    #[test]
    fn test_platform_serialization() {
        let json = serde_json::to_string(&Platform::FourShared).expect("serialize platform");
        assert_eq!(json, "\"4shared\"");
    }

    #[test]
    fn test_job_config_accepts_boundaries() {
        let low = JobConfig::new(0.1, 1, 1).expect("lower bounds are valid");
        assert_eq!(low.delay, Duration::from_millis(100));
        let high = JobConfig::new(10.0, 10, 3).expect("upper bounds are valid");
        assert_eq!(high.concurrency, 3);
    }

    #[test]
    fn test_job_config_rejects_out_of_range() {
        let cases = [
            (0.05, 3, 2, "delay_secs"),
            (10.5, 3, 2, "delay_secs"),
            (f64::NAN, 3, 2, "delay_secs"),
            (1.0, 0, 2, "max_retries"),
            (1.0, 11, 2, "max_retries"),
            (1.0, 3, 0, "concurrency"),
            (1.0, 3, 4, "concurrency"),
        ];

        for (delay, retries, concurrency, expected_field) in cases {
            match JobConfig::new(delay, retries, concurrency) {
                Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, expected_field),
                other => panic!("expected InvalidValue for {expected_field}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_task_state_classification() {
        assert!(TaskState::Succeeded.is_terminal());
        assert!(TaskState::Aborted.is_terminal());
        assert!(TaskState::Skipped.is_terminal());
        assert_eq!(TaskState::Skipped.to_string(), "Skipped");
        assert!(!TaskState::Retrying.is_terminal());
        assert!(TaskState::InFlight.is_active());
        assert!(!TaskState::Queued.is_active());
    }

    #[test]
    fn test_error_kind_retryable() {
        assert!(ErrorKind::Transient.is_retryable());
        assert!(ErrorKind::RateLimited.is_retryable());
        assert!(!ErrorKind::NotFound.is_retryable());
        assert!(!ErrorKind::Permanent.is_retryable());
        assert_eq!(ErrorKind::RetriesExhausted.to_string(), "RetriesExhausted");
    }

    #[test]
    fn test_query_label() {
        let q = Query::new(4, "Garota de Ipanema", "Tom Jobim");
        assert_eq!(q.label(), "Garota de Ipanema - Tom Jobim");
        assert!(q.source_fields.is_empty());
    }
}
