//! Error types for job orchestration and export.

use thiserror::Error;
use tracklink_core::{ConfigError, JobId, JobStatus};

/// Errors surfaced by the job service.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Job parameters out of range
    #[error("invalid job configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// Job submitted without queries
    #[error("job has no queries to search")]
    EmptyJob,

    /// Two queries of one job share a row index
    #[error("row {row_index} appears more than once in the job")]
    DuplicateRow {
        /// Repeated row index
        row_index: usize,
    },

    /// Unknown or already released job
    #[error("job not found: {0}")]
    JobNotFound(JobId),

    /// Export requested before the job finished
    #[error("job {job_id} is not finished (status: {status})")]
    NotReady {
        /// Job that was queried
        job_id: JobId,
        /// Its current status
        status: JobStatus,
    },

    /// Second terminal outcome recorded for the same row
    #[error("row {row_index} already has a terminal outcome")]
    DuplicateOutcome {
        /// Offending row
        row_index: usize,
    },

    /// Outcome recorded for a row the job does not contain
    #[error("row {row_index} is not part of this job")]
    UnknownRow {
        /// Offending row
        row_index: usize,
    },

    /// CSV export failure
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    /// Spreadsheet export failure
    #[error("XLSX export failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// Export too large for the target format
    #[error("export error: {0}")]
    Export(String),
}

/// Result type for search operations.
pub type Result<T> = std::result::Result<T, SearchError>;
