//! Tracklink Search - job orchestration.
//!
//! Takes the queries of one uploaded file and resolves them with a small,
//! paced worker pool:
//!
//! - [`RetryScheduler`] drives a single row through its attempts with capped
//!   exponential backoff
//! - [`SearchOrchestrator`] runs the worker pool for a job and handles
//!   cancellation
//! - [`ProgressBroadcaster`] fans progress events out to subscribers with a
//!   bounded replay backlog
//! - [`ResultAssembler`] collects outcomes by row and produces the ordered
//!   export
//! - [`JobService`] ties them together behind submit / subscribe / export
//!
//! Export rows can be rendered with [`to_csv`] and [`to_xlsx`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod assembler;
pub mod broadcaster;
pub mod error;
pub mod event;
pub mod export;
pub mod orchestrator;
pub mod retry;
pub mod service;

pub use assembler::{ExportRow, JobStats, ResultAssembler, RowOutcome};
pub use broadcaster::ProgressBroadcaster;
pub use error::{Result, SearchError};
pub use event::ProgressEvent;
pub use export::{export_headers, to_csv, to_xlsx, RESULT_COLUMNS};
pub use orchestrator::{Job, SearchOrchestrator};
pub use retry::{RetryPolicy, RetryScheduler, SearchTask};
pub use service::{JobService, JobSnapshot};
