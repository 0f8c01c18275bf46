//! Shared vocabulary for tracklink.
//!
//! Every other crate speaks in these types: a [`Query`] per spreadsheet row,
//! the [`Link`] it resolves to, the bounded [`JobConfig`] a job runs under,
//! and the [`TaskState`] / [`ErrorKind`] values that progress events carry.
//!
//! - [`types`] - identifiers, queries, links, job and task states
//! - [`config`] - `config.toml` loading with `TRACKLINK_*` env overrides
//! - [`error`] - `TracklinkError` and `ConfigError`
//!
//! # Example
//!
//! ```rust
//! use tracklink_core::{AppConfig, JobConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! let job_config: JobConfig = config.search.job_config()?;
//! assert_eq!(job_config.concurrency, 2);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, JobsConfig, ProgressConfig, ResolverConfig, SearchConfig};
pub use error::{ConfigError, ConfigResult, Result, TracklinkError};
pub use types::{
    ErrorKind, JobConfig, JobId, JobStatus, Link, Platform, Query, TaskState, Timestamp,
};
