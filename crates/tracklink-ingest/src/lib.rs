//! Row ingestion for tracklink jobs.
//!
//! Turns an uploaded CSV file into the ordered list of [`Query`] values a job
//! runs over. Two header schemas are recognized (case-insensitive):
//!
//! - Exportify playlists: `Track Name`, `Artist Name(s)`
//! - Hand-written sheets: `Música`, `Artista`
//!
//! Rows missing either field are skipped and reported, not fatal.
//!
//! [`Query`]: tracklink_core::Query

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod error;
pub mod ingestor;
pub mod schema;

pub use error::{IngestError, Result};
pub use ingestor::{IngestedFile, RowIngestor, SkippedRow};
pub use schema::HeaderSchema;
