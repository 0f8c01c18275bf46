//! CSV ingestion into ordered queries.

use crate::error::{IngestError, Result};
use crate::schema::{ColumnMap, HeaderSchema};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};
use tracklink_core::Query;

/// A data row dropped during ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    /// 0-based data-row index in the file
    pub row_index: usize,
    /// Header labels of the missing required fields
    pub missing_fields: Vec<String>,
    /// Raw cells as they appear in the file
    pub source_fields: Vec<String>,
}

/// Result of ingesting one uploaded file.
#[derive(Debug, Clone)]
pub struct IngestedFile {
    /// Detected header schema
    pub schema: HeaderSchema,
    /// Header row as it appears in the file
    pub headers: Vec<String>,
    /// Usable queries, in row order
    pub queries: Vec<Query>,
    /// Rows dropped for missing fields
    pub skipped: Vec<SkippedRow>,
}

/// Parses delimited tabular text into [`Query`] values.
#[derive(Debug, Clone)]
pub struct RowIngestor {
    delimiter: u8,
}

impl RowIngestor {
    /// Create an ingestor for comma-separated input.
    #[must_use]
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    /// Use a different field delimiter.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Read and ingest a file from disk.
    pub fn ingest_path(&self, path: impl AsRef<Path>) -> Result<IngestedFile> {
        let path = path.as_ref();
        debug!("Reading input file {}", path.display());
        let bytes = std::fs::read(path)?;
        self.ingest(&bytes)
    }

    /// Ingest raw bytes.
    ///
    /// Fails with `MalformedInput` for non-UTF-8 data, a missing header row,
    /// or unparseable CSV; `UnsupportedSchema` when neither header pair is
    /// present; `EmptyJob` when no row survives filtering.
    pub fn ingest(&self, bytes: &[u8]) -> Result<IngestedFile> {
        let text = std::str::from_utf8(bytes).map_err(|e| {
            IngestError::MalformedInput(format!("input is not valid UTF-8: {e}"))
        })?;

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.iter().all(|h| h.trim_start_matches('\u{feff}').is_empty()) {
            return Err(IngestError::MalformedInput(
                "missing header row".to_string(),
            ));
        }

        let columns = HeaderSchema::detect(&headers).ok_or_else(|| {
            IngestError::UnsupportedSchema {
                found: headers.clone(),
            }
        })?;
        debug!(schema = ?columns.schema, "Detected header schema");

        let mut queries = Vec::new();
        let mut skipped = Vec::new();

        for (row_index, record) in reader.records().enumerate() {
            let record = record?;
            match extract_query(row_index, &record, &columns) {
                Ok(query) => queries.push(query),
                Err(missing_fields) => {
                    warn!(
                        row_index,
                        ?missing_fields,
                        "Skipping row with missing required fields"
                    );
                    skipped.push(SkippedRow {
                        row_index,
                        missing_fields,
                        source_fields: record.iter().map(str::to_string).collect(),
                    });
                }
            }
        }

        if queries.is_empty() {
            return Err(IngestError::EmptyJob {
                skipped: skipped.len(),
            });
        }

        info!(
            rows = queries.len(),
            skipped = skipped.len(),
            "Ingested {:?} input",
            columns.schema
        );

        Ok(IngestedFile {
            schema: columns.schema,
            headers,
            queries,
            skipped,
        })
    }
}

impl Default for RowIngestor {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a query from one record, or report which required headers are empty.
fn extract_query(
    row_index: usize,
    record: &csv::StringRecord,
    columns: &ColumnMap,
) -> std::result::Result<Query, Vec<String>> {
    let field = |idx: usize| record.get(idx).map(str::trim).filter(|v| !v.is_empty());

    match (field(columns.track), field(columns.artist)) {
        (Some(track), Some(artist)) => Ok(Query::new(row_index, track, artist)
            .with_source_fields(record.iter().map(str::to_string).collect())),
        (track, artist) => {
            let mut missing = Vec::new();
            if track.is_none() {
                missing.push(columns.schema.track_header().to_string());
            }
            if artist.is_none() {
                missing.push(columns.schema.artist_header().to_string());
            }
            Err(missing)
        }
    }
}
