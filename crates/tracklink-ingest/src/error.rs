//! Error types for row ingestion.

use thiserror::Error;

/// Errors that abort job creation during ingestion.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Input is not valid UTF-8 delimited text with a header row
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Header row matches neither recognized schema
    #[error(
        "unsupported header schema: expected \"Track Name\" and \"Artist Name(s)\" \
         or \"Música\" and \"Artista\", found {found:?}"
    )]
    UnsupportedSchema {
        /// Header cells as read from the file
        found: Vec<String>,
    },

    /// Every data row was filtered out
    #[error("no usable rows in input ({skipped} skipped)")]
    EmptyJob {
        /// Number of rows dropped for missing fields
        skipped: usize,
    },

    /// I/O error while reading the input file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<csv::Error> for IngestError {
    fn from(err: csv::Error) -> Self {
        match err.position() {
            Some(pos) => Self::MalformedInput(format!("line {}: {err}", pos.line())),
            None => Self::MalformedInput(err.to_string()),
        }
    }
}

/// Result type for ingestion.
pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IngestError::EmptyJob { skipped: 2 };
        assert_eq!(err.to_string(), "no usable rows in input (2 skipped)");

        let err = IngestError::UnsupportedSchema {
            found: vec!["Song".to_string()],
        };
        assert!(err.to_string().contains("\"Song\""));
    }
}
