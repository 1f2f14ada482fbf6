//! Error types for source ingestion.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading a source extract.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Source file not found.
    #[error("source file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Failed to read file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Bytes are not valid in the configured encoding.
    #[error("{path} is not valid {encoding}")]
    Decode {
        path: PathBuf,
        encoding: &'static str,
    },

    /// Malformed delimited record.
    #[error("failed to parse {path}: {source}")]
    CsvParse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// File has no content at all.
    #[error("source file is empty: {path}")]
    EmptyFile { path: PathBuf },

    /// First record carries no usable column names.
    #[error("could not detect header row in {path}")]
    NoHeaderDetected { path: PathBuf },
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IngestError::FileNotFound {
            path: PathBuf::from("/data/DNF.csv"),
        };
        assert_eq!(err.to_string(), "source file not found: /data/DNF.csv");

        let err = IngestError::Decode {
            path: PathBuf::from("MUR.csv"),
            encoding: "UTF-8",
        };
        assert_eq!(err.to_string(), "MUR.csv is not valid UTF-8");
    }
}
