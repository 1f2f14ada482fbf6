//! Error types for configuration and stage execution.

use std::io;
use std::path::PathBuf;

use dwh_ingest::IngestError;
use dwh_model::ModelError;
use dwh_output::OutputError;
use dwh_transform::TransformError;
use thiserror::Error;

/// Configuration problems. All of them are detected before any file is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{field}: invalid regular expression: {source}")]
    InvalidPattern {
        field: String,
        #[source]
        source: regex::Error,
    },

    #[error("{field}: delimiter must be a single ASCII character, got {value:?}")]
    InvalidDelimiter { field: String, value: String },

    #[error("unknown family {name:?}, expected one of: {known}")]
    UnknownFamily { name: String, known: String },

    #[error("family {family} has no stage {name:?}, expected one of: {known}")]
    UnknownStage {
        family: &'static str,
        name: String,
        known: String,
    },

    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },

    #[error("{path} is written by both {first} and {second}")]
    SharedOutput {
        path: PathBuf,
        first: String,
        second: String,
    },
}

/// Failure of a single stage.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("input {artifact} is unavailable at {path}: {source}")]
    InputUnavailable {
        artifact: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path}: none of the columns {candidates:?} is present")]
    MissingColumn {
        path: PathBuf,
        candidates: Vec<String>,
    },

    #[error("{count} rows have no match for foreign key {foreign_key}")]
    UnresolvedRejected { foreign_key: String, count: usize },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Transform(TransformError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl From<TransformError> for StageError {
    fn from(error: TransformError) -> Self {
        match error {
            TransformError::UnresolvedRejected { foreign_key, count } => {
                Self::UnresolvedRejected { foreign_key, count }
            }
            other => Self::Transform(other),
        }
    }
}

/// Error returned by the pipeline entry points.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("stage {family}/{stage} failed: {source}")]
    Stage {
        family: &'static str,
        stage: &'static str,
        #[source]
        source: StageError,
    },
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
