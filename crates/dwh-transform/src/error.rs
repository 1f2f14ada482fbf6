use dwh_model::ModelError;
use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("dataframe operation failed: {0}")]
    Polars(#[from] PolarsError),

    #[error("{count} rows have no match for foreign key {foreign_key}")]
    UnresolvedRejected { foreign_key: String, count: usize },

    #[error("{what} needs at least one column")]
    NoColumns { what: &'static str },
}

pub type Result<T> = std::result::Result<T, TransformError>;
