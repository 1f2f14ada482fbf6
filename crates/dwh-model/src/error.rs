use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("column not found: {column} (available: {})", available.join(", "))]
    ColumnNotFound {
        column: String,
        available: Vec<String>,
    },

    #[error("duplicate column name: {column}")]
    DuplicateColumn { column: String },

    #[error("row {row} has {found} values, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("surrogate keys must be positive integers, got {0}")]
    ZeroSurrogateKey(u64),

    #[error("no surrogate key follows {0}")]
    KeySpaceExhausted(u64),

    #[error("invalid surrogate key {value:?} in column {column} at row {row}")]
    InvalidSurrogateKey {
        column: String,
        row: usize,
        value: String,
    },

    #[error("duplicate surrogate key {key} in column {column}")]
    DuplicateSurrogateKey { column: String, key: u64 },

    #[error("duplicate natural key ({key}) for {column}")]
    DuplicateNaturalKey { column: String, key: String },
}

pub type Result<T> = std::result::Result<T, ModelError>;
