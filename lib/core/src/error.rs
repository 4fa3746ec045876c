use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Data error at row {row}, column '{column}': {reason}")]
    Data {
        row: usize,
        column: String,
        reason: String,
    },

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Index build failed: {0}")]
    IndexBuild(String),

    #[error("Index query failed: {0}")]
    Query(String),

    #[error("Walk exhausted after {produced} of {target} items: no unvisited neighbor reachable from item {last}")]
    WalkExhausted {
        produced: usize,
        target: usize,
        last: usize,
    },

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding space mismatch: {left} vs {right}")]
    SpaceMismatch { left: String, right: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for the two variants that describe incompatible embedding spaces.
    pub fn is_dimension_mismatch(&self) -> bool {
        matches!(self, Error::DimensionMismatch { .. } | Error::SpaceMismatch { .. })
    }
}
