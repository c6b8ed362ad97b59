use thiserror::Error;

/// Error type for invalid analysis operations.
#[derive(Error, Debug)]
pub enum SnrError {
    #[error("{0}")]
    Error(String),
    #[error("Sample is empty: {0}")]
    EmptySample(String),
    #[error("Quantile must lie in [0, 1], got {0}")]
    InvalidQuantile(f64),
    #[error("Dimension mismatch. Expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("Raster geometry mismatch between {0} and {1}")]
    GeometryMismatch(String, String),
    #[error("No periods selected for aggregation")]
    EmptySelection,
    #[error("Unknown period label: {0}")]
    UnknownPeriod(String),
    #[error("Could not parse {what}: {reason}")]
    Parse { what: String, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl SnrError {
    pub(crate) fn parse(what: impl Into<String>, reason: impl ToString) -> Self {
        SnrError::Parse {
            what: what.into(),
            reason: reason.to_string(),
        }
    }
}

/// Convenience type for `Result<T, SnrError>`.
pub type SnrResult<T> = Result<T, SnrError>;
