use std::path::PathBuf;

/// Errors raised while loading, analyzing or exporting community logs.
///
/// # Examples
///
/// ```
/// use community_stats::Error;
///
/// let err = Error::InvalidInput("no commits".into());
/// assert!(err.to_string().contains("no commits"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed TSV/CSV input or output failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failure.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// A field could not be parsed (timestamp, number, ticket type).
    #[error("parse error in {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    /// Input data violates an expectation of the analysis.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}

pub type Result<T> = std::result::Result<T, Error>;
