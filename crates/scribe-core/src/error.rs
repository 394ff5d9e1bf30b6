//! Error types for scribe.

use thiserror::Error;

/// Result type alias using scribe's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for scribe operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Job not found
    #[error("Job not found: {0}")]
    JobNotFound(uuid::Uuid),

    /// Invalid input (missing or rejected artifact, malformed id)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The processing engine failed on an input artifact
    #[error("Processing error: {0}")]
    Processing(String),

    /// Artifact storage failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Job queue or state machine error
    #[error("Job error: {0}")]
    Job(String),

    /// The job was cancelled before it finished
    #[error("Job cancelled")]
    Cancelled,

    /// The job ran past its deadline
    #[error("Job exceeded timeout of {0}s")]
    Timeout(u64),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error means "the thing asked for does not exist (yet)".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::JobNotFound(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
