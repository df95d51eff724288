//! Error types for feedcast.

use thiserror::Error;

/// Common error type for feedcast.
#[derive(Error, Debug)]
pub enum FeedcastError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// Database connection error.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation error for input or configuration values.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A feed source could not be fetched or parsed.
    #[error("source error: {0}")]
    Source(String),

    /// An operation did not finish in time.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The summarizer failed to produce a digest.
    #[error("summarizer error: {0}")]
    Summarizer(String),

    /// The publisher failed to deliver a message.
    #[error("publisher error: {0}")]
    Publisher(String),

    /// The operation was abandoned because shutdown was requested.
    #[error("operation cancelled")]
    Cancelled,
}

// Conversion from sqlx errors
impl From<sqlx::Error> for FeedcastError {
    fn from(e: sqlx::Error) -> Self {
        FeedcastError::Database(e.to_string())
    }
}

/// Result type alias for feedcast operations.
pub type Result<T> = std::result::Result<T, FeedcastError>;
