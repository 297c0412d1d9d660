//! Error types for the evalsync offline subsystem
//!
//! This module provides error handling using thiserror for structured
//! error definitions, with a conversion from anyhow for callers that use it.

use thiserror::Error;

/// Main error type for evalsync operations
#[derive(Error, Debug)]
pub enum EvalSyncError {
    /// Durable store could not be opened or created
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// A single evaluation could not be delivered to the remote API
    #[error("Remote submission failed: {0}")]
    RemoteSubmissionFailed(String),

    /// Remote read (catalog, health) failed
    #[error("Remote API error: {0}")]
    RemoteApi(String),

    /// Evaluation rejected before routing
    #[error("Invalid evaluation: {0}")]
    InvalidEvaluation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for evalsync operations
pub type Result<T> = std::result::Result<T, EvalSyncError>;

impl EvalSyncError {
    /// True for failures that mean "try again later" rather than "bad input"
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EvalSyncError::RemoteSubmissionFailed(_)
                | EvalSyncError::RemoteApi(_)
                | EvalSyncError::Http(_)
        )
    }
}

/// Convert anyhow::Error to EvalSyncError
impl From<anyhow::Error> for EvalSyncError {
    fn from(err: anyhow::Error) -> Self {
        EvalSyncError::Other(err.to_string())
    }
}

impl From<rusqlite::Error> for EvalSyncError {
    fn from(err: rusqlite::Error) -> Self {
        EvalSyncError::Database(err.to_string())
    }
}
