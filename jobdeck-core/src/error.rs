//! Error types for the jobdeck ecosystem.

use thiserror::Error;

/// Errors that can occur in jobdeck operations.
#[derive(Error, Debug)]
pub enum JobdeckError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No calendar connected for user '{0}'")]
    NotConnected(String),

    #[error("Token refresh rejected by provider: {0}")]
    RefreshFailed(String),

    #[error("Calendar request failed: {0}")]
    Provider(String),

    #[error("Sync already in progress for user '{0}'")]
    SyncInProgress(String),

    #[error("Event not found: {0}")]
    EventNotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for jobdeck operations.
pub type JobdeckResult<T> = Result<T, JobdeckError>;
