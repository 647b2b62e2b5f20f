//! Error types for moodlog-core

use thiserror::Error;

/// Result type alias using moodlog-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in moodlog-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level failure talking to the journal server (retryable)
    #[error("Network error: {0}")]
    Network(String),

    /// No response within the request budget (retryable)
    #[error("Request timed out")]
    Timeout,

    /// Session credential missing or rejected; terminal for the session
    #[error("Session is no longer valid")]
    Unauthorized,

    /// Referenced server id no longer exists
    #[error("Entry not found: {0}")]
    NotFound(String),

    /// Contract mismatch between client and server
    #[error("Invalid server response: {0}")]
    InvalidResponse(String),

    /// Domain precondition not met (e.g. creation quota exhausted)
    #[error("{0}")]
    InsufficientResource(String),

    /// Local blob storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Whether the caller may retry the failed operation as-is.
    ///
    /// Only transport failures and timeouts are retryable; everything else
    /// requires a different input, a fresh session, or user attention.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout)
    }
}
