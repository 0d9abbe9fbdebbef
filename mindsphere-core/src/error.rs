//! Error types for MindSphere time-series operations

use thiserror::Error;

/// Result type for MindSphere operations
pub type MindSphereResult<T> = Result<T, MindSphereError>;

/// Message returned when a latest-value read answers with a payload that is
/// not a row array. The spelling is kept for compatibility with callers that
/// match on it.
pub const INVALID_LAST_VALUE_RESPONSE: &str = "Invalid reponse data - should be na array";

/// Error types for MindSphere operations
///
/// Token and transport failures carry their original message and are
/// displayed verbatim, so a caller can match on the text it would have seen
/// from the collaborator directly.
#[derive(Error, Debug)]
pub enum MindSphereError {
    /// Failure reported by the token provider while acquiring a bearer token
    #[error("{0}")]
    TokenAcquisition(String),

    /// Network or transport-level rejection
    #[error("{0}")]
    Transport(String),

    /// The remote service answered with a status outside 2xx
    #[error("Server responded with status code: {status_code}")]
    Status { status_code: u16 },

    /// A well-formed response that does not satisfy the operation's contract
    #[error("{0}")]
    InvalidResponse(String),

    /// Caller supplied arguments that cannot produce a valid request
    #[error("{0}")]
    Validation(String),

    #[error("Time range error: {0}")]
    TimeRange(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MindSphereError {
    /// Create a new token acquisition error
    pub fn token<S: Into<String>>(message: S) -> Self {
        Self::TokenAcquisition(message.into())
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport(message.into())
    }

    /// Create a new status code error
    pub fn status(status_code: u16) -> Self {
        Self::Status { status_code }
    }

    /// Create a new invalid response error
    pub fn invalid_response<S: Into<String>>(message: S) -> Self {
        Self::InvalidResponse(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new time range error
    pub fn time_range<S: Into<String>>(message: S) -> Self {
        Self::TimeRange(message.into())
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration(message.into())
    }

    /// Status code carried by this error, if the remote answered at all
    pub fn status_code(&self) -> Option<u16> {
        match self {
            MindSphereError::Status { status_code } => Some(*status_code),
            _ => None,
        }
    }

    /// Get the error category for log fields
    pub fn category(&self) -> &'static str {
        match self {
            MindSphereError::TokenAcquisition(_) => "token",
            MindSphereError::Transport(_) => "transport",
            MindSphereError::Status { .. } => "status",
            MindSphereError::InvalidResponse(_) => "invalid_response",
            MindSphereError::Validation(_) => "validation",
            MindSphereError::TimeRange(_) => "time_range",
            MindSphereError::Configuration(_) => "configuration",
            MindSphereError::Json(_) => "json",
        }
    }
}
