//! Error types for the Dalibook HTTP client

use thiserror::Error;

/// Dalibook client error
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed before a response arrived
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No signed-in session, or the session expired
    #[error("Unauthorized")]
    Unauthorized,

    /// Entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Server returned a non-success status
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Client configuration is unusable
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// HTTP status code associated with this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Unauthorized => Some(401),
            ClientError::NotFound(_) => Some(404),
            ClientError::Server { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
