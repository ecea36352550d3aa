//! Error types for the Dalibook SDK

use thiserror::Error;

/// Result type for SDK operations
pub type Result<T> = std::result::Result<T, SdkError>;

/// SDK error types
#[derive(Error, Debug)]
pub enum SdkError {
    /// Error from the HTTP collaborator
    #[error("Client error: {0}")]
    Client(#[from] dalibook_client::ClientError),

    /// Network error outside the HTTP client (custom transports)
    #[error("Network error: {0}")]
    Network(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Session store error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Input rejected before it was sent (empty post, overlong content, ...)
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The server answered but did not apply the change
    #[error("Rejected: {0}")]
    Rejected(String),
}

impl From<serde_json::Error> for SdkError {
    fn from(err: serde_json::Error) -> Self {
        SdkError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for SdkError {
    fn from(err: std::io::Error) -> Self {
        SdkError::Storage(err.to_string())
    }
}
