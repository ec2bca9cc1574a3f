//! Error types for the explorer client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to the query explorer
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed (connection, timeout, body read)
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("Explorer API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// Payload did not have the expected shape
    #[error("Malformed explorer payload: {0}")]
    Format(String),

    /// API key or query id not configured
    #[error("Missing explorer credentials: {0}")]
    MissingCredentials(&'static str),
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Check if this error is worth retrying (network failure or 5xx)
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed(_) => true,
            Self::ApiError { status, .. } => *status >= 500 || *status == 429,
            Self::Format(_) | Self::MissingCredentials(_) => false,
        }
    }

    /// Check if this error is a malformed payload
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format(_))
    }
}
