//! Error types for the Library of Congress client.

use thiserror::Error;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, LocError>;

/// Errors returned by [`crate::LocClient`].
#[derive(Debug, Error)]
pub enum LocError {
    /// Transport failure (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response from the API
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl LocError {
    /// Whether the failure was a request timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, LocError::Http(e) if e.is_timeout())
    }
}
