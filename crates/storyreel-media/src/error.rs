//! Error types for media operations.

use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while packaging generated media.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Empty media payload")]
    EmptyPayload,

    #[error("Payload too large for container: {len} bytes")]
    PayloadTooLarge { len: usize },

    #[error("Invalid audio format: {0}")]
    InvalidFormat(String),
}

impl MediaError {
    /// Create an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat(message.into())
    }
}
