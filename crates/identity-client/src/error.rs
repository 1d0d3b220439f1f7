//! Transport-level errors.

use thiserror::Error;

/// Failure of a single identity service call.
///
/// Clonable so one result can be handed to several waiters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// No response was received: connect failure, timeout, TLS.
    #[error("Network error: {0}")]
    Network(String),

    /// The service answered with a non-success status.
    #[error(
        "Request rejected with status {status}: {}",
        .message.as_deref().unwrap_or("no error message")
    )]
    Rejected { status: u16, message: Option<String> },

    /// A success status whose body could not be decoded.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// HTTP status of a rejection.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The service's `error` field, when it sent a non-empty one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Rejected { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

/// Result type for identity service calls.
pub type ApiResult<T> = Result<T, ApiError>;
