//! Session manager error types.

use identity_client::ApiError;
use session_storage::StorageError;
use thiserror::Error;

/// A condition that failed before any request was sent.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    #[error("No refresh token")]
    NoRefreshToken,

    #[error("Reset token is missing")]
    MissingResetToken,

    #[error("Verification token is missing")]
    MissingVerificationToken,

    #[error("Not logged in")]
    NotAuthenticated,

    /// The session a request was started for was replaced or signed out
    /// before the response arrived; the response was discarded.
    #[error("Session changed while the request was in flight")]
    SessionChanged,
}

/// Session manager error type.
///
/// Clonable so a single refresh outcome can be handed to every caller that
/// joined it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No response from the identity service. Nothing was changed.
    #[error("Network error: {0}")]
    Network(String),

    /// The identity service refused the request. `message` is the server's
    /// own text or the operation's generic fallback.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The refresh token was refused; the local session has been cleared.
    #[error("Token refresh failed: {0}")]
    SessionExpired(String),

    #[error("{0}")]
    Precondition(Precondition),

    /// Success status with a body that could not be decoded. Nothing was changed.
    #[error("Invalid response from identity service: {0}")]
    InvalidResponse(String),

    /// The session store rejected a write; the operation did not apply.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl AuthError {
    /// Map a transport error, substituting `fallback` when the service gave
    /// no usable message.
    pub(crate) fn from_api(err: ApiError, fallback: &str) -> Self {
        match err {
            ApiError::Network(message) => AuthError::Network(message),
            ApiError::Rejected { status, message } => AuthError::Rejected {
                status,
                message: message.unwrap_or_else(|| fallback.to_string()),
            },
            ApiError::InvalidResponse(message) => AuthError::InvalidResponse(message),
        }
    }

    /// Returns true if retrying the same call could succeed.
    ///
    /// Transient errors are network failures and 5xx rejections. The
    /// manager never retries on its own.
    pub fn is_transient(&self) -> bool {
        match self {
            AuthError::Network(_) => true,
            AuthError::Rejected { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// HTTP status of a rejection.
    pub fn status(&self) -> Option<u16> {
        match self {
            AuthError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<Precondition> for AuthError {
    fn from(precondition: Precondition) -> Self {
        AuthError::Precondition(precondition)
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        AuthError::Storage(err.to_string())
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
