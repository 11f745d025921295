//! Error types for user lookups.
//!
//! Every failure a lookup can hit maps onto exactly one variant. The variant decides both the
//! transport status the caller sees and whether the failure is worth an error-level log line.

use thiserror::Error;

/// Main error type for lookup operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The caller supplied neither or both identifiers.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The directory server could not be reached or the handshake failed.
    #[error("Directory unavailable: {0}")]
    DirectoryUnavailable(String),

    /// The search itself failed or timed out.
    #[error("Directory search failed: {0}")]
    DirectorySearchFailed(String),

    /// The request was cancelled while a directory operation was in flight.
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// The search returned no entries.
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// The entry was returned but does not have the expected shape.
    #[error("Failed to decode directory record: {0}")]
    RecordDecodeFailed(String),

    /// The success body could not be encoded.
    #[error("Failed to encode response: {0}")]
    EncodeFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Specialized result type for lookup operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the one-line, human-readable message that is safe to show to callers.
    ///
    /// Server-side failures get a generic message so directory internals never leak into
    /// responses; caller errors echo their reason.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidRequest(reason) => reason.clone(),
            Self::DirectoryUnavailable(_) => "Cannot connect to ldap server".to_string(),
            Self::DirectorySearchFailed(_) => "Could not search ldap server".to_string(),
            Self::Cancelled(_) => "Request cancelled".to_string(),
            Self::UserNotFound(_) => "No such user".to_string(),
            Self::RecordDecodeFailed(_) => "Could not parse user from ldap server".to_string(),
            Self::EncodeFailed(_) => "Could not send user".to_string(),
            Self::ConfigError(_) => "Internal error".to_string(),
        }
    }

    /// Returns true if this error should be logged as a serious error.
    #[must_use]
    pub const fn should_log(&self) -> bool {
        !matches!(self, Self::InvalidRequest(_) | Self::UserNotFound(_))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::ConfigError(format!("invalid URL: {err}"))
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ConfigError(err.to_string())
    }
}
