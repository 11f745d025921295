//! HTTP error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use userlookup_core::Error;

/// Wraps a lookup [`Error`] so it can be returned from handlers.
///
/// Bodies are one line of plain text; server-side failures never echo their cause.
#[derive(Debug)]
pub struct ApiError(Error);

impl ApiError {
    /// Get the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Error::UserNotFound(_) => StatusCode::NOT_FOUND,
            Error::DirectoryUnavailable(_)
            | Error::DirectorySearchFailed(_)
            | Error::Cancelled(_)
            | Error::RecordDecodeFailed(_)
            | Error::EncodeFailed(_)
            | Error::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), self.0.public_message()).into_response()
    }
}
