//! Success body encoding.

use axum::{
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use tracing::error;
use userlookup_core::Error;
use userlookup_ldap::UserRecord;

use crate::ApiError;

/// Encodes the public fields of a record as a JSON `200 OK` response.
///
/// The body is serialized before any part of the response exists, so a failure here still
/// yields a clean 500.
///
/// # Errors
///
/// Returns [`Error::EncodeFailed`] if serialization fails.
pub fn encode_user(record: &UserRecord) -> Result<Response, ApiError> {
    let body = serde_json::to_vec(record).map_err(|err| {
        error!(kthid = %record.kthid, error = %err, "could not encode user");
        Error::EncodeFailed(err.to_string())
    })?;

    Ok((
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        )],
        body,
    )
        .into_response())
}
