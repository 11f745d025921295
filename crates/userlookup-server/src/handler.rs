//! Request handlers.

use axum::{
    extract::{
        rejection::{FormRejection, QueryRejection},
        Form, Query, State,
    },
    response::Response,
};
use serde::Deserialize;
use tracing::{debug, error, warn};
use userlookup_core::Error;
use userlookup_ldap::{check_consistency, LookupRequest, UserRecord};

use crate::{response::encode_user, ApiError, AppState};

/// Identifier parameters of `/user`. Both are optional on the wire; the handler enforces that
/// exactly one is present.
#[derive(Debug, Default, Deserialize)]
pub struct LookupParams {
    /// Username.
    #[serde(default)]
    pub kthid: Option<String>,
    /// Secondary identifier.
    #[serde(default)]
    pub ug_kthid: Option<String>,
}

impl LookupParams {
    /// Fills each field from `fallback` where this set lacks it.
    #[must_use]
    pub fn or(self, fallback: Self) -> Self {
        Self {
            kthid: self.kthid.or(fallback.kthid),
            ug_kthid: self.ug_kthid.or(fallback.ug_kthid),
        }
    }
}

/// Resolves one user.
///
/// Parameters come from the query string and, for form-encoded bodies, from the body; a body
/// value takes precedence. Validation happens before a directory connection is opened. The
/// directory call runs under a per-request child of the shutdown token; the drop guard cancels
/// it if the request future is dropped, e.g. when the caller disconnects.
pub async fn lookup_user(
    State(state): State<AppState>,
    query: Result<Query<LookupParams>, QueryRejection>,
    form: Result<Form<LookupParams>, FormRejection>,
) -> Result<Response, ApiError> {
    let params = merge_params(query, form).map_err(|err| report(err, "rejecting lookup"))?;
    let request = LookupRequest::from_params(params.kthid.as_deref(), params.ug_kthid.as_deref())
        .map_err(|err| report(err, "rejecting lookup"))?;

    let cancel = state.shutdown().child_token();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let entry = state.directory().lookup(&request, &cancel).await?;
    let record = UserRecord::from_entry(&entry).map_err(|err| {
        debug!(%request, user = ?entry.attributes, "undecodable entry");
        report(err, "failed to decode user")
    })?;

    let violations = check_consistency(&record, state.config().mail_domain());
    if !violations.is_empty() {
        let violations = violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        warn!(user = ?record, ?violations, "user doesn't match expectations");
    }

    encode_user(&record)
}

fn merge_params(
    query: Result<Query<LookupParams>, QueryRejection>,
    form: Result<Form<LookupParams>, FormRejection>,
) -> Result<LookupParams, Error> {
    let Query(query) = query.map_err(|rejection| invalid_params(&rejection.body_text()))?;
    match form {
        Ok(Form(body)) => Ok(body.or(query)),
        // No form body to read, e.g. a POST carrying only a query string.
        Err(FormRejection::InvalidFormContentType(_)) => Ok(query),
        Err(rejection) => Err(invalid_params(&rejection.body_text())),
    }
}

fn invalid_params(reason: &str) -> Error {
    Error::InvalidRequest(format!("Invalid request parameters: {}", reason.trim()))
}

/// Logs a failure at the level its variant calls for.
fn report(err: Error, context: &str) -> Error {
    if err.should_log() {
        error!(error = %err, "{context}");
    } else {
        debug!(error = %err, "{context}");
    }
    err
}

/// Liveness check. Never touches the directory.
pub async fn healthz() -> &'static str {
    "ok"
}
