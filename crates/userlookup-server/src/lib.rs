//! # userlookup-server
//!
//! HTTP surface of the user lookup gateway.
//!
//! ## Modules
//!
//! - [`error`] - Maps lookup errors onto status codes and plain-text bodies
//! - [`handler`] - The `/user` request pipeline
//! - [`logging`] - Tracing subscriber setup
//! - [`response`] - Success body encoding
//! - [`state`] - Shared, read-only application state

#![deny(missing_docs)]

pub mod error;
pub mod handler;
pub mod logging;
pub mod response;
pub mod state;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use state::AppState;

/// Builds the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/user", get(handler::lookup_user).post(handler::lookup_user))
        .route("/healthz", get(handler::healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
