//! # userlookup-core
//!
//! Shared building blocks for the user lookup gateway.
//!
//! ## Modules
//!
//! - [`error`] - Error taxonomy for a single lookup request
//! - [`config`] - Immutable service configuration built once at startup

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;

pub use config::{BindCredentials, ServiceConfig};
pub use error::{Error, Result};
