//! Directory (LDAP) side of the user lookup gateway.
//!
//! This crate turns a validated [`LookupRequest`] into an escaped [`SearchFilter`], runs one
//! paged search per request through [`DirectoryClient`], and maps the first returned
//! [`DirectoryEntry`] into a [`UserRecord`].

#![deny(missing_docs)]

mod client;
mod entry;
mod filter;
mod record;

pub use client::{DirectoryClient, LdapConnector, LdapSession, SEARCH_PAGE_SIZE, USER_ATTRIBUTES};
pub use entry::DirectoryEntry;
pub use filter::{escape_filter_value, LookupRequest, SearchFilter, KTHID_PARAM, UG_KTHID_PARAM};
pub use record::{check_consistency, ConsistencyViolation, UserRecord};

/// Convenient result alias that reuses the core error type.
pub type Result<T> = userlookup_core::Result<T>;
