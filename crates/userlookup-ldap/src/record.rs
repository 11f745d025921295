//! User records and the consistency rules they are expected to satisfy.

use serde::Serialize;
use std::fmt;
use userlookup_core::Error;

use crate::{entry::DirectoryEntry, Result};

/// A user as exposed by the gateway.
///
/// Only the first four fields are serialized; the rest exist to run [`check_consistency`] and
/// are empty when the directory does not carry them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    /// Username (`ugUsername`).
    pub kthid: String,
    /// Secondary identifier (`ugKthid`).
    pub ug_kthid: String,
    /// Given name (`givenName`).
    pub first_name: String,
    /// Surname (`sn`).
    pub surname: String,
    /// Display name (`displayName`).
    #[serde(skip_serializing)]
    pub display_name: String,
    /// Primary mail address (`mail`).
    #[serde(skip_serializing)]
    pub email: String,
    /// Common name (`cn`).
    #[serde(skip_serializing)]
    pub common_name: String,
}

impl UserRecord {
    /// Maps an entry field by field.
    ///
    /// The four served attributes are required. `displayName`, `mail` and `cn` default to an
    /// empty string so a gap there surfaces as a [`ConsistencyViolation`] rather than a failure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecordDecodeFailed`] naming the first missing required attribute.
    pub fn from_entry(entry: &DirectoryEntry) -> Result<Self> {
        let required = |attribute: &str| {
            entry
                .first(attribute)
                .map(str::to_owned)
                .ok_or_else(|| missing_attribute(&entry.dn, attribute))
        };
        let optional = |attribute: &str| entry.first(attribute).unwrap_or_default().to_owned();

        Ok(Self {
            kthid: required("ugUsername")?,
            ug_kthid: required("ugKthid")?,
            first_name: required("givenName")?,
            surname: required("sn")?,
            display_name: optional("displayName"),
            email: optional("mail"),
            common_name: optional("cn"),
        })
    }

    fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.surname)
    }
}

/// A redundant field that does not match the value derived from the other fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyViolation {
    /// `displayName` is not `givenName sn`.
    DisplayName {
        /// Derived value.
        expected: String,
        /// Value found in the directory.
        actual: String,
    },
    /// `mail` is not `ugUsername@<domain>`.
    Email {
        /// Derived value.
        expected: String,
        /// Value found in the directory.
        actual: String,
    },
    /// `cn` is not `givenName sn (ugUsername)`.
    CommonName {
        /// Derived value.
        expected: String,
        /// Value found in the directory.
        actual: String,
    },
}

impl fmt::Display for ConsistencyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (field, expected, actual) = match self {
            Self::DisplayName { expected, actual } => ("displayName", expected, actual),
            Self::Email { expected, actual } => ("mail", expected, actual),
            Self::CommonName { expected, actual } => ("cn", expected, actual),
        };
        write!(f, "{field}: expected `{expected}`, found `{actual}`")
    }
}

/// Compares the redundant fields of a record with the values derivable from the rest.
///
/// An empty result means the record is consistent. Violations are observations only.
#[must_use]
pub fn check_consistency(record: &UserRecord, mail_domain: &str) -> Vec<ConsistencyViolation> {
    let mut violations = Vec::new();

    let display_name = record.full_name();
    if record.display_name != display_name {
        violations.push(ConsistencyViolation::DisplayName {
            expected: display_name,
            actual: record.display_name.clone(),
        });
    }

    let email = format!("{}@{mail_domain}", record.kthid);
    if record.email != email {
        violations.push(ConsistencyViolation::Email {
            expected: email,
            actual: record.email.clone(),
        });
    }

    let common_name = format!("{} ({})", record.full_name(), record.kthid);
    if record.common_name != common_name {
        violations.push(ConsistencyViolation::CommonName {
            expected: common_name,
            actual: record.common_name.clone(),
        });
    }

    violations
}

fn missing_attribute(dn: &str, attribute: &str) -> Error {
    Error::RecordDecodeFailed(format!("entry `{dn}` missing attribute `{attribute}`"))
}
