//! Lookup identifiers and search filter construction.

use std::fmt::{self, Write as _};
use userlookup_core::Error;

use crate::Result;

/// Query parameter carrying the username-shaped identifier.
pub const KTHID_PARAM: &str = "kthid";
/// Query parameter carrying the secondary identifier.
pub const UG_KTHID_PARAM: &str = "ug_kthid";

const KTHID_ATTRIBUTE: &str = "ugUsername";
const UG_KTHID_ATTRIBUTE: &str = "ugKthid";

/// A lookup by exactly one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupRequest {
    /// Lookup by username (`ugUsername`).
    Kthid(String),
    /// Lookup by secondary identifier (`ugKthid`).
    UgKthid(String),
}

impl LookupRequest {
    /// Builds a request from the two optional identifier parameters.
    ///
    /// An empty value counts as absent. There is no precedence between the two: supplying both
    /// is as invalid as supplying neither.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] unless exactly one identifier is non-empty.
    pub fn from_params(kthid: Option<&str>, ug_kthid: Option<&str>) -> Result<Self> {
        let kthid = kthid.filter(|value| !value.is_empty());
        let ug_kthid = ug_kthid.filter(|value| !value.is_empty());

        match (kthid, ug_kthid) {
            (Some(kthid), None) => Ok(Self::Kthid(kthid.to_string())),
            (None, Some(ug_kthid)) => Ok(Self::UgKthid(ug_kthid.to_string())),
            _ => Err(Error::InvalidRequest(format!(
                "Exactly one of `{KTHID_PARAM}` and `{UG_KTHID_PARAM}` must be provided"
            ))),
        }
    }

    /// Directory attribute the identifier is matched against.
    #[must_use]
    pub const fn attribute(&self) -> &'static str {
        match self {
            Self::Kthid(_) => KTHID_ATTRIBUTE,
            Self::UgKthid(_) => UG_KTHID_ATTRIBUTE,
        }
    }

    /// The raw, unescaped identifier value.
    #[must_use]
    pub fn identifier(&self) -> &str {
        match self {
            Self::Kthid(value) | Self::UgKthid(value) => value,
        }
    }
}

impl fmt::Display for LookupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let param = match self {
            Self::Kthid(_) => KTHID_PARAM,
            Self::UgKthid(_) => UG_KTHID_PARAM,
        };
        write!(f, "{param}={}", self.identifier())
    }
}

/// An escaped equality filter bound to a single attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilter(String);

impl SearchFilter {
    /// Renders `(attribute=escaped_identifier)` for the request.
    #[must_use]
    pub fn for_request(request: &LookupRequest) -> Self {
        Self(format!(
            "({}={})",
            request.attribute(),
            escape_filter_value(request.identifier())
        ))
    }

    /// Returns the rendered filter.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SearchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Escapes a value for use inside an RFC 4515 filter.
///
/// `(`, `)`, `*`, `\`, NUL and every non-ASCII byte are written as `\xx`.
#[must_use]
pub fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'(' | b')' | b'*' | b'\\' | 0 | 0x80..=0xff => {
                let _ = write!(escaped, "\\{byte:02x}");
            }
            _ => escaped.push(char::from(byte)),
        }
    }
    escaped
}
