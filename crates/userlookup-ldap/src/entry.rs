//! Raw directory entries as returned by a search.

use std::collections::HashMap;

/// Directory entry representation used by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Attribute map (values preserved order from server).
    pub attributes: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    /// Creates an entry from a DN and its attributes.
    #[must_use]
    pub fn new(dn: impl Into<String>, attributes: HashMap<String, Vec<String>>) -> Self {
        Self {
            dn: dn.into(),
            attributes,
        }
    }

    /// Returns the first value of the attribute if present.
    #[must_use]
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.attributes
            .get(attribute)
            .and_then(|values| values.first().map(String::as_str))
    }
}

impl From<ldap3::SearchEntry> for DirectoryEntry {
    fn from(entry: ldap3::SearchEntry) -> Self {
        Self {
            dn: entry.dn,
            attributes: entry.attrs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_returns_leading_value() {
        let mut attributes = HashMap::new();
        attributes.insert(
            "mail".to_string(),
            vec!["abc123@kth.se".to_string(), "alias@kth.se".to_string()],
        );
        let entry = DirectoryEntry::new("ugUsername=abc123,ou=Addressbook,dc=kth,dc=se", attributes);

        assert_eq!(entry.first("mail"), Some("abc123@kth.se"));
        assert_eq!(entry.first("sn"), None);
    }
}
