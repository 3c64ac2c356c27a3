//! Directory entries as seen by protocol clients.
//!
//! [`DirectoryEntry`] keeps attributes in insertion order and converts into
//! the `ldap3_proto` search result types at the protocol boundary.

use ldap3_proto::proto::{LdapPartialAttribute, LdapSearchResultEntry};
use serde::{Deserialize, Serialize};

/// A named attribute with one or more string values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryAttribute {
    /// Attribute type name (e.g. `gidNumber`).
    pub name: String,
    /// Attribute values, in insertion order.
    pub values: Vec<String>,
}

impl EntryAttribute {
    /// Create an attribute from any list of values.
    pub fn new<I, V>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a single-valued attribute.
    pub fn single(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: vec![value.into()],
        }
    }

    /// Check whether the attribute carries the given value (exact match).
    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }
}

/// A directory entry: a distinguished name plus an ordered attribute list.
///
/// Attribute order is preserved exactly as inserted so that two entries
/// built from the same inputs compare equal and render identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Distinguished name.
    pub dn: String,
    /// Attributes in insertion order.
    pub attributes: Vec<EntryAttribute>,
}

impl DirectoryEntry {
    /// Create an entry with no attributes.
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: Vec::new(),
        }
    }

    /// Append an attribute (builder form).
    pub fn with_attribute(mut self, attribute: EntryAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Append an attribute.
    pub fn push(&mut self, attribute: EntryAttribute) {
        self.attributes.push(attribute);
    }

    /// Look up an attribute by its exact, case-sensitive name.
    pub fn get(&self, name: &str) -> Option<&EntryAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Look up an attribute ignoring ASCII case, as protocol matching does.
    pub fn get_ignore_case(&self, name: &str) -> Option<&EntryAttribute> {
        self.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Values of an attribute, or an empty slice when absent.
    pub fn values(&self, name: &str) -> &[String] {
        self.get(name).map(|a| a.values.as_slice()).unwrap_or(&[])
    }

    /// Check whether an attribute with this exact name exists.
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Keep only the listed attributes (case-insensitive).
    ///
    /// An empty selection, or one containing `*`, keeps everything.
    pub fn project(&mut self, selection: &[String]) {
        if selection.is_empty() || selection.iter().any(|s| s == "*") {
            return;
        }
        self.attributes
            .retain(|a| selection.iter().any(|s| s.eq_ignore_ascii_case(&a.name)));
    }

    /// Render the entry as an LDIF record.
    pub fn to_ldif(&self) -> String {
        let mut out = format!("dn: {}\n", self.dn);
        for attribute in &self.attributes {
            for value in &attribute.values {
                out.push_str(&attribute.name);
                out.push_str(": ");
                out.push_str(value);
                out.push('\n');
            }
        }
        out
    }
}

impl From<&EntryAttribute> for LdapPartialAttribute {
    fn from(attribute: &EntryAttribute) -> Self {
        LdapPartialAttribute {
            atype: attribute.name.clone(),
            vals: attribute
                .values
                .iter()
                .map(|v| v.as_bytes().to_vec())
                .collect(),
        }
    }
}

impl From<&DirectoryEntry> for LdapSearchResultEntry {
    fn from(entry: &DirectoryEntry) -> Self {
        LdapSearchResultEntry {
            dn: entry.dn.clone(),
            attributes: entry
                .attributes
                .iter()
                .map(LdapPartialAttribute::from)
                .collect(),
        }
    }
}
