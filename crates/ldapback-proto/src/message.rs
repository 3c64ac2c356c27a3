//! Request types handed to a backend by the protocol engine.

use crate::entry::EntryAttribute;
use ldap3_proto::proto::LdapSearchScope;
use serde::{Deserialize, Serialize};

/// Search scope relative to the base DN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SearchScope {
    /// Only the base object itself.
    BaseObject,
    /// Immediate children of the base.
    SingleLevel,
    /// The base and everything below it.
    #[default]
    WholeSubtree,
}

impl std::str::FromStr for SearchScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "base" => Ok(SearchScope::BaseObject),
            "one" | "onelevel" => Ok(SearchScope::SingleLevel),
            "sub" | "subtree" => Ok(SearchScope::WholeSubtree),
            other => Err(format!("unknown search scope: {}", other)),
        }
    }
}

impl From<SearchScope> for LdapSearchScope {
    fn from(scope: SearchScope) -> Self {
        match scope {
            SearchScope::BaseObject => LdapSearchScope::Base,
            SearchScope::SingleLevel => LdapSearchScope::OneLevel,
            SearchScope::WholeSubtree => LdapSearchScope::Subtree,
        }
    }
}

impl From<LdapSearchScope> for SearchScope {
    /// Scopes beyond the three base ones widen to the whole subtree.
    fn from(scope: LdapSearchScope) -> Self {
        match scope {
            LdapSearchScope::Base => SearchScope::BaseObject,
            LdapSearchScope::OneLevel => SearchScope::SingleLevel,
            _ => SearchScope::WholeSubtree,
        }
    }
}

/// A search request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Base DN of the search.
    pub base_dn: String,
    /// Search scope.
    pub scope: SearchScope,
    /// Filter in string form, e.g. `(objectClass=posixGroup)`.
    pub filter: String,
    /// Attributes to return; empty means all.
    pub attributes: Vec<String>,
    /// Maximum number of entries; 0 means unlimited.
    pub size_limit: usize,
}

impl SearchRequest {
    /// Create a subtree search matching every entry under `base_dn`.
    pub fn new(base_dn: impl Into<String>) -> Self {
        Self {
            base_dn: base_dn.into(),
            scope: SearchScope::WholeSubtree,
            filter: "(objectClass=*)".to_string(),
            attributes: Vec::new(),
            size_limit: 0,
        }
    }

    /// Set the filter.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Set the scope.
    pub fn with_scope(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }

    /// Restrict the returned attributes.
    pub fn with_attributes(mut self, attributes: Vec<String>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Set the size limit.
    pub fn with_size_limit(mut self, limit: usize) -> Self {
        self.size_limit = limit;
        self
    }
}

/// An add request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddRequest {
    /// DN of the entry to create.
    pub dn: String,
    /// Initial attributes.
    pub attributes: Vec<EntryAttribute>,
}

/// Kind of change in a modify request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModifyOp {
    /// Add values.
    Add,
    /// Delete values (or the whole attribute when no values are given).
    Delete,
    /// Replace all values.
    Replace,
}

/// One change inside a modify request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modification {
    /// Change kind.
    pub op: ModifyOp,
    /// Attribute and values the change applies to.
    pub attribute: EntryAttribute,
}

/// A modify request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyRequest {
    /// DN of the entry to change.
    pub dn: String,
    /// Ordered changes.
    pub changes: Vec<Modification>,
}
