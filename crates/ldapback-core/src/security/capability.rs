//! Capability grants attached to identities.
//!
//! A capability pairs an action token (e.g. `search`) with an object pattern.
//! The backend only reports capabilities; the coordinator decides what they
//! allow.

use super::error::{SecurityError, SecurityResult};
use serde::{Deserialize, Serialize};

/// Action token for directory searches.
pub const ACTION_SEARCH: &str = "search";

/// Scope of objects a grant applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectScope {
    /// Any object.
    All,
    /// A single named object.
    Object(String),
    /// Objects matching a leading or trailing wildcard (e.g. `*,ou=groups,dc=example,dc=com`).
    Pattern(String),
}

impl ObjectScope {
    /// Check if this scope matches the given object.
    ///
    /// Objects are usually DNs, so comparison ignores ASCII case.
    pub fn matches(&self, object: &str) -> bool {
        let object = object.to_ascii_lowercase();
        match self {
            ObjectScope::All => true,
            ObjectScope::Object(name) => name.to_ascii_lowercase() == object,
            ObjectScope::Pattern(pattern) => {
                let pattern = pattern.to_ascii_lowercase();
                if let Some(prefix) = pattern.strip_suffix('*') {
                    object.starts_with(prefix)
                } else if let Some(suffix) = pattern.strip_prefix('*') {
                    object.ends_with(suffix)
                } else {
                    object == pattern
                }
            }
        }
    }
}

/// One authorization grant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capability {
    /// Action token, e.g. `search`.
    pub action: String,
    /// Object pattern; `*` matches anything.
    pub object: String,
}

impl Capability {
    /// Create a capability.
    pub fn new(action: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            object: object.into(),
        }
    }

    /// Parse a capability from `action:object`.
    ///
    /// A missing object means `*`. Examples: `search:*`, `search`,
    /// `search:ou=groups,dc=example,dc=com`.
    pub fn parse(s: &str) -> SecurityResult<Self> {
        let (action, object) = match s.split_once(':') {
            Some((action, object)) => (action.trim(), object.trim()),
            None => (s.trim(), "*"),
        };
        if action.is_empty() {
            return Err(SecurityError::InvalidCapabilityFormat(format!(
                "missing action in \"{}\"",
                s
            )));
        }
        let object = if object.is_empty() { "*" } else { object };
        Ok(Self::new(action, object))
    }

    /// The scope described by the object pattern.
    pub fn scope(&self) -> ObjectScope {
        match self.object.as_str() {
            "*" => ObjectScope::All,
            s if s.starts_with('*') || s.ends_with('*') => ObjectScope::Pattern(s.to_string()),
            s => ObjectScope::Object(s.to_string()),
        }
    }

    /// Check whether this grant allows `action` on `object`.
    pub fn permits(&self, action: &str, object: &str) -> bool {
        self.action.eq_ignore_ascii_case(action) && self.scope().matches(object)
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.action, self.object)
    }
}

/// An ordered set of capabilities.
///
/// Insertion order is kept so the set can be reported back exactly as it was
/// configured; duplicates are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    capabilities: Vec<Capability>,
}

impl CapabilitySet {
    /// Create an empty capability set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a capability set from a list of capabilities.
    pub fn from_capabilities(caps: impl IntoIterator<Item = Capability>) -> Self {
        let mut set = Self::new();
        for cap in caps {
            set.add(cap);
        }
        set
    }

    /// Parse capabilities from string representations.
    pub fn from_strings(strings: &[&str]) -> SecurityResult<Self> {
        let caps = strings
            .iter()
            .map(|s| Capability::parse(s))
            .collect::<SecurityResult<Vec<_>>>()?;
        Ok(Self::from_capabilities(caps))
    }

    /// Add a capability to the set.
    pub fn add(&mut self, cap: Capability) {
        if !self.capabilities.contains(&cap) {
            self.capabilities.push(cap);
        }
    }

    /// Check if any grant allows `action` on `object`.
    pub fn permits(&self, action: &str, object: &str) -> bool {
        self.capabilities.iter().any(|cap| cap.permits(action, object))
    }

    /// Check if searching below `base_dn` is allowed.
    pub fn can_search(&self, base_dn: &str) -> bool {
        self.permits(ACTION_SEARCH, base_dn)
    }

    /// Convert to string representations.
    pub fn to_strings(&self) -> Vec<String> {
        self.capabilities.iter().map(|c| c.to_string()).collect()
    }
}

impl<'a> From<&'a [Capability]> for CapabilitySet {
    fn from(caps: &'a [Capability]) -> Self {
        Self::from_capabilities(caps.iter().cloned())
    }
}
