//! Entry synthesis.
//!
//! Turns identity and group records into directory entries. Everything here
//! is a pure function of its inputs: no I/O, no shared state, and identical
//! inputs always produce identical entries (attribute order included).

mod account;
mod group;
mod membership;

pub use account::{synthesize_account, ACCOUNT_OBJECT_CLASSES};
pub use group::{synthesize_group, GroupRenderingMode};
pub use membership::{DirectoryIndex, MembershipLookup, NoMembers};

use serde::{Deserialize, Serialize};

/// Default user RDN attribute.
pub const DEFAULT_NAME_FORMAT: &str = "cn";

/// Default group RDN attribute.
pub const DEFAULT_GROUP_FORMAT: &str = "ou";

/// Default container path for groups.
pub const DEFAULT_GROUPS_HIERARCHY: &str = "ou=groups";

/// Default container path for users.
pub const DEFAULT_USERS_HIERARCHY: &str = "ou=users";

/// Naming layout of the directory tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryLayout {
    /// Base DN every entry lives under, e.g. `dc=example,dc=com`.
    #[serde(rename = "basedn")]
    pub base_dn: String,
    /// RDN attribute for users.
    #[serde(default = "default_name_format", rename = "nameformat")]
    pub name_format: String,
    /// RDN attribute for groups.
    #[serde(default = "default_group_format", rename = "groupformat")]
    pub group_format: String,
    /// Hierarchy rendered in group-of-unique-names mode.
    #[serde(default = "default_groups_hierarchy", rename = "groupshierarchy")]
    pub groups_hierarchy: String,
    /// Hierarchy users live under.
    #[serde(default = "default_users_hierarchy", rename = "usershierarchy")]
    pub users_hierarchy: String,
}

fn default_name_format() -> String {
    DEFAULT_NAME_FORMAT.to_string()
}

fn default_group_format() -> String {
    DEFAULT_GROUP_FORMAT.to_string()
}

fn default_groups_hierarchy() -> String {
    DEFAULT_GROUPS_HIERARCHY.to_string()
}

fn default_users_hierarchy() -> String {
    DEFAULT_USERS_HIERARCHY.to_string()
}

impl DirectoryLayout {
    /// Create a layout with default formats under `base_dn`.
    pub fn new(base_dn: impl Into<String>) -> Self {
        Self {
            base_dn: base_dn.into(),
            name_format: default_name_format(),
            group_format: default_group_format(),
            groups_hierarchy: default_groups_hierarchy(),
            users_hierarchy: default_users_hierarchy(),
        }
    }

    /// Set the user RDN attribute.
    pub fn with_name_format(mut self, attr: impl Into<String>) -> Self {
        self.name_format = attr.into();
        self
    }

    /// Set the group RDN attribute.
    pub fn with_group_format(mut self, attr: impl Into<String>) -> Self {
        self.group_format = attr.into();
        self
    }

    /// Set the groups hierarchy.
    pub fn with_groups_hierarchy(mut self, hierarchy: impl Into<String>) -> Self {
        self.groups_hierarchy = hierarchy.into();
        self
    }

    /// Set the users hierarchy.
    pub fn with_users_hierarchy(mut self, hierarchy: impl Into<String>) -> Self {
        self.users_hierarchy = hierarchy.into();
        self
    }
}

impl Default for DirectoryLayout {
    fn default() -> Self {
        Self::new("dc=example,dc=com")
    }
}

/// Build `<rdn_attr>=<rdn_value>,<hierarchy>,<base_dn>`.
///
/// This departs from the literal `A=G,H,B` form in one case: an empty
/// `hierarchy` or `base_dn` is left out instead of leaving an empty RDN
/// (`cn=x,,dc=com`). Configured layouts never have an empty hierarchy;
/// callers passing one explicitly get the shorter DN.
pub fn build_dn(rdn_attr: &str, rdn_value: &str, hierarchy: &str, base_dn: &str) -> String {
    let mut dn = format!("{}={}", rdn_attr, rdn_value);
    for part in [hierarchy, base_dn] {
        if !part.is_empty() {
            dn.push(',');
            dn.push_str(part);
        }
    }
    dn
}
