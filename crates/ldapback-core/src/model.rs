//! Identity and group records.
//!
//! Records are owned by a store and are read-only from the backend's point of
//! view. Field names on the wire follow the lowercase configuration keys
//! operators already use (`uidnumber`, `primarygroup`, `passsha256`, ...).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::security::{Capability, CapabilitySet};

/// A directory principal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Unique name.
    pub name: String,
    /// E-mail address; doubles as the alternate (principal-name) identifier.
    #[serde(default)]
    pub mail: String,
    /// Numeric user id.
    #[serde(rename = "uidnumber")]
    pub uid_number: u32,
    /// Numeric id of the primary group.
    #[serde(rename = "primarygroup")]
    pub primary_group: u32,
    /// Secondary group ids.
    #[serde(default, rename = "othergroups", skip_serializing_if = "Vec::is_empty")]
    pub other_groups: Vec<u32>,
    /// Hex-encoded SHA-256 of the password.
    #[serde(default, rename = "passsha256")]
    pub pass_sha256: String,
    /// Ordered capability grants.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<Capability>,
    /// Given name.
    #[serde(default, rename = "givenname", skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    /// Surname.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sn: Option<String>,
    /// Login shell.
    #[serde(default, rename = "loginshell", skip_serializing_if = "Option::is_none")]
    pub login_shell: Option<String>,
    /// Home directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homedir: Option<String>,
    /// Disabled accounts resolve but cannot bind.
    #[serde(default)]
    pub disabled: bool,
}

impl Identity {
    /// Create an identity with the required fields.
    pub fn new(name: impl Into<String>, uid_number: u32, primary_group: u32) -> Self {
        Self {
            name: name.into(),
            uid_number,
            primary_group,
            ..Default::default()
        }
    }

    /// Set the e-mail address.
    pub fn with_mail(mut self, mail: impl Into<String>) -> Self {
        self.mail = mail.into();
        self
    }

    /// Set the password hash.
    pub fn with_pass_sha256(mut self, hash: impl Into<String>) -> Self {
        self.pass_sha256 = hash.into();
        self
    }

    /// Add a secondary group.
    pub fn with_other_group(mut self, gid: u32) -> Self {
        self.other_groups.push(gid);
        self
    }

    /// Add a capability grant.
    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    /// Check whether the identity belongs to `gid` directly.
    pub fn is_direct_member(&self, gid: u32) -> bool {
        self.primary_group == gid || self.other_groups.contains(&gid)
    }

    /// Capability grants as a set.
    pub fn capability_set(&self) -> CapabilitySet {
        CapabilitySet::from(self.capabilities.as_slice())
    }
}

/// A collection of identities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Unique name.
    pub name: String,
    /// Numeric group id.
    #[serde(rename = "gidnumber")]
    pub gid_number: u32,
    /// Ids of groups whose members are also members of this group.
    #[serde(default, rename = "includegroups", skip_serializing_if = "Vec::is_empty")]
    pub include_groups: Vec<u32>,
}

impl Group {
    /// Create a group.
    pub fn new(name: impl Into<String>, gid_number: u32) -> Self {
        Self {
            name: name.into(),
            gid_number,
            include_groups: Vec::new(),
        }
    }

    /// Include the members of another group.
    pub fn including(mut self, gid: u32) -> Self {
        self.include_groups.push(gid);
        self
    }
}

/// A full directory document: every user and group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryData {
    /// Users in document order.
    #[serde(default)]
    pub users: Vec<Identity>,
    /// Groups in document order.
    #[serde(default)]
    pub groups: Vec<Group>,
}

impl DirectoryData {
    /// Parse a JSON document and validate it.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let data: Self = serde_json::from_slice(bytes)
            .map_err(|e| Error::Deserialization(format!("directory document: {}", e)))?;
        data.validate()?;
        Ok(data)
    }

    /// Read and validate a JSON document from disk.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_json(&bytes)
    }

    /// Check name and id uniqueness.
    pub fn validate(&self) -> Result<()> {
        let mut names = std::collections::HashSet::new();
        let mut mails = std::collections::HashSet::new();
        for user in &self.users {
            if user.name.is_empty() {
                return Err(Error::InvalidData("user with empty name".to_string()));
            }
            if !names.insert(user.name.as_str()) {
                return Err(Error::InvalidData(format!("duplicate user name: {}", user.name)));
            }
            // Mail lookups ignore case, so uniqueness does too.
            if !user.mail.is_empty() && !mails.insert(user.mail.to_ascii_lowercase()) {
                return Err(Error::InvalidData(format!("duplicate mail: {}", user.mail)));
            }
        }

        let mut group_names = std::collections::HashSet::new();
        let mut gids = std::collections::HashSet::new();
        for group in &self.groups {
            if group.name.is_empty() {
                return Err(Error::InvalidData("group with empty name".to_string()));
            }
            if !group_names.insert(group.name.as_str()) {
                return Err(Error::InvalidData(format!("duplicate group name: {}", group.name)));
            }
            if !gids.insert(group.gid_number) {
                return Err(Error::InvalidData(format!(
                    "duplicate gidnumber: {}",
                    group.gid_number
                )));
            }
        }
        Ok(())
    }
}
