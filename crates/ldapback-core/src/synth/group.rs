//! Group entry synthesis.

use ldapback_proto::{DirectoryEntry, EntryAttribute};

use super::membership::MembershipLookup;
use super::{build_dn, DirectoryLayout};
use crate::model::Group;

/// How a group entry presents its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupRenderingMode {
    /// `uniqueMember` holding member DNs, objectClass `groupOfUniqueNames`.
    GroupOfUniqueNames,
    /// `memberUid` holding member names, objectClass `posixGroup`.
    PosixGroup,
}

impl GroupRenderingMode {
    /// Pick the mode for a requested hierarchy.
    ///
    /// Only an exact match of the configured groups hierarchy selects
    /// group-of-unique-names; nested or differently-cased paths do not.
    pub fn for_hierarchy(hierarchy: &str, layout: &DirectoryLayout) -> Self {
        if hierarchy == layout.groups_hierarchy {
            GroupRenderingMode::GroupOfUniqueNames
        } else {
            GroupRenderingMode::PosixGroup
        }
    }

    /// The structural object class for this mode.
    pub fn object_class(self) -> &'static str {
        match self {
            GroupRenderingMode::GroupOfUniqueNames => "groupOfUniqueNames",
            GroupRenderingMode::PosixGroup => "posixGroup",
        }
    }

    /// The attribute that carries membership in this mode.
    pub fn member_attribute(self) -> &'static str {
        match self {
            GroupRenderingMode::GroupOfUniqueNames => "uniqueMember",
            GroupRenderingMode::PosixGroup => "memberUid",
        }
    }
}

/// Render `group` as it appears under `hierarchy`.
///
/// Attributes, in order: the group RDN attribute, `uid`, `description`,
/// `gidNumber`, then either `uniqueMember` or `memberUid`, then
/// `objectClass`. When the group RDN attribute is itself `uid` it is not
/// repeated.
pub fn synthesize_group(
    group: &Group,
    hierarchy: &str,
    layout: &DirectoryLayout,
    members: &dyn MembershipLookup,
) -> DirectoryEntry {
    let mode = GroupRenderingMode::for_hierarchy(hierarchy, layout);
    let dn = build_dn(&layout.group_format, &group.name, hierarchy, &layout.base_dn);

    let mut entry = DirectoryEntry::new(dn);
    entry.push(EntryAttribute::single(&layout.group_format, &group.name));
    if layout.group_format != "uid" {
        entry.push(EntryAttribute::single("uid", &group.name));
    }
    entry.push(EntryAttribute::single("description", &group.name));
    entry.push(EntryAttribute::single("gidNumber", group.gid_number.to_string()));

    let member_values = match mode {
        GroupRenderingMode::GroupOfUniqueNames => members.member_dns(group.gid_number),
        GroupRenderingMode::PosixGroup => members.member_ids(group.gid_number),
    };
    entry.push(EntryAttribute::new(mode.member_attribute(), member_values));
    entry.push(EntryAttribute::new("objectClass", [mode.object_class(), "top"]));
    entry
}
