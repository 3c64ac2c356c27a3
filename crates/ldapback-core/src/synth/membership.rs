//! Group membership resolution.

use std::collections::HashSet;

use super::{build_dn, DirectoryLayout};
use crate::model::{Group, Identity};

/// Membership lookup keyed by numeric group id.
///
/// An unknown group or a group without members yields an empty list.
pub trait MembershipLookup {
    /// DNs of all members of `gid`.
    fn member_dns(&self, gid: u32) -> Vec<String>;

    /// Names (uids) of all members of `gid`.
    fn member_ids(&self, gid: u32) -> Vec<String>;
}

/// Lookup for backends that publish groups without members.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMembers;

impl MembershipLookup for NoMembers {
    fn member_dns(&self, _gid: u32) -> Vec<String> {
        Vec::new()
    }

    fn member_ids(&self, _gid: u32) -> Vec<String> {
        Vec::new()
    }
}

/// Borrowed view over a store snapshot that answers membership questions.
///
/// A user belongs to a group when it is their primary or a secondary group.
/// A group that includes other groups also contains their members, followed
/// transitively; cycles are cut at the first repeated group.
#[derive(Debug, Clone, Copy)]
pub struct DirectoryIndex<'a> {
    users: &'a [Identity],
    groups: &'a [Group],
    layout: &'a DirectoryLayout,
}

impl<'a> DirectoryIndex<'a> {
    /// Create an index over the given records.
    pub fn new(users: &'a [Identity], groups: &'a [Group], layout: &'a DirectoryLayout) -> Self {
        Self {
            users,
            groups,
            layout,
        }
    }

    /// The layout used to build DNs.
    pub fn layout(&self) -> &'a DirectoryLayout {
        self.layout
    }

    /// Find a group by numeric id.
    pub fn group_by_gid(&self, gid: u32) -> Option<&'a Group> {
        self.groups.iter().find(|g| g.gid_number == gid)
    }

    /// `gid` followed by every group it includes, transitively, each once.
    pub fn expanded_gids(&self, gid: u32) -> Vec<u32> {
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        let mut pending = vec![gid];

        while let Some(current) = pending.pop() {
            if !seen.insert(current) {
                continue;
            }
            order.push(current);
            if let Some(group) = self.group_by_gid(current) {
                // Reverse so included groups are visited in declaration order.
                pending.extend(group.include_groups.iter().rev().copied());
            }
        }
        order
    }

    /// All members of `gid`, in group-expansion then store order, without repeats.
    pub fn members(&self, gid: u32) -> Vec<&'a Identity> {
        let mut members = Vec::new();
        let mut seen = HashSet::new();
        for expanded in self.expanded_gids(gid) {
            for user in self.users.iter().filter(|u| u.is_direct_member(expanded)) {
                if seen.insert(user.name.as_str()) {
                    members.push(user);
                }
            }
        }
        members
    }

    /// Every group `user` is a member of, in store order.
    pub fn groups_of(&self, user: &Identity) -> Vec<&'a Group> {
        self.groups
            .iter()
            .filter(|g| {
                self.expanded_gids(g.gid_number)
                    .into_iter()
                    .any(|gid| user.is_direct_member(gid))
            })
            .collect()
    }

    /// DN of `user` under `hierarchy`:
    /// `<nameformat>=<name>,<groupformat>=<primary group>,<hierarchy>,<base>`.
    ///
    /// The primary-group component is omitted when the group is unknown.
    pub fn account_dn_in(&self, user: &Identity, hierarchy: &str) -> String {
        let parent = match self.group_by_gid(user.primary_group) {
            Some(group) if hierarchy.is_empty() => {
                format!("{}={}", self.layout.group_format, group.name)
            }
            Some(group) => format!("{}={},{}", self.layout.group_format, group.name, hierarchy),
            None => hierarchy.to_string(),
        };
        build_dn(
            &self.layout.name_format,
            &user.name,
            &parent,
            &self.layout.base_dn,
        )
    }

    /// DN of `user` in the configured users hierarchy.
    pub fn account_dn(&self, user: &Identity) -> String {
        self.account_dn_in(user, &self.layout.users_hierarchy)
    }

    /// DN of `group` in the configured groups hierarchy.
    pub fn group_dn(&self, group: &Group) -> String {
        build_dn(
            &self.layout.group_format,
            &group.name,
            &self.layout.groups_hierarchy,
            &self.layout.base_dn,
        )
    }
}

impl MembershipLookup for DirectoryIndex<'_> {
    fn member_dns(&self, gid: u32) -> Vec<String> {
        self.members(gid)
            .into_iter()
            .map(|u| self.account_dn(u))
            .collect()
    }

    fn member_ids(&self, gid: u32) -> Vec<String> {
        self.members(gid).into_iter().map(|u| u.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Vec<Identity> {
        vec![
            Identity::new("hackers", 5001, 5501),
            Identity::new("johndoe", 5002, 5502).with_other_group(5501),
            Identity::new("serviceuser", 5003, 5502),
            Identity::new("orphan", 5004, 9999),
        ]
    }

    fn groups() -> Vec<Group> {
        vec![
            Group::new("superheros", 5501),
            Group::new("svcaccts", 5502),
            Group::new("vpn", 5503).including(5501),
            Group::new("loop-a", 6001).including(6002),
            Group::new("loop-b", 6002).including(6001).including(5502),
        ]
    }

    #[test]
    fn test_direct_members() {
        let (users, groups, layout) = (users(), groups(), DirectoryLayout::default());
        let index = DirectoryIndex::new(&users, &groups, &layout);

        assert_eq!(index.member_ids(5501), vec!["hackers", "johndoe"]);
        assert_eq!(index.member_ids(5502), vec!["johndoe", "serviceuser"]);
        assert!(index.member_ids(7777).is_empty());
    }

    #[test]
    fn test_included_groups() {
        let (users, groups, layout) = (users(), groups(), DirectoryLayout::default());
        let index = DirectoryIndex::new(&users, &groups, &layout);

        assert_eq!(index.expanded_gids(5503), vec![5503, 5501]);
        assert_eq!(index.member_ids(5503), vec!["hackers", "johndoe"]);
    }

    #[test]
    fn test_cycles_terminate() {
        let (users, groups, layout) = (users(), groups(), DirectoryLayout::default());
        let index = DirectoryIndex::new(&users, &groups, &layout);

        assert_eq!(index.expanded_gids(6001), vec![6001, 6002, 5502]);
        assert_eq!(index.member_ids(6001), vec!["johndoe", "serviceuser"]);
    }

    #[test]
    fn test_groups_of() {
        let (users, groups, layout) = (users(), groups(), DirectoryLayout::default());
        let index = DirectoryIndex::new(&users, &groups, &layout);

        let names: Vec<_> = index.groups_of(&users[0]).iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["superheros", "vpn"]);

        let names: Vec<_> = index.groups_of(&users[2]).iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["svcaccts", "loop-a", "loop-b"]);
    }

    #[test]
    fn test_dns() {
        let (users, groups) = (users(), groups());
        let layout = DirectoryLayout::new("dc=example,dc=com").with_group_format("ou");
        let index = DirectoryIndex::new(&users, &groups, &layout);

        assert_eq!(
            index.account_dn(&users[0]),
            "cn=hackers,ou=superheros,ou=users,dc=example,dc=com"
        );
        assert_eq!(
            index.account_dn(&users[3]),
            "cn=orphan,ou=users,dc=example,dc=com"
        );
        assert_eq!(
            index.group_dn(&groups[2]),
            "ou=vpn,ou=groups,dc=example,dc=com"
        );
        assert_eq!(
            index.member_dns(5501),
            vec![
                "cn=hackers,ou=superheros,ou=users,dc=example,dc=com",
                "cn=johndoe,ou=svcaccts,ou=users,dc=example,dc=com",
            ]
        );
    }

    #[test]
    fn test_no_members() {
        assert!(NoMembers.member_dns(5501).is_empty());
        assert!(NoMembers.member_ids(5501).is_empty());
    }
}
