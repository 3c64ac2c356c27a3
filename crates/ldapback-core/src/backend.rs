//! The lookup contract every backend implements.

use ldapback_proto::DirectoryEntry;

use crate::error::Result;
use crate::model::{Group, Identity};

/// Identity and group lookups a coordinator calls back into.
///
/// Absence is `Ok(None)`; `Err` always means the underlying store failed and
/// is passed through untouched. Implementations hold no per-call mutable
/// state and may be invoked concurrently from many sessions.
pub trait Backend: Send + Sync {
    /// Resolve a user by primary name, or by e-mail when `by_alternate` is set.
    fn find_user(&self, name: &str, by_alternate: bool) -> Result<Option<Identity>>;

    /// Resolve a group by name.
    fn find_group(&self, name: &str) -> Result<Option<Group>>;

    /// Every account rendered under `hierarchy`.
    fn find_posix_accounts(&self, hierarchy: &str) -> Result<Vec<DirectoryEntry>>;

    /// Every group rendered under `hierarchy`.
    fn find_posix_groups(&self, hierarchy: &str) -> Result<Vec<DirectoryEntry>>;

    /// Whether `user` is a member of `group` as the rendered group lists it.
    ///
    /// The default sees primary and secondary groups only. Backends that
    /// render members of included groups override it to match.
    fn is_member(&self, user: &Identity, group: &Group) -> Result<bool> {
        Ok(user.is_direct_member(group.gid_number))
    }
}
