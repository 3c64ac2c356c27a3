//! Account entry synthesis.

use ldapback_proto::{DirectoryEntry, EntryAttribute};

use super::membership::DirectoryIndex;
use crate::model::Identity;

/// Object classes every account entry carries.
pub const ACCOUNT_OBJECT_CLASSES: [&str; 3] = ["posixAccount", "shadowAccount", "top"];

const DEFAULT_LOGIN_SHELL: &str = "/bin/bash";

/// Render `user` as a `posixAccount` entry under `hierarchy`.
pub fn synthesize_account(
    user: &Identity,
    hierarchy: &str,
    index: &DirectoryIndex<'_>,
) -> DirectoryEntry {
    let layout = index.layout();
    let mut entry = DirectoryEntry::new(index.account_dn_in(user, hierarchy));

    entry.push(EntryAttribute::single(&layout.name_format, &user.name));
    if layout.name_format != "uid" {
        entry.push(EntryAttribute::single("uid", &user.name));
    }
    if let Some(given_name) = &user.given_name {
        entry.push(EntryAttribute::single("givenName", given_name));
    }
    if let Some(sn) = &user.sn {
        entry.push(EntryAttribute::single("sn", sn));
    }
    if let Some(primary) = index.group_by_gid(user.primary_group) {
        entry.push(EntryAttribute::single("ou", &primary.name));
    }
    entry.push(EntryAttribute::single("uidNumber", user.uid_number.to_string()));
    entry.push(EntryAttribute::single(
        "accountStatus",
        if user.disabled { "inactive" } else { "active" },
    ));
    if !user.mail.is_empty() {
        entry.push(EntryAttribute::single("mail", &user.mail));
    }
    entry.push(EntryAttribute::new("objectClass", ACCOUNT_OBJECT_CLASSES));
    entry.push(EntryAttribute::single(
        "loginShell",
        user.login_shell.as_deref().unwrap_or(DEFAULT_LOGIN_SHELL),
    ));
    entry.push(EntryAttribute::single(
        "homeDirectory",
        user.homedir
            .clone()
            .unwrap_or_else(|| format!("/home/{}", user.name)),
    ));
    entry.push(EntryAttribute::single("description", &user.name));
    entry.push(EntryAttribute::single("gecos", &user.name));
    entry.push(EntryAttribute::single("gidNumber", user.primary_group.to_string()));
    entry.push(EntryAttribute::new(
        "memberOf",
        index
            .groups_of(user)
            .into_iter()
            .map(|g| index.group_dn(g)),
    ));
    entry
}
