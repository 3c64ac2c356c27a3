//! Backend over a [`DirectoryStore`].

use std::sync::Arc;

use ldapback_core::security::SharedAuditLogger;
use ldapback_core::{
    synthesize_account, synthesize_group, Backend, DirectoryIndex, DirectoryLayout,
    DirectoryStore, Group, Identity,
};
use ldapback_proto::DirectoryEntry;
use tracing::debug;

use super::{Handler, HandlerContext};
use crate::ops::LdapOps;

/// Serves lookups from a store and renders entries from a snapshot of it.
pub struct StoreHandler<S> {
    store: S,
    context: HandlerContext,
    _db: Option<sled::Db>,
}

impl<S: DirectoryStore> StoreHandler<S> {
    /// Create a handler over `store`.
    pub fn new(
        store: S,
        layout: DirectoryLayout,
        ops: Arc<dyn LdapOps>,
        audit: SharedAuditLogger,
    ) -> Self {
        Self {
            store,
            context: HandlerContext::new("store", layout, ops, audit),
            _db: None,
        }
    }

    /// Keep the sled database the store was opened from alive with the handler.
    pub fn with_database(mut self, db: sled::Db) -> Self {
        self._db = Some(db);
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn render<F>(&self, render: F) -> ldapback_core::Result<Vec<DirectoryEntry>>
    where
        F: Fn(&DirectoryIndex<'_>, &[Identity], &[Group]) -> Vec<DirectoryEntry>,
    {
        let users = self.store.users()?;
        let groups = self.store.groups()?;
        let index = DirectoryIndex::new(&users, &groups, self.context.layout());
        Ok(render(&index, &users, &groups))
    }
}

impl<S: DirectoryStore> Backend for StoreHandler<S> {
    fn find_user(&self, name: &str, by_alternate: bool) -> ldapback_core::Result<Option<Identity>> {
        debug!(name, by_alternate, "find user");
        if by_alternate {
            self.store.user_by_mail(name)
        } else {
            self.store.user_by_name(name)
        }
    }

    fn find_group(&self, name: &str) -> ldapback_core::Result<Option<Group>> {
        debug!(name, "find group");
        self.store.group_by_name(name)
    }

    fn find_posix_accounts(&self, hierarchy: &str) -> ldapback_core::Result<Vec<DirectoryEntry>> {
        debug!(hierarchy, "find posix accounts");
        self.render(|index, users, _| {
            users
                .iter()
                .map(|user| synthesize_account(user, hierarchy, index))
                .collect()
        })
    }

    fn find_posix_groups(&self, hierarchy: &str) -> ldapback_core::Result<Vec<DirectoryEntry>> {
        debug!(hierarchy, "find posix groups");
        let layout = self.context.layout();
        self.render(|index, _, groups| {
            groups
                .iter()
                .map(|group| synthesize_group(group, hierarchy, layout, index))
                .collect()
        })
    }

    fn is_member(&self, user: &Identity, group: &Group) -> ldapback_core::Result<bool> {
        let users = self.store.users()?;
        let groups = self.store.groups()?;
        let index = DirectoryIndex::new(&users, &groups, self.context.layout());
        Ok(index
            .expanded_gids(group.gid_number)
            .into_iter()
            .any(|gid| user.is_direct_member(gid)))
    }
}

impl<S: DirectoryStore> Handler for StoreHandler<S> {
    fn context(&self) -> &HandlerContext {
        &self.context
    }

    fn backend(&self) -> &dyn Backend {
        self
    }
}
