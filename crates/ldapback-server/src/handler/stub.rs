//! Reference backend with built-in fixture records.

use std::sync::Arc;

use ldapback_core::security::{Capability, SharedAuditLogger};
use ldapback_core::{synthesize_group, Backend, DirectoryLayout, Group, Identity, NoMembers};
use ldapback_proto::DirectoryEntry;
use tracing::debug;

use super::{Handler, HandlerContext};
use crate::ops::LdapOps;

const SERVICE_USER: &str = "serviceuser";
const SERVICE_USER_MAIL: &str = "serviceuser@example.com";
// sha256("mysecret")
const SERVICE_USER_PASS_SHA256: &str =
    "652c7dc687d98c9889304ed2e408c74b611e86a40caa51c4b43f1dd5913c5cd0";

const PUBLISHED_GROUP: &str = "superheros";
const PUBLISHED_GID: u32 = 5501;
const SERVICE_GROUP: &str = "svcaccts";
const SERVICE_GID: u32 = 5502;

/// Fixed-data backend used to exercise coordinators without a store.
///
/// Resolves one service account and two groups, publishes no accounts and
/// a single memberless group under any hierarchy.
pub struct StubHandler {
    context: HandlerContext,
}

impl StubHandler {
    /// Create the stub backend.
    pub fn new(layout: DirectoryLayout, ops: Arc<dyn LdapOps>, audit: SharedAuditLogger) -> Self {
        Self {
            context: HandlerContext::new("stub", layout, ops, audit),
        }
    }

    fn service_user() -> Identity {
        Identity::new(SERVICE_USER, 5003, SERVICE_GID)
            .with_mail(SERVICE_USER_MAIL)
            .with_pass_sha256(SERVICE_USER_PASS_SHA256)
            .with_capability(Capability::new("search", "*"))
    }
}

impl Backend for StubHandler {
    fn find_user(&self, name: &str, by_alternate: bool) -> ldapback_core::Result<Option<Identity>> {
        debug!(name, by_alternate, "find user");
        let found = if by_alternate {
            name.eq_ignore_ascii_case(SERVICE_USER_MAIL)
        } else {
            name == SERVICE_USER
        };
        Ok(found.then(Self::service_user))
    }

    fn find_group(&self, name: &str) -> ldapback_core::Result<Option<Group>> {
        debug!(name, "find group");
        Ok(match name {
            SERVICE_GROUP => Some(Group::new(SERVICE_GROUP, SERVICE_GID)),
            PUBLISHED_GROUP => Some(Group::new(PUBLISHED_GROUP, PUBLISHED_GID)),
            _ => None,
        })
    }

    fn find_posix_accounts(&self, hierarchy: &str) -> ldapback_core::Result<Vec<DirectoryEntry>> {
        debug!(hierarchy, "find posix accounts");
        Ok(Vec::new())
    }

    fn find_posix_groups(&self, hierarchy: &str) -> ldapback_core::Result<Vec<DirectoryEntry>> {
        debug!(hierarchy, "find posix groups");
        let group = Group::new(PUBLISHED_GROUP, PUBLISHED_GID);
        Ok(vec![synthesize_group(
            &group,
            hierarchy,
            self.context.layout(),
            &NoMembers,
        )])
    }
}

impl Handler for StubHandler {
    fn context(&self) -> &HandlerContext {
        &self.context
    }

    fn backend(&self) -> &dyn Backend {
        self
    }
}
