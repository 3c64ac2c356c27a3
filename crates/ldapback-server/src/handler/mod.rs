//! Backend handlers.
//!
//! A handler is the pluggable unit a coordinator talks to. It answers the
//! four [`Backend`] lookups itself, hands `bind` and `search` to its
//! [`LdapOps`] coordinator, and declines every mutation.

mod store;
mod stub;

pub use store::StoreHandler;
pub use stub::StubHandler;

use std::sync::Arc;

use ldapback_core::security::{AuditEvent, MutationOp, SharedAuditLogger};
use ldapback_core::{Backend, DirectoryLayout, MemoryStore, SledStore};
use ldapback_proto::{AddRequest, ModifyRequest, ResultCode, SearchRequest, SearchResult};
use tracing::{error, info};

use crate::config::{BackendConfig, Datastore};
use crate::error::Result;
use crate::ops::{DefaultOps, LdapOps};

/// The client connection an operation arrived on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Connection id, unique per listener.
    pub id: u64,
    /// Remote address.
    pub peer: String,
}

impl ConnectionInfo {
    /// Create connection info.
    pub fn new(id: u64, peer: impl Into<String>) -> Self {
        Self {
            id,
            peer: peer.into(),
        }
    }

    /// An in-process caller.
    pub fn local() -> Self {
        Self::new(0, "local")
    }
}

/// Collaborators every handler is constructed with.
pub struct HandlerContext {
    name: &'static str,
    layout: DirectoryLayout,
    ops: Arc<dyn LdapOps>,
    audit: SharedAuditLogger,
}

impl HandlerContext {
    /// Create a context for the handler called `name`.
    pub fn new(
        name: &'static str,
        layout: DirectoryLayout,
        ops: Arc<dyn LdapOps>,
        audit: SharedAuditLogger,
    ) -> Self {
        Self {
            name,
            layout,
            ops,
            audit,
        }
    }

    /// Handler name used in diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Naming layout.
    pub fn layout(&self) -> &DirectoryLayout {
        &self.layout
    }

    /// Coordinator for bind and search.
    pub fn ops(&self) -> &dyn LdapOps {
        self.ops.as_ref()
    }

    /// Record a declined mutation and produce its result code.
    pub fn decline(
        &self,
        operation: MutationOp,
        bound_dn: &str,
        target_dn: &str,
        conn: &ConnectionInfo,
    ) -> ResultCode {
        error!(
            handler = self.name,
            operation = %operation,
            bound_dn,
            dn = target_dn,
            peer = %conn.peer,
            "{} not implemented",
            operation
        );
        self.audit
            .log(AuditEvent::declined(self.name, bound_dn, operation, target_dn));
        ResultCode::InsufficientAccessRights
    }

    /// Record the end of a session.
    pub fn close(&self, bound_dn: &str, conn: &ConnectionInfo) {
        info!(handler = self.name, bound_dn, conn_id = conn.id, "session closed");
        self.audit.log(AuditEvent::session_closed(self.name, bound_dn));
    }
}

/// The full facade a coordinator drives.
///
/// Only [`Handler::context`] and [`Handler::backend`] are required; the
/// operations default to delegation (`bind`, `search`) and refusal
/// (`add`, `modify`, `delete`). A declined mutation is not an error: it is
/// `Ok(InsufficientAccessRights)`.
pub trait Handler: Backend {
    /// Shared collaborators.
    fn context(&self) -> &HandlerContext;

    /// This handler as the lookup source handed to the coordinator.
    fn backend(&self) -> &dyn Backend;

    /// Authenticate a session.
    fn bind(&self, dn: &str, password: &str, conn: &ConnectionInfo) -> ResultCode {
        self.context().ops().bind(self.backend(), dn, password, conn)
    }

    /// Search on behalf of `bound_dn`.
    fn search(
        &self,
        bound_dn: &str,
        request: &SearchRequest,
        conn: &ConnectionInfo,
    ) -> SearchResult {
        self.context()
            .ops()
            .search(self.backend(), bound_dn, request, conn)
    }

    /// Add an entry.
    fn add(
        &self,
        bound_dn: &str,
        request: &AddRequest,
        conn: &ConnectionInfo,
    ) -> ldapback_core::Result<ResultCode> {
        Ok(self
            .context()
            .decline(MutationOp::Add, bound_dn, &request.dn, conn))
    }

    /// Modify an entry.
    fn modify(
        &self,
        bound_dn: &str,
        request: &ModifyRequest,
        conn: &ConnectionInfo,
    ) -> ldapback_core::Result<ResultCode> {
        Ok(self
            .context()
            .decline(MutationOp::Modify, bound_dn, &request.dn, conn))
    }

    /// Delete an entry.
    fn delete(
        &self,
        bound_dn: &str,
        dn: &str,
        conn: &ConnectionInfo,
    ) -> ldapback_core::Result<ResultCode> {
        Ok(self
            .context()
            .decline(MutationOp::Delete, bound_dn, dn, conn))
    }

    /// End a session.
    fn close(&self, bound_dn: &str, conn: &ConnectionInfo) -> ldapback_core::Result<()> {
        self.context().close(bound_dn, conn);
        Ok(())
    }
}

/// Build the handler `config` selects, wired to the default coordinator.
pub fn open_handler(config: &BackendConfig, audit: SharedAuditLogger) -> Result<Box<dyn Handler>> {
    let layout = config.layout.clone();
    let ops: Arc<dyn LdapOps> = Arc::new(DefaultOps::new(layout.clone(), audit.clone()));

    let handler: Box<dyn Handler> = match &config.datastore {
        Datastore::Stub => Box::new(StubHandler::new(layout, ops, audit)),
        Datastore::File { path } => {
            let store = MemoryStore::open(path)?;
            Box::new(StoreHandler::new(store, layout, ops, audit))
        }
        Datastore::Sled { path } => {
            let (store, db) = SledStore::open_path(path)?;
            Box::new(StoreHandler::new(store, layout, ops, audit).with_database(db))
        }
    };
    info!(
        handler = handler.context().name(),
        base_dn = %config.layout.base_dn,
        "handler ready"
    );
    Ok(handler)
}
