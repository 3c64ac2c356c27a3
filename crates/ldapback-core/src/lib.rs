//! ldapback core - identity model, stores and entry synthesis.
//!
//! This crate provides everything a directory backend needs below the
//! protocol coordinator: the [`Backend`] lookup contract, identity and group
//! records, capability grants, stores, and the pure functions that render
//! records as directory entries.

pub mod backend;
pub mod error;
pub mod model;
pub mod security;
pub mod store;
pub mod synth;

pub use backend::Backend;
pub use error::{Error, Result};
pub use model::{DirectoryData, Group, Identity};
pub use store::{DirectoryStore, MemoryStore, SledStore};
pub use synth::{
    build_dn, synthesize_account, synthesize_group, DirectoryIndex, DirectoryLayout,
    GroupRenderingMode, MembershipLookup, NoMembers,
};

// Security exports
pub use security::{
    AuditEvent, AuditEventType, AuditLogger, Capability, CapabilitySet, MemoryAuditLogger,
    MutationOp, NullAuditLogger, SecurityError, SecurityResult, SharedAuditLogger,
    TracingAuditLogger,
};

/// Re-export protocol types.
pub use ldapback_proto as proto;
