//! Security module for ldapback.
//!
//! - Capability grants attached to identities
//! - Structured audit events for binds, declined operations and session close
//!
//! # Example
//!
//! ```ignore
//! use ldapback_core::security::{Capability, CapabilitySet};
//!
//! let caps = CapabilitySet::from_capabilities(vec![Capability::new("search", "*")]);
//! assert!(caps.can_search("dc=example,dc=com"));
//! ```

pub mod audit;
pub mod capability;
pub mod error;

// Error types
pub use error::{SecurityError, SecurityResult};

// Capability types
pub use capability::{Capability, CapabilitySet, ObjectScope, ACTION_SEARCH};

// Audit types
pub use audit::{
    AuditEvent, AuditEventType, AuditLogger, MemoryAuditLogger, MutationOp, NullAuditLogger,
    SharedAuditLogger, TracingAuditLogger,
};
