//! ldapback protocol types.
//!
//! This crate defines the protocol-facing types a directory backend
//! produces and consumes.
//!
//! # Modules
//!
//! - [`entry`] - Directory entries and attributes
//! - [`dn`] - Distinguished name helpers
//! - [`message`] - Search, add and modify requests
//! - [`result`] - Result codes and search results
//! - [`filter`] - Search filter parsing and evaluation
//! - [`error`] - Protocol error types

pub mod dn;
pub mod entry;
pub mod error;
pub mod filter;
pub mod message;
pub mod result;

pub use error::Error;

// Re-export commonly used types at crate root
pub use entry::{DirectoryEntry, EntryAttribute};
pub use filter::{LdapFilter, MAX_FILTER_DEPTH};
pub use message::{AddRequest, ModifyOp, ModifyRequest, Modification, SearchRequest, SearchScope};
pub use result::{ResultCode, SearchResult};
