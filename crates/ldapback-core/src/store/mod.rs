//! Identity stores.
//!
//! A store owns identity and group records. Backends read from it through
//! [`DirectoryStore`]; stores are responsible for their own synchronization.

mod memory;
mod sled_store;

pub use memory::MemoryStore;
pub use sled_store::SledStore;

use crate::error::Result;
use crate::model::{Group, Identity};

/// Read access to identity and group records.
///
/// Lookups return `Ok(None)` when a record does not exist; errors are reserved
/// for store failures.
pub trait DirectoryStore: Send + Sync {
    /// Find a user by primary name.
    fn user_by_name(&self, name: &str) -> Result<Option<Identity>>;

    /// Find a user by e-mail address.
    fn user_by_mail(&self, mail: &str) -> Result<Option<Identity>>;

    /// Find a group by name.
    fn group_by_name(&self, name: &str) -> Result<Option<Group>>;

    /// All users, in a stable order.
    fn users(&self) -> Result<Vec<Identity>>;

    /// All groups, in a stable order.
    fn groups(&self) -> Result<Vec<Group>>;
}

impl<S: DirectoryStore + ?Sized> DirectoryStore for std::sync::Arc<S> {
    fn user_by_name(&self, name: &str) -> Result<Option<Identity>> {
        (**self).user_by_name(name)
    }

    fn user_by_mail(&self, mail: &str) -> Result<Option<Identity>> {
        (**self).user_by_mail(mail)
    }

    fn group_by_name(&self, name: &str) -> Result<Option<Group>> {
        (**self).group_by_name(name)
    }

    fn users(&self) -> Result<Vec<Identity>> {
        (**self).users()
    }

    fn groups(&self) -> Result<Vec<Group>> {
        (**self).groups()
    }
}
