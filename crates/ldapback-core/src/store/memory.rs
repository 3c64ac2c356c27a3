//! In-memory store loaded from a directory document.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use super::DirectoryStore;
use crate::error::Result;
use crate::model::{DirectoryData, Group, Identity};

/// Store holding a validated snapshot of a directory document.
///
/// Readers clone the current snapshot handle and never block a reload for
/// longer than the pointer swap.
pub struct MemoryStore {
    snapshot: RwLock<Arc<DirectoryData>>,
    source: Option<PathBuf>,
}

impl MemoryStore {
    /// Create a store from an already-parsed document.
    pub fn new(data: DirectoryData) -> Result<Self> {
        data.validate()?;
        Ok(Self {
            snapshot: RwLock::new(Arc::new(data)),
            source: None,
        })
    }

    /// Load a store from a JSON document on disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = DirectoryData::from_file(path)?;
        info!(
            path = %path.display(),
            users = data.users.len(),
            groups = data.groups.len(),
            "directory document loaded"
        );
        Ok(Self {
            snapshot: RwLock::new(Arc::new(data)),
            source: Some(path.to_path_buf()),
        })
    }

    /// Re-read the source document. The old snapshot stays in place on error.
    pub fn reload(&self) -> Result<()> {
        if let Some(path) = &self.source {
            let data = DirectoryData::from_file(path)?;
            self.replace(data)?;
        }
        Ok(())
    }

    /// Swap in a new document.
    pub fn replace(&self, data: DirectoryData) -> Result<()> {
        data.validate()?;
        *self.snapshot.write() = Arc::new(data);
        Ok(())
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<DirectoryData> {
        self.snapshot.read().clone()
    }
}

impl DirectoryStore for MemoryStore {
    fn user_by_name(&self, name: &str) -> Result<Option<Identity>> {
        Ok(self.snapshot().users.iter().find(|u| u.name == name).cloned())
    }

    fn user_by_mail(&self, mail: &str) -> Result<Option<Identity>> {
        if mail.is_empty() {
            return Ok(None);
        }
        Ok(self
            .snapshot()
            .users
            .iter()
            .find(|u| u.mail.eq_ignore_ascii_case(mail))
            .cloned())
    }

    fn group_by_name(&self, name: &str) -> Result<Option<Group>> {
        Ok(self.snapshot().groups.iter().find(|g| g.name == name).cloned())
    }

    fn users(&self) -> Result<Vec<Identity>> {
        Ok(self.snapshot().users.clone())
    }

    fn groups(&self) -> Result<Vec<Group>> {
        Ok(self.snapshot().groups.clone())
    }
}
