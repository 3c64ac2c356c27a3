//! Persistent store on sled.
//!
//! Users and groups live in separate trees keyed by name, encoded as JSON.
//! A third tree maps lowercased e-mail addresses to user names.

use tracing::debug;

use super::DirectoryStore;
use crate::error::{Error, Result};
use crate::model::{DirectoryData, Group, Identity};

const USERS_TREE_NAME: &[u8] = b"directory:users";
const GROUPS_TREE_NAME: &[u8] = b"directory:groups";
const MAIL_INDEX_TREE_NAME: &[u8] = b"directory:users:mail";

/// Directory store persisted in sled.
pub struct SledStore {
    users: sled::Tree,
    groups: sled::Tree,
    mail_index: sled::Tree,
}

impl SledStore {
    /// Open the store inside an existing sled database.
    pub fn open(db: &sled::Db) -> Result<Self> {
        Ok(Self {
            users: db.open_tree(USERS_TREE_NAME)?,
            groups: db.open_tree(GROUPS_TREE_NAME)?,
            mail_index: db.open_tree(MAIL_INDEX_TREE_NAME)?,
        })
    }

    /// Open (or create) a sled database at `path` and the store inside it.
    pub fn open_path(path: impl AsRef<std::path::Path>) -> Result<(Self, sled::Db)> {
        let db = sled::open(path)?;
        let store = Self::open(&db)?;
        Ok((store, db))
    }

    /// Save a user, replacing any previous record with the same name.
    ///
    /// Fails with [`Error::InvalidData`] when another user already holds the
    /// same mail address.
    pub fn put_user(&self, user: &Identity) -> Result<()> {
        if !user.mail.is_empty() {
            if let Some(owner) = self.mail_index.get(mail_key(&user.mail))? {
                if &*owner != user.name.as_bytes() {
                    return Err(Error::InvalidData(format!(
                        "mail {} already belongs to {}",
                        user.mail,
                        String::from_utf8_lossy(&owner)
                    )));
                }
            }
        }
        if let Some(previous) = self.user_by_name(&user.name)? {
            if !previous.mail.is_empty() {
                self.mail_index.remove(mail_key(&previous.mail))?;
            }
        }
        self.users.insert(user.name.as_bytes(), serialize(user)?)?;
        if !user.mail.is_empty() {
            self.mail_index
                .insert(mail_key(&user.mail), user.name.as_bytes())?;
        }
        Ok(())
    }

    /// Save a group, replacing any previous record with the same name.
    pub fn put_group(&self, group: &Group) -> Result<()> {
        self.groups.insert(group.name.as_bytes(), serialize(group)?)?;
        Ok(())
    }

    /// Remove a user.
    pub fn remove_user(&self, name: &str) -> Result<bool> {
        match self.users.remove(name.as_bytes())? {
            Some(bytes) => {
                let user: Identity = deserialize(&bytes)?;
                if !user.mail.is_empty() {
                    let key = mail_key(&user.mail);
                    if self.mail_index.get(&key)?.as_deref() == Some(user.name.as_bytes()) {
                        self.mail_index.remove(key)?;
                    }
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove a group.
    pub fn remove_group(&self, name: &str) -> Result<bool> {
        Ok(self.groups.remove(name.as_bytes())?.is_some())
    }

    /// Replace the whole store content with a validated document.
    pub fn import(&self, data: &DirectoryData) -> Result<()> {
        data.validate()?;
        self.clear()?;
        for user in &data.users {
            self.put_user(user)?;
        }
        for group in &data.groups {
            self.put_group(group)?;
        }
        debug!(
            users = data.users.len(),
            groups = data.groups.len(),
            "directory imported"
        );
        Ok(())
    }

    /// Remove every record.
    pub fn clear(&self) -> Result<()> {
        self.users.clear()?;
        self.groups.clear()?;
        self.mail_index.clear()?;
        Ok(())
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.users.flush()?;
        self.groups.flush()?;
        self.mail_index.flush()?;
        Ok(())
    }

    fn scan<T: serde::de::DeserializeOwned>(tree: &sled::Tree) -> Result<Vec<T>> {
        let mut records = Vec::new();
        for result in tree.iter() {
            let (_, value) = result?;
            records.push(deserialize(&value)?);
        }
        Ok(records)
    }
}

impl DirectoryStore for SledStore {
    fn user_by_name(&self, name: &str) -> Result<Option<Identity>> {
        match self.users.get(name.as_bytes())? {
            Some(bytes) => Ok(Some(deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn user_by_mail(&self, mail: &str) -> Result<Option<Identity>> {
        if mail.is_empty() {
            return Ok(None);
        }
        match self.mail_index.get(mail_key(mail))? {
            Some(name) => {
                let name = std::str::from_utf8(&name)
                    .map_err(|e| Error::InvalidData(format!("mail index entry: {}", e)))?;
                self.user_by_name(name)
            }
            None => Ok(None),
        }
    }

    fn group_by_name(&self, name: &str) -> Result<Option<Group>> {
        match self.groups.get(name.as_bytes())? {
            Some(bytes) => Ok(Some(deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn users(&self) -> Result<Vec<Identity>> {
        Self::scan(&self.users)
    }

    fn groups(&self) -> Result<Vec<Group>> {
        Self::scan(&self.groups)
    }
}

fn mail_key(mail: &str) -> Vec<u8> {
    mail.to_ascii_lowercase().into_bytes()
}

fn serialize<T: serde::Serialize>(record: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(record).map_err(|e| Error::Serialization(e.to_string()))
}

fn deserialize<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| Error::Deserialization(e.to_string()))
}
