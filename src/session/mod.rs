//! Cookie-backed server-side sessions.
mod store;

use std::{
    collections::HashMap,
    io,
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

pub use store::{DummyStore, FileStore, MemoryStore, SessionStore};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session store i/o failed")]
    Io(#[from] io::Error),
    #[error("session data could not be (de)serialized")]
    Serde(#[from] serde_json::Error),
    #[error("invalid session id {0:?}")]
    InvalidId(String),
}

/// Session state of one client.
///
/// Records are only written back when the session was modified, and a
/// session id is only allocated on the first write.
#[derive(Debug, Default, Clone)]
pub struct Session {
    id: Option<String>,
    data: HashMap<String, Value>,
    dirty: bool,
    deleted: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the session stored under `id`.
    ///
    /// Unknown ids, ids the store rejects and records that fail to decode all
    /// yield a fresh session without an id.
    pub fn load(id: Option<&str>, store: &dyn SessionStore) -> Result<Self, SessionError> {
        let Some(id) = id else {
            return Ok(Self::new());
        };

        let record = match store.load(id) {
            Ok(Some(record)) => record,
            Ok(None) => return Ok(Self::new()),
            Err(SessionError::InvalidId(id)) => {
                tracing::warn!(%id, "ignoring invalid session id");
                return Ok(Self::new());
            }
            Err(err) => return Err(err),
        };

        match serde_json::from_slice(&record) {
            Ok(data) => Ok(Self {
                id: Some(id.to_owned()),
                data,
                dirty: false,
                deleted: false,
            }),
            Err(err) => {
                tracing::warn!(id, error = %err, "discarding undecodable session record");
                Ok(Self::new())
            }
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Get a value and deserialize it into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SessionError> {
        self.data
            .get(key)
            .map(|value| serde_json::from_value(value.clone()).map_err(SessionError::from))
            .transpose()
    }

    pub fn insert<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) -> Result<(), SessionError> {
        let value = serde_json::to_value(value)?;
        self.data.insert(key.into(), value);
        self.dirty = true;
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.data.remove(key);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Mark the session for deletion once the request completes.
    pub fn delete(&mut self) {
        self.deleted = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Write the session to `store` if it was modified.
    pub fn save(&mut self, store: &dyn SessionStore) -> Result<(), SessionError> {
        if !self.dirty {
            return Ok(());
        }
        let id = self.id.get_or_insert_with(generate_id);
        let record = serde_json::to_vec(&self.data)?;
        store.save(id, &record)?;
        self.dirty = false;
        Ok(())
    }

    /// Remove the session's record from `store`, if it ever had one.
    pub fn destroy(&mut self, store: &dyn SessionStore) -> Result<(), SessionError> {
        if let Some(id) = self.id.take() {
            store.delete(&id)?;
        }
        self.data.clear();
        self.dirty = false;
        Ok(())
    }
}

/// A fresh hex encoded session id.
pub fn generate_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(nanos.to_le_bytes());
    hasher.update(rand::random::<u64>().to_le_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_id_yields_fresh_session() {
        let session = Session::load(None, &MemoryStore::new()).unwrap();
        assert_eq!(session.id(), None);
        assert!(session.is_empty());
    }

    #[test]
    fn unknown_id_is_not_kept() {
        let session = Session::load(Some("nope"), &MemoryStore::new()).unwrap();
        assert_eq!(session.id(), None);
    }

    #[test]
    fn save_allocates_id_and_round_trips() {
        let store = MemoryStore::new();
        let mut session = Session::new();
        session.insert("user", "alice").unwrap();
        session.insert("visits", 3).unwrap();
        assert!(session.is_dirty());

        session.save(&store).unwrap();
        let id = session.id().unwrap().to_owned();
        assert_eq!(id.len(), 64);
        assert!(!session.is_dirty());

        let loaded = Session::load(Some(id.as_str()), &store).unwrap();
        assert_eq!(loaded.id(), Some(id.as_str()));
        assert_eq!(
            loaded.get_as::<String>("user").unwrap().as_deref(),
            Some("alice")
        );
        assert_eq!(loaded.get_as::<u32>("visits").unwrap(), Some(3));
    }

    #[test]
    fn clean_session_is_not_written() {
        let store = MemoryStore::new();
        let mut session = Session::new();
        session.save(&store).unwrap();
        assert_eq!(session.id(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn undecodable_record_is_discarded() {
        let store = MemoryStore::new();
        store.save("abc", b"not json").unwrap();
        let session = Session::load(Some("abc"), &store).unwrap();
        assert_eq!(session.id(), None);
    }

    #[test]
    fn invalid_file_store_id_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::load(Some("../escape"), &FileStore::new(dir.path())).unwrap();
        assert_eq!(session.id(), None);
    }

    #[test]
    fn destroy_removes_record() {
        let store = MemoryStore::new();
        let mut session = Session::new();
        session.insert("k", true).unwrap();
        session.save(&store).unwrap();
        assert_eq!(store.len(), 1);

        session.destroy(&store).unwrap();
        assert!(store.is_empty());
        assert_eq!(session.id(), None);
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(generate_id(), generate_id());
    }
}
