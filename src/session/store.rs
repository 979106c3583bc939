use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    sync::Mutex,
};

use super::SessionError;

/// Where serialized session records live between requests.
pub trait SessionStore: Send + Sync + 'static {
    /// Returns `None` when no record exists for `id`.
    fn load(&self, id: &str) -> Result<Option<Vec<u8>>, SessionError>;

    fn save(&self, id: &str, data: &[u8]) -> Result<(), SessionError>;

    /// Deleting an unknown id is not an error.
    fn delete(&self, id: &str) -> Result<(), SessionError>;
}

/// A store that keeps nothing. Every session starts out empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyStore;

impl SessionStore for DummyStore {
    fn load(&self, _: &str) -> Result<Option<Vec<u8>>, SessionError> {
        Ok(None)
    }

    fn save(&self, _: &str, _: &[u8]) -> Result<(), SessionError> {
        Ok(())
    }

    fn delete(&self, _: &str) -> Result<(), SessionError> {
        Ok(())
    }
}

/// Keeps session records in process memory.
///
/// Records live until their session is deleted or the process exits; nothing
/// expires them.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn records(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        // A panic while holding the lock cannot leave a record half-written.
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStore for MemoryStore {
    fn load(&self, id: &str) -> Result<Option<Vec<u8>>, SessionError> {
        Ok(self.records().get(id).cloned())
    }

    fn save(&self, id: &str, data: &[u8]) -> Result<(), SessionError> {
        self.records().insert(id.to_owned(), data.to_vec());
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<(), SessionError> {
        self.records().remove(id);
        Ok(())
    }
}

/// Stores each session as a file named after its id.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new("/tmp/session/")
    }
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file(&self, id: &str) -> Result<PathBuf, SessionError> {
        let valid = !id.is_empty()
            && id
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_'));
        if !valid {
            return Err(SessionError::InvalidId(id.to_owned()));
        }
        Ok(self.path.join(id))
    }
}

impl SessionStore for FileStore {
    fn load(&self, id: &str) -> Result<Option<Vec<u8>>, SessionError> {
        match fs::read(self.file(id)?) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, id: &str, data: &[u8]) -> Result<(), SessionError> {
        let file = self.file(id)?;
        fs::create_dir_all(&self.path)?;
        fs::write(file, data)?;
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<(), SessionError> {
        match fs::remove_file(self.file(id)?) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}
