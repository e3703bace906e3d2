//! Resumable key/value store for in-progress sessions.
//!
//! Mirrors browser session storage: string values under string keys, surviving a
//! reload of the same session but never shared with the remote document store.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::repository::StorageError;

/// String key/value storage scoped to one client session.
pub trait SessionStore: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Process-local store; cleared when the process exits.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}

/// One file per key inside a directory, so a restarted process can resume.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    /// Opens (and creates if needed) the store directory.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the directory cannot be created.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(name)
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Connection(e.to_string())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, value).map_err(|e| StorageError::Connection(e.to_string()))?;
        fs::rename(&tmp, &path).map_err(|e| StorageError::Connection(e.to_string()))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Connection(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &dyn SessionStore) {
        assert_eq!(store.get("quiz_state:1").unwrap(), None);
        store.set("quiz_state:1", "{\"a\":1}").unwrap();
        store.set("quiz_state:1", "{\"a\":2}").unwrap();
        assert_eq!(
            store.get("quiz_state:1").unwrap().as_deref(),
            Some("{\"a\":2}")
        );
        store.remove("quiz_state:1").unwrap();
        store.remove("quiz_state:1").unwrap();
        assert_eq!(store.get("quiz_state:1").unwrap(), None);
    }

    #[test]
    fn in_memory_store_overwrites_and_removes() {
        exercise(&InMemorySessionStore::new());
    }

    #[test]
    fn file_store_overwrites_and_removes() {
        let dir = std::env::temp_dir().join(format!("quiz-session-{}", uuid::Uuid::new_v4()));
        let store = FileSessionStore::open(&dir).unwrap();
        exercise(&store);

        store.set("timer_end:9", "123").unwrap();
        let reopened = FileSessionStore::open(&dir).unwrap();
        assert_eq!(reopened.get("timer_end:9").unwrap().as_deref(), Some("123"));

        fs::remove_dir_all(dir).unwrap();
    }
}
