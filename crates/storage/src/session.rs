//! Session-scoped string key/value stores backing the local progress cache.
//!
//! A store lives for one browsing session (one process for the terminal
//! runner). Nothing here is shared across sessions, so no locking beyond the
//! in-process mutex is needed.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;

/// Failures of the local cache layer. Callers treat every one of these as a miss.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CacheError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt cache entry {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Synchronous string-keyed session storage.
pub trait SessionStore: Send + Sync {
    /// # Errors
    ///
    /// Returns `CacheError::Unavailable` if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key` as one write.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Unavailable` if the value cannot be stored.
    fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;

    /// # Errors
    ///
    /// Returns `CacheError::Unavailable` if the backing store cannot be updated.
    fn remove(&self, key: &str) -> Result<(), CacheError>;
}

/// In-process session store; dropping it ends the session.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}

/// Session store persisted to a JSON file so a terminal session can be resumed.
///
/// The whole map is rewritten through a temporary file and renamed into place,
/// so a crash never leaves a half-written entry behind.
#[derive(Clone)]
pub struct JsonFileSessionStore {
    path: PathBuf,
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl JsonFileSessionStore {
    /// Open (or lazily create) the session file at `path`.
    ///
    /// An unreadable or malformed file starts an empty session instead of failing.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match load_entries(&path) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "discarding unreadable session file");
                BTreeMap::new()
            }
        };
        Self {
            path,
            entries: Arc::new(Mutex::new(entries)),
        }
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), CacheError> {
        let json = serde_json::to_vec_pretty(entries)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;
        write_atomically(&self.path, &json).map_err(|e| CacheError::Unavailable(e.to_string()))
    }
}

fn load_entries(path: &Path) -> Result<BTreeMap<String, String>, CacheError> {
    match fs::read(path) {
        Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| CacheError::Corrupt {
            key: path.display().to_string(),
            reason: e.to_string(),
        }),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(err) => Err(CacheError::Unavailable(err.to_string())),
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
}

impl SessionStore for JsonFileSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        let previous = guard.insert(key.to_owned(), value.to_owned());
        if let Err(err) = self.flush(&guard) {
            // Keep memory and file in step: undo the insert.
            match previous {
                Some(old) => guard.insert(key.to_owned(), old),
                None => guard.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        if guard.remove(key).is_some() {
            self.flush(&guard)?;
        }
        Ok(())
    }
}
