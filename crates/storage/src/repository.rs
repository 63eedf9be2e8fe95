use async_trait::async_trait;
use fsl_core::model::UserId;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::session::{InMemorySessionStore, SessionStore};

/// Errors surfaced by document store adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Top-level fields of a stored document.
pub type Fields = Map<String, Value>;

/// Location of a document, e.g. `users/{uid}/progress/{topic}`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath(String);

impl DocumentPath {
    /// Progress document for a topic or quiz of one user.
    #[must_use]
    pub fn progress(user: &UserId, segment: &str) -> Self {
        Self(format!("users/{}/progress/{segment}", user.as_str()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentPath({})", self.0)
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How `write_document` treats fields already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Field-level upsert: fields absent from the payload survive. Nested maps
    /// merge recursively; arrays and scalars are replaced.
    Merge,
    /// The payload becomes the whole document.
    Replace,
}

/// Apply a merge-write payload onto existing fields.
pub fn merge_fields(target: &mut Fields, patch: Fields) {
    for (name, value) in patch {
        match (target.get_mut(&name), value) {
            (Some(Value::Object(existing)), Value::Object(nested)) => {
                merge_fields(existing, nested);
            }
            (_, value) => {
                target.insert(name, value);
            }
        }
    }
}

/// Contract of the remote progress store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be reached.
    async fn document_exists(&self, path: &DocumentPath) -> Result<bool, StorageError>;

    /// Fetch a document's fields, `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be reached or the stored
    /// document is not a JSON object.
    async fn read_document(&self, path: &DocumentPath) -> Result<Option<Fields>, StorageError>;

    /// Create or update a document.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write is rejected or cannot be delivered.
    async fn write_document(
        &self,
        path: &DocumentPath,
        fields: Fields,
        mode: WriteMode,
    ) -> Result<(), StorageError>;
}

/// Simple in-memory document store for tests and local-only runs.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    documents: Arc<Mutex<HashMap<DocumentPath, Fields>>>,
}

impl InMemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            documents: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of stored documents.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn len(&self) -> Result<usize, StorageError> {
        let guard = self
            .documents
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.len())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn document_exists(&self, path: &DocumentPath) -> Result<bool, StorageError> {
        let guard = self
            .documents
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.contains_key(path))
    }

    async fn read_document(&self, path: &DocumentPath) -> Result<Option<Fields>, StorageError> {
        let guard = self
            .documents
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(path).cloned())
    }

    async fn write_document(
        &self,
        path: &DocumentPath,
        fields: Fields,
        mode: WriteMode,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .documents
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        match mode {
            WriteMode::Merge => merge_fields(guard.entry(path.clone()).or_default(), fields),
            WriteMode::Replace => {
                guard.insert(path.clone(), fields);
            }
        }
        Ok(())
    }
}

/// Remote document store and session cache behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub documents: Arc<dyn DocumentStore>,
    pub session: Arc<dyn SessionStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            documents: Arc::new(InMemoryDocumentStore::new()),
            session: Arc::new(InMemorySessionStore::new()),
        }
    }

    /// Swap the session cache backend, keeping the document store.
    #[must_use]
    pub fn with_session(mut self, session: Arc<dyn SessionStore>) -> Self {
        self.session = session;
        self
    }
}
