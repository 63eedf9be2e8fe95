//! Typed access to progress documents in the remote store.

use std::sync::Arc;

use fsl_core::model::{ProgressUpdate, QuizAttempt, QuizId, RemoteProgress, TopicId, UserId};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use storage::repository::{DocumentPath, DocumentStore, Fields, WriteMode};
use tracing::debug;

use crate::error::SyncError;

fn to_fields<T: Serialize>(value: &T) -> Result<Fields, SyncError> {
    match serde_json::to_value(value).map_err(|e| SyncError::Encode(e.to_string()))? {
        Value::Object(fields) => Ok(fields),
        other => Err(SyncError::Encode(format!("expected an object, got {other}"))),
    }
}

fn from_fields<T: DeserializeOwned>(fields: Fields) -> Result<T, SyncError> {
    serde_json::from_value(Value::Object(fields)).map_err(|e| SyncError::Decode(e.to_string()))
}

/// Progress and quiz documents under `users/{uid}/progress/...`.
#[derive(Clone)]
pub struct ProgressRemote {
    store: Arc<dyn DocumentStore>,
}

impl ProgressRemote {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns `SyncError` if the store is unreachable or the document is malformed.
    pub async fn fetch_progress(
        &self,
        user: &UserId,
        topic: &TopicId,
    ) -> Result<Option<RemoteProgress>, SyncError> {
        let path = DocumentPath::progress(user, topic.as_str());
        match self.store.read_document(&path).await? {
            Some(fields) => from_fields(fields).map(Some),
            None => Ok(None),
        }
    }

    /// Create the topic document unless one already exists. Returns whether it
    /// was created.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the existence check or the write fails.
    pub async fn bootstrap_progress(
        &self,
        user: &UserId,
        topic: &TopicId,
        document: &RemoteProgress,
    ) -> Result<bool, SyncError> {
        let path = DocumentPath::progress(user, topic.as_str());
        if self.store.document_exists(&path).await? {
            debug!(%path, "progress document already exists, skipping bootstrap");
            return Ok(false);
        }
        self.store
            .write_document(&path, to_fields(document)?, WriteMode::Merge)
            .await?;
        debug!(%path, "bootstrapped progress document");
        Ok(true)
    }

    /// Merge-write a learn event. Reads the document first so a missing or
    /// incomplete one also gets its `total`.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the read or the merge-write fails.
    pub async fn push_learned(
        &self,
        user: &UserId,
        topic: &TopicId,
        total: u32,
        update: &ProgressUpdate,
    ) -> Result<(), SyncError> {
        let path = DocumentPath::progress(user, topic.as_str());
        let existing = self.store.read_document(&path).await?;

        let mut fields = to_fields(update)?;
        let has_total = existing
            .as_ref()
            .and_then(|doc| doc.get("total"))
            .and_then(Value::as_u64)
            .is_some_and(|t| t > 0);
        if !has_total {
            fields.insert("total".into(), Value::from(total));
        }

        self.store
            .write_document(&path, fields, WriteMode::Merge)
            .await?;
        debug!(%path, completed = update.completed, "merged learned set");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `SyncError` if the store is unreachable or the document is malformed.
    pub async fn fetch_quiz(&self, user: &UserId, quiz: &QuizId) -> Result<Option<QuizAttempt>, SyncError> {
        let path = DocumentPath::progress(user, quiz.as_str());
        match self.store.read_document(&path).await? {
            Some(fields) => from_fields(fields).map(Some),
            None => Ok(None),
        }
    }

    /// # Errors
    ///
    /// Returns `SyncError` if the record cannot be encoded or written.
    pub async fn write_quiz(&self, user: &UserId, quiz: &QuizId, record: &QuizAttempt) -> Result<(), SyncError> {
        let path = DocumentPath::progress(user, quiz.as_str());
        self.store
            .write_document(&path, to_fields(record)?, WriteMode::Merge)
            .await?;
        Ok(())
    }
}
