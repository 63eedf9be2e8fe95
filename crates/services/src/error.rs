//! Shared error types for the services crate.

use thiserror::Error;

use fsl_core::model::{QuizError, TopicError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors talking to the remote progress store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SyncError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("remote document could not be decoded: {0}")]
    Decode(String),
    #[error("payload could not be encoded: {0}")]
    Encode(String),
    #[error("background sync task failed: {0}")]
    Task(String),
}

/// Errors opening a lesson page.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LessonError {
    #[error("unknown topic: {0}")]
    UnknownTopic(String),
}

/// Errors emitted by quiz sessions and the attempt recorder.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizSessionError {
    #[error("topic has no items to quiz on")]
    Empty,
    #[error("quiz already completed")]
    Completed,
    #[error("quiz is not finished yet")]
    Unfinished,
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Topic(#[from] TopicError),
}
