#![forbid(unsafe_code)]

pub mod progress_cache;
pub mod repository;
pub mod session;
pub mod sqlite;

pub use progress_cache::{OverviewCounts, ProgressCache, TopicCount};
pub use repository::{DocumentPath, DocumentStore, Fields, InMemoryDocumentStore, Storage, StorageError, WriteMode};
pub use session::{CacheError, InMemorySessionStore, JsonFileSessionStore, SessionStore};
