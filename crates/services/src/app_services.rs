use std::sync::Arc;

use fsl_core::catalog;
use fsl_core::model::{TopicDescriptor, TopicId};
use storage::repository::Storage;
use storage::ProgressCache;

use crate::Clock;
use crate::error::{AppServicesError, LessonError};
use crate::lesson::{LessonService, SyncSettings};
use crate::overview::ProgressOverview;
use crate::quiz::QuizRecorder;
use crate::remote::ProgressRemote;

/// Assembles app-facing services over one storage backend and the topic catalog.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    settings: SyncSettings,
    topics: Vec<Arc<TopicDescriptor>>,
    cache: ProgressCache,
    remote: ProgressRemote,
}

impl AppServices {
    /// # Errors
    ///
    /// Returns `AppServicesError::Topic` if a built-in topic is malformed.
    pub fn new(storage: &Storage, clock: Clock, settings: SyncSettings) -> Result<Self, AppServicesError> {
        let topics = catalog::builtin_topics()?.into_iter().map(Arc::new).collect();
        Ok(Self {
            clock,
            settings,
            topics,
            cache: ProgressCache::new(Arc::clone(&storage.session)),
            remote: ProgressRemote::new(Arc::clone(&storage.documents)),
        })
    }

    /// Build services backed by `SQLite` documents and the given session store.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        session: Option<Arc<dyn storage::SessionStore>>,
        clock: Clock,
        settings: SyncSettings,
    ) -> Result<Self, AppServicesError> {
        let mut storage = Storage::sqlite(db_url).await?;
        if let Some(session) = session {
            storage = storage.with_session(session);
        }
        Self::new(&storage, clock, settings)
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn topics(&self) -> &[Arc<TopicDescriptor>] {
        &self.topics
    }

    /// # Errors
    ///
    /// Returns `LessonError::UnknownTopic` if no topic has this id.
    pub fn topic(&self, id: &TopicId) -> Result<Arc<TopicDescriptor>, LessonError> {
        self.topics
            .iter()
            .find(|topic| topic.id() == id)
            .cloned()
            .ok_or_else(|| LessonError::UnknownTopic(id.to_string()))
    }

    /// Open a lesson page at its cached position.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::UnknownTopic` if no topic has this id.
    pub fn open_lesson(&self, id: &TopicId) -> Result<LessonService, LessonError> {
        let topic = self.topic(id)?;
        Ok(
            LessonService::open(topic, self.cache.clone(), self.remote.clone(), self.clock)
                .with_settings(self.settings),
        )
    }

    #[must_use]
    pub fn cache(&self) -> &ProgressCache {
        &self.cache
    }

    #[must_use]
    pub fn remote(&self) -> &ProgressRemote {
        &self.remote
    }

    #[must_use]
    pub fn overview(&self) -> ProgressOverview {
        ProgressOverview::new(self.cache.clone(), self.remote.clone(), self.clock)
    }

    #[must_use]
    pub fn quiz_recorder(&self) -> QuizRecorder {
        QuizRecorder::new(self.remote.clone(), self.clock)
    }
}
