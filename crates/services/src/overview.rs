//! Per-topic completion bars for the overview page.
//!
//! `cached` renders instantly from the session cache; `refresh` asks the remote
//! store and rewrites the combined cache record for the next visit.

use std::sync::Arc;

use fsl_core::Clock;
use fsl_core::model::{TopicDescriptor, TopicId, UserId, completion_percentage};
use storage::{OverviewCounts, ProgressCache, TopicCount};
use tracing::warn;

use crate::remote::ProgressRemote;

/// Where a topic's learned count came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressSource {
    TopicCache,
    CombinedCache,
    Remote,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicProgress {
    pub topic: TopicId,
    pub title: String,
    pub learned: u32,
    pub total: u32,
    pub percentage: u32,
    pub source: ProgressSource,
}

impl TopicProgress {
    fn new(topic: &TopicDescriptor, learned: u32, source: ProgressSource) -> Self {
        let total = u32::try_from(topic.item_count()).unwrap_or(u32::MAX);
        Self {
            topic: topic.id().clone(),
            title: topic.title().to_owned(),
            learned,
            total,
            percentage: completion_percentage(learned, total),
            source,
        }
    }
}

#[derive(Clone)]
pub struct ProgressOverview {
    cache: ProgressCache,
    remote: ProgressRemote,
    clock: Clock,
}

impl ProgressOverview {
    #[must_use]
    pub fn new(cache: ProgressCache, remote: ProgressRemote, clock: Clock) -> Self {
        Self { cache, remote, clock }
    }

    /// Counts available without the network: the topic's own learned record
    /// first, then the combined overview record, else zero.
    #[must_use]
    pub fn cached(&self, topics: &[Arc<TopicDescriptor>]) -> Vec<TopicProgress> {
        let now = self.clock.now();
        let combined = self.cache.overview(now).map(|entry| entry.value);

        topics
            .iter()
            .map(|topic| {
                if let Some(entry) = self.cache.learned(topic, now) {
                    return TopicProgress::new(topic, entry.value.completed(), ProgressSource::TopicCache);
                }
                match combined.as_ref().and_then(|c| c.get(topic.id().as_str())) {
                    Some(count) => TopicProgress::new(topic, count.learned, ProgressSource::CombinedCache),
                    None => TopicProgress::new(topic, 0, ProgressSource::Empty),
                }
            })
            .collect()
    }

    /// Authoritative counts from the remote store. A topic whose fetch fails
    /// keeps its cached value. The result is written back as the combined record.
    pub async fn refresh(&self, user: &UserId, topics: &[Arc<TopicDescriptor>]) -> Vec<TopicProgress> {
        let cached = self.cached(topics);
        let mut rows = Vec::with_capacity(topics.len());

        for (topic, fallback) in topics.iter().zip(cached) {
            let row = match self.remote.fetch_progress(user, topic.id()).await {
                Ok(Some(document)) => {
                    TopicProgress::new(topic, document.learned_items.completed(), ProgressSource::Remote)
                }
                Ok(None) => TopicProgress::new(topic, 0, ProgressSource::Remote),
                Err(err) => {
                    warn!(topic = %topic.id(), error = %err, "overview fetch failed, using cached count");
                    fallback
                }
            };
            rows.push(row);
        }

        let counts: OverviewCounts = rows
            .iter()
            .map(|row| {
                (
                    row.topic.to_string(),
                    TopicCount {
                        learned: row.learned,
                        total: row.total,
                    },
                )
            })
            .collect();
        if let Err(err) = self.cache.write_overview(&counts, self.clock.now()) {
            warn!(error = %err, "failed to cache overview counts");
        }

        rows
    }
}
