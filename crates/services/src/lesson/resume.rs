use chrono::{DateTime, Utc};
use fsl_core::model::{ItemKey, LearnedSet, TopicDescriptor};
use storage::ProgressCache;
use tracing::debug;

/// Where a lesson page starts, read from the session cache only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumePoint {
    pub index: usize,
    /// Save time of the position record the index came from, if any.
    pub position_saved_at: Option<DateTime<Utc>>,
    pub learned: LearnedSet,
}

/// Index of `key` in the topic's current item list, or the first item if the
/// key is no longer part of the topic.
#[must_use]
pub(crate) fn locate(topic: &TopicDescriptor, key: &ItemKey) -> usize {
    topic.index_of(key).unwrap_or(0)
}

/// Cached position mapped onto the topic's current items, with the record's
/// save time. A stale key counts as no record.
fn cached_position(cache: &ProgressCache, topic: &TopicDescriptor, now: DateTime<Utc>) -> Option<(usize, DateTime<Utc>)> {
    let entry = cache.position(topic, now)?;
    match topic.index_of(&entry.value) {
        Some(index) => Some((index, entry.saved_at)),
        None => {
            debug!(topic = %topic.id(), key = %entry.value, "cached item no longer in topic");
            None
        }
    }
}

/// Initial display index for a topic.
///
/// Never touches the network and never fails: a missing, expired, unreadable
/// or stale position record all resolve to index 0.
#[must_use]
pub fn resolve_initial_position(cache: &ProgressCache, topic: &TopicDescriptor, now: DateTime<Utc>) -> usize {
    cached_position(cache, topic, now).map_or(0, |(index, _)| index)
}

/// Full resume state: position plus the cached learned set (if still fresh).
#[must_use]
pub fn resume(cache: &ProgressCache, topic: &TopicDescriptor, now: DateTime<Utc>) -> ResumePoint {
    let (index, position_saved_at) = match cached_position(cache, topic, now) {
        Some((index, saved_at)) => (index, Some(saved_at)),
        None => (0, None),
    };

    let learned = cache
        .learned(topic, now)
        .map(|entry| entry.value)
        .unwrap_or_default();

    ResumePoint {
        index,
        position_saved_at,
        learned,
    }
}
