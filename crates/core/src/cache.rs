//! Typed session-cache entries with an embedded save time.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// How long a cached "last viewed item" stays usable for resume.
pub const POSITION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// How long a cached learned set is trusted before it counts as a miss.
pub const LEARNED_TTL: Duration = Duration::from_secs(60 * 60);

/// A cached value and the moment it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry<T> {
    pub value: T,
    pub saved_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    #[must_use]
    pub fn new(value: T, saved_at: DateTime<Utc>) -> Self {
        Self { value, saved_at }
    }

    /// `true` while `now - saved_at < window`. Entries stamped in the future
    /// (clock skew) count as fresh.
    #[must_use]
    pub fn is_valid(&self, window: Duration, now: DateTime<Utc>) -> bool {
        let window = TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX);
        now.signed_duration_since(self.saved_at) < window
    }

    /// Keep the entry only if it is still inside `window`.
    #[must_use]
    pub fn fresh(self, window: Duration, now: DateTime<Utc>) -> Option<Self> {
        self.is_valid(window, now).then_some(self)
    }
}
