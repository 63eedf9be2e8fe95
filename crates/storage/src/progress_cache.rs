//! Typed view over the session store: position, learned-set and overview records.
//!
//! Record layout, one JSON string per key:
//!
//! ```text
//! "<topic>_position"   {"<positionField>": "<key>",   "timestamp": <epoch-ms>}
//! "<topic>_learned"    {"<learnedField>":  ["<key>"], "timestamp": <epoch-ms>}
//! "progress_overview"  {"topics": {"<topic>": {"learned": n, "total": m}}, "timestamp": <epoch-ms>}
//! ```
//!
//! The `read_*`/`write_*` methods report `CacheError`s. The short-named
//! accessors (`position`, `learned`, `save_*`) log and swallow them, which is
//! what lesson pages use: a broken cache is a cache miss, never a failure.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fsl_core::cache::{CacheEntry, LEARNED_TTL, POSITION_TTL};
use fsl_core::model::{ItemKey, LearnedSet, TopicDescriptor, TopicId};
use fsl_core::time::from_millis;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::session::{CacheError, SessionStore};

/// Key of the combined per-topic counts written by the overview page.
pub const OVERVIEW_KEY: &str = "progress_overview";

const TIMESTAMP_FIELD: &str = "timestamp";
const OVERVIEW_FIELD: &str = "topics";

#[must_use]
pub fn position_key(topic: &TopicId) -> String {
    format!("{topic}_position")
}

#[must_use]
pub fn learned_key(topic: &TopicId) -> String {
    format!("{topic}_learned")
}

/// Learned/total pair stored per topic in the combined overview record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicCount {
    pub learned: u32,
    pub total: u32,
}

pub type OverviewCounts = BTreeMap<String, TopicCount>;

fn encode<T: Serialize>(field: &str, value: &T, saved_at: DateTime<Utc>) -> Result<String, CacheError> {
    let value = serde_json::to_value(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
    let mut record = Map::with_capacity(2);
    record.insert(field.to_owned(), value);
    record.insert(TIMESTAMP_FIELD.to_owned(), Value::from(saved_at.timestamp_millis()));
    serde_json::to_string(&record).map_err(|e| CacheError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(key: &str, raw: &str, field: &str) -> Result<CacheEntry<T>, CacheError> {
    let corrupt = |reason: String| CacheError::Corrupt {
        key: key.to_owned(),
        reason,
    };

    let mut record: Map<String, Value> =
        serde_json::from_str(raw).map_err(|e| corrupt(e.to_string()))?;
    let value = record
        .remove(field)
        .ok_or_else(|| corrupt(format!("missing field {field}")))?;
    let value: T = serde_json::from_value(value).map_err(|e| corrupt(e.to_string()))?;
    let saved_at = record
        .get(TIMESTAMP_FIELD)
        .and_then(Value::as_i64)
        .and_then(from_millis)
        .ok_or_else(|| corrupt("missing or invalid timestamp".into()))?;

    Ok(CacheEntry::new(value, saved_at))
}

/// Local progress cache for lesson pages and the overview page.
#[derive(Clone)]
pub struct ProgressCache {
    store: Arc<dyn SessionStore>,
}

impl ProgressCache {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    fn read<T: DeserializeOwned>(&self, key: &str, field: &str) -> Result<Option<CacheEntry<T>>, CacheError> {
        match self.store.get(key)? {
            Some(raw) => decode(key, &raw, field).map(Some),
            None => Ok(None),
        }
    }

    /// Raw position record, regardless of age.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the store fails or the record is malformed.
    pub fn read_position(&self, topic: &TopicDescriptor) -> Result<Option<CacheEntry<ItemKey>>, CacheError> {
        self.read(&position_key(topic.id()), &topic.fields().position)
    }

    /// Raw learned-set record, regardless of age.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the store fails or the record is malformed.
    pub fn read_learned(&self, topic: &TopicDescriptor) -> Result<Option<CacheEntry<LearnedSet>>, CacheError> {
        self.read(&learned_key(topic.id()), &topic.fields().learned)
    }

    /// # Errors
    ///
    /// Returns `CacheError` if the record cannot be encoded or stored.
    pub fn write_position(
        &self,
        topic: &TopicDescriptor,
        key: &ItemKey,
        saved_at: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let record = encode(&topic.fields().position, key, saved_at)?;
        self.store.set(&position_key(topic.id()), &record)
    }

    /// # Errors
    ///
    /// Returns `CacheError` if the record cannot be encoded or stored.
    pub fn write_learned(
        &self,
        topic: &TopicDescriptor,
        learned: &LearnedSet,
        saved_at: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let record = encode(&topic.fields().learned, learned, saved_at)?;
        self.store.set(&learned_key(topic.id()), &record)
    }

    /// Position record still inside the 24h window; errors count as a miss.
    #[must_use]
    pub fn position(&self, topic: &TopicDescriptor, now: DateTime<Utc>) -> Option<CacheEntry<ItemKey>> {
        match self.read_position(topic) {
            Ok(entry) => entry.and_then(|e| e.fresh(POSITION_TTL, now)),
            Err(err) => {
                warn!(topic = %topic.id(), error = %err, "position cache unreadable, treating as miss");
                None
            }
        }
    }

    /// Learned-set record still inside the 1h window; errors count as a miss.
    #[must_use]
    pub fn learned(&self, topic: &TopicDescriptor, now: DateTime<Utc>) -> Option<CacheEntry<LearnedSet>> {
        match self.read_learned(topic) {
            Ok(entry) => entry.and_then(|e| e.fresh(LEARNED_TTL, now)),
            Err(err) => {
                warn!(topic = %topic.id(), error = %err, "learned cache unreadable, treating as miss");
                None
            }
        }
    }

    /// Best-effort position write. Returns whether it landed.
    pub fn save_position(&self, topic: &TopicDescriptor, key: &ItemKey, saved_at: DateTime<Utc>) -> bool {
        self.write_position(topic, key, saved_at)
            .map_err(|err| warn!(topic = %topic.id(), key = %key, error = %err, "failed to cache position"))
            .is_ok()
    }

    /// Best-effort learned-set write. Returns whether it landed.
    pub fn save_learned(&self, topic: &TopicDescriptor, learned: &LearnedSet, saved_at: DateTime<Utc>) -> bool {
        self.write_learned(topic, learned, saved_at)
            .map_err(|err| warn!(topic = %topic.id(), error = %err, "failed to cache learned set"))
            .is_ok()
    }

    /// # Errors
    ///
    /// Returns `CacheError` if the store fails or the record is malformed.
    pub fn read_overview(&self) -> Result<Option<CacheEntry<OverviewCounts>>, CacheError> {
        self.read(OVERVIEW_KEY, OVERVIEW_FIELD)
    }

    /// # Errors
    ///
    /// Returns `CacheError` if the record cannot be encoded or stored.
    pub fn write_overview(&self, counts: &OverviewCounts, saved_at: DateTime<Utc>) -> Result<(), CacheError> {
        let record = encode(OVERVIEW_FIELD, counts, saved_at)?;
        self.store.set(OVERVIEW_KEY, &record)
    }

    /// Combined counts inside the learned-set window; errors count as a miss.
    #[must_use]
    pub fn overview(&self, now: DateTime<Utc>) -> Option<CacheEntry<OverviewCounts>> {
        match self.read_overview() {
            Ok(entry) => entry.and_then(|e| e.fresh(LEARNED_TTL, now)),
            Err(err) => {
                warn!(error = %err, "overview cache unreadable, treating as miss");
                None
            }
        }
    }
}
