use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::ItemKey;
use crate::model::learned::{LearnedSet, completion_percentage};

/// Per-user, per-topic progress document held by the remote store.
///
/// Field names follow the stored document (`learnedItems`, `lastViewedItem`, ...).
/// Every field is optional on read so partially written documents still load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteProgress {
    pub learned_items: LearnedSet,
    pub completed: u32,
    pub total: u32,
    pub percentage: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_viewed_item: Option<ItemKey>,
    #[serde(
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_updated: Option<DateTime<Utc>>,
}

impl RemoteProgress {
    /// Document written on a user's first visit to a topic.
    #[must_use]
    pub fn bootstrap(
        learned: LearnedSet,
        total: u32,
        last_viewed_item: ItemKey,
        now: DateTime<Utc>,
    ) -> Self {
        let completed = learned.completed();
        Self {
            percentage: completion_percentage(completed, total),
            learned_items: learned,
            completed,
            total,
            last_viewed_item: Some(last_viewed_item),
            last_updated: Some(now),
        }
    }
}

/// Fields merge-written after a learn event. `total` is deliberately absent:
/// it belongs to the document, not to the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub learned_items: LearnedSet,
    pub completed: u32,
    pub percentage: u32,
    pub last_viewed_item: ItemKey,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_updated: DateTime<Utc>,
}

impl ProgressUpdate {
    #[must_use]
    pub fn new(learned: LearnedSet, total: u32, last_viewed_item: ItemKey, now: DateTime<Utc>) -> Self {
        let completed = learned.completed();
        Self {
            percentage: completion_percentage(completed, total),
            learned_items: learned,
            completed,
            last_viewed_item,
            last_updated: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn update_computes_completed_and_percentage() {
        let learned: LearnedSet = vec![ItemKey::new("1"), ItemKey::new("2"), ItemKey::new("3")].into();
        let update = ProgressUpdate::new(learned, 10, ItemKey::new("4"), fixed_now());
        assert_eq!(update.completed, 3);
        assert_eq!(update.percentage, 30);
    }

    #[test]
    fn update_serializes_with_document_field_names() {
        let update = ProgressUpdate::new(LearnedSet::new(), 5, ItemKey::new("A"), fixed_now());
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["lastViewedItem"], "A");
        assert_eq!(json["lastUpdated"], 1_700_000_000_000_i64);
        assert!(json.get("total").is_none());
    }

    #[test]
    fn partial_document_loads_with_defaults() {
        let doc: RemoteProgress =
            serde_json::from_str(r#"{"learnedItems":["A"],"lastViewedItem":"B"}"#).unwrap();
        assert_eq!(doc.learned_items.len(), 1);
        assert_eq!(doc.total, 0);
        assert_eq!(doc.last_updated, None);
        assert_eq!(doc.last_viewed_item, Some(ItemKey::new("B")));
    }
}
