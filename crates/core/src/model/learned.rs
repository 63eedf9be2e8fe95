use serde::{Deserialize, Serialize};

use crate::model::ids::ItemKey;

/// Set of learned item keys, kept in the order they were learned.
///
/// Insertion is idempotent. Serializes as a plain JSON array; duplicates in
/// persisted input are collapsed on load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ItemKey>", into = "Vec<ItemKey>")]
pub struct LearnedSet {
    keys: Vec<ItemKey>,
}

impl LearnedSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key. Returns `false` if it was already present.
    pub fn insert(&mut self, key: ItemKey) -> bool {
        if self.keys.contains(&key) {
            return false;
        }
        self.keys.push(key);
        true
    }

    #[must_use]
    pub fn contains(&self, key: &ItemKey) -> bool {
        self.keys.contains(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemKey> {
        self.keys.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[ItemKey] {
        &self.keys
    }

    /// Union `other` into `self`, returning how many keys were new.
    pub fn union_with(&mut self, other: &LearnedSet) -> usize {
        other
            .keys
            .iter()
            .filter(|key| self.insert((*key).clone()))
            .count()
    }

    /// Whether every key of `self` is also in `other`.
    #[must_use]
    pub fn is_subset(&self, other: &LearnedSet) -> bool {
        self.keys.iter().all(|key| other.contains(key))
    }

    /// Completed count as stored in remote documents.
    #[must_use]
    pub fn completed(&self) -> u32 {
        u32::try_from(self.keys.len()).unwrap_or(u32::MAX)
    }
}

impl From<Vec<ItemKey>> for LearnedSet {
    fn from(keys: Vec<ItemKey>) -> Self {
        keys.into_iter().collect()
    }
}

impl From<LearnedSet> for Vec<ItemKey> {
    fn from(set: LearnedSet) -> Self {
        set.keys
    }
}

impl FromIterator<ItemKey> for LearnedSet {
    fn from_iter<I: IntoIterator<Item = ItemKey>>(iter: I) -> Self {
        let mut set = Self::new();
        for key in iter {
            set.insert(key);
        }
        set
    }
}

impl<'a> IntoIterator for &'a LearnedSet {
    type Item = &'a ItemKey;
    type IntoIter = std::slice::Iter<'a, ItemKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}

/// `round(100 * completed / total)` with halves rounded up; `0` for an empty topic.
#[must_use]
pub fn completion_percentage(completed: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let completed = u64::from(completed.min(total));
    let total = u64::from(total);
    let pct = (200 * completed + total) / (2 * total);
    u32::try_from(pct).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(k: &str) -> ItemKey {
        ItemKey::new(k)
    }

    #[test]
    fn insert_is_idempotent() {
        let mut set = LearnedSet::new();
        assert!(set.insert(key("A")));
        assert!(!set.insert(key("A")));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn union_keeps_order_and_counts_new_keys() {
        let mut local: LearnedSet = vec![key("1"), key("2")].into();
        let remote: LearnedSet = vec![key("2"), key("5")].into();
        assert_eq!(local.union_with(&remote), 1);
        assert_eq!(local.as_slice(), &[key("1"), key("2"), key("5")]);
    }

    #[test]
    fn deserializing_collapses_duplicates() {
        let set: LearnedSet = serde_json::from_str(r#"["A","B","A"]"#).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["A","B"]"#);
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(completion_percentage(0, 10), 0);
        assert_eq!(completion_percentage(1, 8), 13);
        assert_eq!(completion_percentage(1, 3), 33);
        assert_eq!(completion_percentage(2, 3), 67);
        assert_eq!(completion_percentage(10, 10), 100);
        assert_eq!(completion_percentage(3, 0), 0);
    }

    #[test]
    fn percentage_caps_at_total() {
        assert_eq!(completion_percentage(12, 10), 100);
    }
}
