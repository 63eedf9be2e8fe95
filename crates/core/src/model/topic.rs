use std::collections::HashSet;

use thiserror::Error;

use crate::model::ids::{ItemKey, QuizId, TopicId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TopicError {
    #[error("topic must contain at least one item")]
    Empty,

    #[error("duplicate item key: {0}")]
    DuplicateKey(String),

    #[error("item key cannot be blank")]
    BlankKey,

    #[error("cache field name is invalid: {0:?}")]
    InvalidFieldName(String),
}

//
// ─── ITEMS ─────────────────────────────────────────────────────────────────────
//

/// One flashcard of a lesson: a stable key plus what the page shows for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicItem {
    key: ItemKey,
    description: String,
    media: String,
}

impl TopicItem {
    #[must_use]
    pub fn new(key: impl Into<String>, description: impl Into<String>, media: impl Into<String>) -> Self {
        Self {
            key: ItemKey::new(key),
            description: description.into(),
            media: media.into(),
        }
    }

    #[must_use]
    pub fn key(&self) -> &ItemKey {
        &self.key
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Reference to the sign demonstration video.
    #[must_use]
    pub fn media(&self) -> &str {
        &self.media
    }
}

/// Names of the JSON fields used for this topic's session cache records,
/// e.g. `currentLetter` / `learnedLetters` for the alphabet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheFieldNames {
    pub position: String,
    pub learned: String,
}

impl CacheFieldNames {
    #[must_use]
    pub fn new(position: impl Into<String>, learned: impl Into<String>) -> Self {
        Self {
            position: position.into(),
            learned: learned.into(),
        }
    }
}

//
// ─── DESCRIPTOR ────────────────────────────────────────────────────────────────
//

/// Static description of a lesson topic: ordered items plus cache field names.
///
/// Everything the progress protocol needs to know about a topic lives here, so a
/// single engine serves every lesson page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicDescriptor {
    id: TopicId,
    title: String,
    items: Vec<TopicItem>,
    fields: CacheFieldNames,
}

impl TopicDescriptor {
    /// Build a validated descriptor.
    ///
    /// # Errors
    ///
    /// Returns `TopicError::Empty` for an item-less topic, `TopicError::BlankKey`
    /// or `TopicError::DuplicateKey` if keys are not unique non-blank strings, and
    /// `TopicError::InvalidFieldName` if a cache field name is blank, collides
    /// with `timestamp`, or both names are equal.
    pub fn new(
        id: TopicId,
        title: impl Into<String>,
        items: Vec<TopicItem>,
        fields: CacheFieldNames,
    ) -> Result<Self, TopicError> {
        if items.is_empty() {
            return Err(TopicError::Empty);
        }

        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if item.key.as_str().trim().is_empty() {
                return Err(TopicError::BlankKey);
            }
            if !seen.insert(item.key.as_str()) {
                return Err(TopicError::DuplicateKey(item.key.to_string()));
            }
        }

        for name in [&fields.position, &fields.learned] {
            if name.trim().is_empty() || name == "timestamp" {
                return Err(TopicError::InvalidFieldName(name.clone()));
            }
        }
        if fields.position == fields.learned {
            return Err(TopicError::InvalidFieldName(fields.learned));
        }

        Ok(Self {
            id,
            title: title.into(),
            items,
            fields,
        })
    }

    #[must_use]
    pub fn id(&self) -> &TopicId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn items(&self) -> &[TopicItem] {
        &self.items
    }

    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn item(&self, index: usize) -> Option<&TopicItem> {
        self.items.get(index)
    }

    /// Current index of an item, looked up by identity.
    #[must_use]
    pub fn index_of(&self, key: &ItemKey) -> Option<usize> {
        self.items.iter().position(|item| &item.key == key)
    }

    #[must_use]
    pub fn fields(&self) -> &CacheFieldNames {
        &self.fields
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        QuizId::for_topic(&self.id)
    }
}
