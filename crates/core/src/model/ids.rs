use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a lesson topic (e.g. `alphabet`, `numbers`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicId(String);

impl TopicId {
    /// Creates a new `TopicId` from trusted content configuration.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Stable content identifier of a lesson item (a letter, a number, a term).
///
/// Never a positional index: items are looked up by key so saved positions
/// survive reordering of topic content.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemKey(String);

impl ItemKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Opaque identity of the signed-in user, as handed over by the auth provider.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    #[must_use]
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of a quiz; shares the progress namespace with topics.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuizId(String);

impl QuizId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The quiz paired with a lesson topic (`numbers` -> `numbers_quiz`).
    #[must_use]
    pub fn for_topic(topic: &TopicId) -> Self {
        Self(format!("{}_quiz", topic.as_str()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TopicId({})", self.0)
    }
}

impl fmt::Debug for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemKey({})", self.0)
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Debug for QuizId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuizId({})", self.0)
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for QuizId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── FromStr Implementations ───────────────────────────────────────────────────

/// Error type for parsing an identifier from user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
    reason: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.kind, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// Ids end up as document path segments, so they must be non-empty and slash-free.
fn check_segment(kind: &'static str, s: &str) -> Result<String, ParseIdError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(ParseIdError {
            kind,
            reason: "empty",
        });
    }
    if trimmed.contains('/') {
        return Err(ParseIdError {
            kind,
            reason: "contains '/'",
        });
    }
    Ok(trimmed.to_owned())
}

impl FromStr for TopicId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        check_segment("TopicId", s).map(Self)
    }
}

impl FromStr for ItemKey {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        check_segment("ItemKey", s).map(Self)
    }
}

impl FromStr for UserId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        check_segment("UserId", s).map(Self)
    }
}

impl FromStr for QuizId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        check_segment("QuizId", s).map(Self)
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_id_display() {
        let id = TopicId::new("numbers");
        assert_eq!(id.to_string(), "numbers");
    }

    #[test]
    fn user_id_from_str_trims() {
        let id: UserId = "  uid-42 ".parse().unwrap();
        assert_eq!(id, UserId::new("uid-42"));
    }

    #[test]
    fn empty_ids_are_rejected() {
        assert!("".parse::<TopicId>().is_err());
        assert!("   ".parse::<UserId>().is_err());
    }

    #[test]
    fn slashes_are_rejected() {
        let err = "users/x".parse::<UserId>().unwrap_err();
        assert_eq!(err.to_string(), "failed to parse UserId: contains '/'");
    }

    #[test]
    fn quiz_id_derives_from_topic() {
        let quiz = QuizId::for_topic(&TopicId::new("alphabet"));
        assert_eq!(quiz.as_str(), "alphabet_quiz");
    }

    #[test]
    fn item_key_serializes_as_plain_string() {
        let json = serde_json::to_string(&ItemKey::new("7")).unwrap();
        assert_eq!(json, "\"7\"");
    }
}
