//! Built-in lesson topics.
//!
//! Only the shape matters to the progress protocol; the descriptions are
//! placeholders for the content team's vocabulary lists.

use crate::model::{CacheFieldNames, TopicDescriptor, TopicError, TopicId, TopicItem};

fn media(topic: &str, key: &str) -> String {
    format!("videos/{topic}/{}.mp4", key.to_lowercase().replace(' ', "_"))
}

fn build(
    id: &str,
    title: &str,
    position_field: &str,
    learned_field: &str,
    entries: &[(&str, &str)],
) -> Result<TopicDescriptor, TopicError> {
    let items = entries
        .iter()
        .map(|(key, description)| TopicItem::new(*key, *description, media(id, key)))
        .collect();
    TopicDescriptor::new(
        TopicId::new(id),
        title,
        items,
        CacheFieldNames::new(position_field, learned_field),
    )
}

/// Fingerspelled alphabet, `A` through `Z`.
///
/// # Errors
///
/// Never in practice; the letters are unique.
pub fn alphabet() -> Result<TopicDescriptor, TopicError> {
    let letters: Vec<String> = ('A'..='Z').map(String::from).collect();
    let descriptions: Vec<String> = letters
        .iter()
        .map(|l| format!("Fingerspelling for the letter {l}"))
        .collect();
    let entries: Vec<(&str, &str)> = letters
        .iter()
        .zip(&descriptions)
        .map(|(l, d)| (l.as_str(), d.as_str()))
        .collect();
    build("alphabet", "Alphabet", "currentLetter", "learnedLetters", &entries)
}

/// Numbers one to ten.
///
/// # Errors
///
/// Never in practice; the keys are unique.
pub fn numbers() -> Result<TopicDescriptor, TopicError> {
    build(
        "numbers",
        "Numbers",
        "currentNumber",
        "learnedNumbers",
        &[
            ("1", "Isa"),
            ("2", "Dalawa"),
            ("3", "Tatlo"),
            ("4", "Apat"),
            ("5", "Lima"),
            ("6", "Anim"),
            ("7", "Pito"),
            ("8", "Walo"),
            ("9", "Siyam"),
            ("10", "Sampu"),
        ],
    )
}

/// # Errors
///
/// Never in practice; the keys are unique.
pub fn greetings() -> Result<TopicDescriptor, TopicError> {
    build(
        "greetings",
        "Greetings",
        "currentGreeting",
        "learnedGreetings",
        &[
            ("Hello", "Kumusta"),
            ("Good Morning", "Magandang umaga"),
            ("Good Afternoon", "Magandang hapon"),
            ("Good Evening", "Magandang gabi"),
            ("Thank You", "Salamat"),
            ("Goodbye", "Paalam"),
        ],
    )
}

/// # Errors
///
/// Never in practice; the keys are unique.
pub fn family() -> Result<TopicDescriptor, TopicError> {
    build(
        "family",
        "Family Members",
        "currentMember",
        "learnedMembers",
        &[
            ("Mother", "Nanay"),
            ("Father", "Tatay"),
            ("Sister", "Ate"),
            ("Brother", "Kuya"),
            ("Grandmother", "Lola"),
            ("Grandfather", "Lolo"),
            ("Baby", "Sanggol"),
        ],
    )
}

/// # Errors
///
/// Never in practice; the keys are unique.
pub fn colors() -> Result<TopicDescriptor, TopicError> {
    build(
        "colors",
        "Colors",
        "currentColor",
        "learnedColors",
        &[
            ("Red", "Pula"),
            ("Blue", "Asul"),
            ("Yellow", "Dilaw"),
            ("Green", "Berde"),
            ("White", "Puti"),
            ("Black", "Itim"),
        ],
    )
}

/// Every built-in topic in menu order.
///
/// # Errors
///
/// Returns the first `TopicError` raised while building a descriptor.
pub fn builtin_topics() -> Result<Vec<TopicDescriptor>, TopicError> {
    Ok(vec![alphabet()?, numbers()?, greetings()?, family()?, colors()?])
}
