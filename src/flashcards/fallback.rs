//! Local fallback content used when a collaborator fails
//!
//! The fallback deck is deterministic: the same topic and count always produce the same
//! cards with the same ids.

use uuid::Uuid;

use super::models::{Card, CardDraft};

/// Number of cards used when a caller asks for zero
const DEFAULT_FALLBACK_COUNT: usize = 5;

/// Generic distractors for multiple choice when none can be generated
pub const FALLBACK_DISTRACTORS: [&str; 3] = [
    "This is another possible answer",
    "An alternative explanation",
    "A different concept",
];

const TEMPLATES: [(&str, &str); 5] = [
    ("What is the main concept of {}?", "This is a fundamental concept."),
    ("Why is {} important?", "It forms the foundation."),
    ("How does {} work?", "Through interconnected processes."),
    ("What are key components of {}?", "Essential elements."),
    ("When should you use {}?", "When applying this knowledge."),
];

/// Question / answer pairs for a topic, cycling through the templates
pub fn fallback_drafts(topic: &str, count: usize) -> Vec<CardDraft> {
    let topic = topic.trim();
    let topic = if topic.is_empty() { "this topic" } else { topic };
    let count = if count == 0 { DEFAULT_FALLBACK_COUNT } else { count };

    (0..count)
        .map(|i| {
            let (question, answer) = TEMPLATES[i % TEMPLATES.len()];
            CardDraft::new(question.replace("{}", topic), answer)
        })
        .collect()
}

/// Stable id of the `index`-th fallback card for `topic`
pub fn fallback_card_id(topic: &str, index: usize) -> Uuid {
    Uuid::new_v5(
        &Uuid::NAMESPACE_OID,
        format!("studyquest-fallback:{}:{}", topic.trim().to_lowercase(), index).as_bytes(),
    )
}

/// A full fallback deck with stable ids
pub fn fallback_deck(topic: &str, count: usize) -> Vec<Card> {
    fallback_drafts(topic, count)
        .into_iter()
        .enumerate()
        .map(|(i, draft)| Card::with_id(fallback_card_id(topic, i), draft.question, draft.answer))
        .collect()
}

pub fn fallback_distractors(count: usize) -> Vec<String> {
    FALLBACK_DISTRACTORS
        .iter()
        .take(count)
        .map(|s| s.to_string())
        .collect()
}
