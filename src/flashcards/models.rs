//! Data models for study cards

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Self-assessed difficulty of a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Difficulty {
    /// Never graded in this session
    New,
    Hard,
    Medium,
    Easy,
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::New
    }
}

impl Difficulty {
    /// Map a UI rating (1 = Hard, 2 = Medium, 3 = Easy) to a difficulty
    pub fn from_rating(rating: u8) -> Option<Self> {
        match rating {
            1 => Some(Self::Hard),
            2 => Some(Self::Medium),
            3 => Some(Self::Easy),
            _ => None,
        }
    }
}

/// A question / answer pair as returned by a card source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDraft {
    pub question: String,
    pub answer: String,
}

impl CardDraft {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// A card taking part in a study session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Number of grades this card received in the session
    #[serde(default)]
    pub review_count: u32,
}

impl Card {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), question, answer)
    }

    pub fn with_id(id: Uuid, question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            id,
            question: question.into(),
            answer: answer.into(),
            difficulty: Difficulty::New,
            review_count: 0,
        }
    }

    pub fn from_draft(draft: CardDraft) -> Self {
        Self::new(draft.question, draft.answer)
    }
}
