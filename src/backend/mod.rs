//! External collaborators of the engine
//!
//! Card generation, distractor generation and durable XP awards are reached through
//! the async traits below. [`HttpBackend`] talks to the study service over HTTP,
//! [`LocalProgressService`] keeps progress in-process, and [`OfflineBackend`] refuses
//! every generation request so that sessions run on their local fallbacks.

pub mod http;
pub mod local;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::flashcards::CardDraft;
use crate::progress::{ProgressError, UserProgress};

pub use http::HttpBackend;
pub use local::{LocalProgressService, OfflineBackend};

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Service reported failure: {0}")]
    Service(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Progress(#[from] ProgressError),

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Timed out after {0} ms")]
    Timeout(u64),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, BackendError>;

/// Server answer to a durable XP award
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurableAward {
    pub xp_earned: u64,
    #[serde(rename = "totalXP")]
    pub total_xp: u64,
    pub level_up: bool,
    pub level: u32,
}

/// Produces question / answer pairs for a topic
#[async_trait]
pub trait CardSource: Send + Sync {
    /// May return fewer cards than asked for
    async fn generate_cards(&self, topic: &str, count: usize) -> Result<Vec<CardDraft>>;
}

/// Produces wrong answers for multiple choice
#[async_trait]
pub trait DistractorSource: Send + Sync {
    async fn generate_distractors(
        &self,
        question: &str,
        answer: &str,
        count: usize,
    ) -> Result<Vec<String>>;
}

/// The authority for a user's XP total
#[async_trait]
pub trait ProgressService: Send + Sync {
    async fn apply_xp(&self, user_id: &str, activity: &str, amount: u64) -> Result<DurableAward>;

    async fn get_progress(&self, user_id: &str) -> Result<UserProgress>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_durable_award_wire_names() {
        let award: DurableAward =
            serde_json::from_str(r#"{"xpEarned": 23, "totalXP": 123, "levelUp": true, "level": 2}"#)
                .unwrap();
        assert_eq!(award.total_xp, 123);
        assert!(award.level_up);
        let json = serde_json::to_value(&award).unwrap();
        assert_eq!(json["totalXP"], 123);
        assert_eq!(json["xpEarned"], 23);
    }
}
