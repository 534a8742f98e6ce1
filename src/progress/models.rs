//! Progress tracking data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::techniques::TechniqueId;

/// What is persisted per user. Only the XP total is durable; level is always derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub user_id: String,
    pub xp_total: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProgressRecord {
    pub fn new(user_id: &str) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.to_string(),
            xp_total: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A user's progress as seen by callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub user_id: String,
    pub xp_total: u64,
    pub level: u32,
    pub xp_to_next_level: u64,
}

/// Result of applying an XP amount to a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XpApplication {
    pub xp_total: u64,
    pub level: u32,
    pub leveled_up: bool,
    pub newly_unlocked: Vec<TechniqueId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: String,
    pub xp_total: u64,
    pub level: u32,
}
