//! In-process collaborators

use std::sync::Arc;

use async_trait::async_trait;

use super::{BackendError, CardSource, DistractorSource, DurableAward, ProgressService, Result};
use crate::flashcards::CardDraft;
use crate::progress::{ProgressTracker, UserProgress};

/// Progress service backed by the local tracker. File I/O runs on the blocking pool.
#[derive(Clone)]
pub struct LocalProgressService {
    tracker: Arc<ProgressTracker>,
}

impl LocalProgressService {
    pub fn new(tracker: Arc<ProgressTracker>) -> Self {
        Self { tracker }
    }

    pub fn tracker(&self) -> &Arc<ProgressTracker> {
        &self.tracker
    }
}

#[async_trait]
impl ProgressService for LocalProgressService {
    async fn apply_xp(&self, user_id: &str, activity: &str, amount: u64) -> Result<DurableAward> {
        let tracker = Arc::clone(&self.tracker);
        let user_id = user_id.to_string();
        let application =
            tokio::task::spawn_blocking(move || tracker.apply_xp(&user_id, amount)).await??;

        log::debug!("backend: {} XP for {} recorded locally", amount, activity);
        Ok(DurableAward {
            xp_earned: amount,
            total_xp: application.xp_total,
            level_up: application.leveled_up,
            level: application.level,
        })
    }

    async fn get_progress(&self, user_id: &str) -> Result<UserProgress> {
        let tracker = Arc::clone(&self.tracker);
        let user_id = user_id.to_string();
        Ok(tokio::task::spawn_blocking(move || tracker.get_progress(&user_id)).await??)
    }
}

/// Card and distractor source for when no service is reachable. Every request fails,
/// which makes sessions use their deterministic fallbacks.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineBackend;

#[async_trait]
impl CardSource for OfflineBackend {
    async fn generate_cards(&self, _topic: &str, _count: usize) -> Result<Vec<CardDraft>> {
        Err(BackendError::Unavailable("offline".to_string()))
    }
}

#[async_trait]
impl DistractorSource for OfflineBackend {
    async fn generate_distractors(
        &self,
        _question: &str,
        _answer: &str,
        _count: usize,
    ) -> Result<Vec<String>> {
        Err(BackendError::Unavailable("offline".to_string()))
    }
}
