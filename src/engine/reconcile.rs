//! Provisional vs confirmed progress
//!
//! XP shows up locally as soon as it is earned and is confirmed when the progress
//! service answers. The local path only adds `pending` entries; the durable path only
//! settles them and writes `confirmed`. A confirmed total always wins over the local
//! estimate.
//!
//! An award that failed or timed out may still have been recorded, so its XP only
//! counts until the service next reports a total. That total settles it either way.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::DurableAward;
use crate::progress::{LevelTable, UserProgress};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Confirmed {
    xp_total: u64,
    level: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    /// Last total reported by the progress service
    pub confirmed_xp: Option<u64>,
    pub confirmed_level: Option<u32>,
    /// XP earned locally that the service has not acknowledged
    pub provisional_xp: u64,
    pub estimated_xp: u64,
    pub estimated_level: u32,
    /// Awards still in flight
    pub in_flight: usize,
    /// Awards the service failed to record
    pub unconfirmed: usize,
}

#[derive(Debug, Clone)]
pub struct ProgressView {
    levels: LevelTable,
    confirmed: Option<Confirmed>,
    pending: HashMap<Uuid, u64>,
    failed: HashMap<Uuid, u64>,
}

impl ProgressView {
    pub fn new(levels: LevelTable) -> Self {
        Self {
            levels,
            confirmed: None,
            pending: HashMap::new(),
            failed: HashMap::new(),
        }
    }

    /// XP earned locally, to be confirmed under `award_id`
    pub fn record_local(&mut self, award_id: Uuid, amount: u64) {
        self.pending.insert(award_id, amount);
    }

    fn confirm(&mut self, xp_total: u64, level: u32) {
        // Server totals only grow, so a late answer to an older award never wins
        // over a newer one.
        let newer = self.confirmed.map_or(true, |c| xp_total >= c.xp_total);
        if newer {
            self.confirmed = Some(Confirmed { xp_total, level });
            if !self.failed.is_empty() {
                log::debug!(
                    "reconcile: {} unconfirmed awards settled by total {}",
                    self.failed.len(),
                    xp_total
                );
                self.failed.clear();
            }
        }
    }

    pub fn confirm_award(&mut self, award_id: Uuid, award: &DurableAward) {
        self.pending.remove(&award_id);
        self.failed.remove(&award_id);
        self.confirm(award.total_xp, award.level);
    }

    /// The service did not record the award; its XP stays provisional
    pub fn award_failed(&mut self, award_id: Uuid) {
        if let Some(amount) = self.pending.remove(&award_id) {
            self.failed.insert(award_id, amount);
        }
    }

    pub fn confirm_progress(&mut self, progress: &UserProgress) {
        self.confirm(progress.xp_total, progress.level);
    }

    pub fn confirmed_level(&self) -> Option<u32> {
        self.confirmed.map(|c| c.level)
    }

    pub fn estimated_xp(&self) -> u64 {
        let provisional: u64 = self.pending.values().chain(self.failed.values()).sum();
        self.confirmed.map_or(0, |c| c.xp_total) + provisional
    }

    /// Best local guess at a user's progress when the service cannot be asked
    pub fn estimate(&self, user_id: &str) -> UserProgress {
        let xp_total = self.estimated_xp();
        UserProgress {
            user_id: user_id.to_string(),
            xp_total,
            level: self.levels.level_for(xp_total),
            xp_to_next_level: self.levels.xp_to_next_level(xp_total),
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let estimated_xp = self.estimated_xp();
        ProgressSnapshot {
            confirmed_xp: self.confirmed.map(|c| c.xp_total),
            confirmed_level: self.confirmed.map(|c| c.level),
            provisional_xp: estimated_xp - self.confirmed.map_or(0, |c| c.xp_total),
            estimated_xp,
            estimated_level: self.levels.level_for(estimated_xp),
            in_flight: self.pending.len(),
            unconfirmed: self.failed.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn award(total_xp: u64, level: u32) -> DurableAward {
        DurableAward {
            xp_earned: 0,
            total_xp,
            level_up: false,
            level,
        }
    }

    #[test]
    fn test_local_xp_is_provisional_until_confirmed() {
        let mut view = ProgressView::new(LevelTable::default());
        let id = Uuid::new_v4();
        view.record_local(id, 60);
        assert_eq!(view.snapshot().provisional_xp, 60);
        assert_eq!(view.snapshot().in_flight, 1);

        view.confirm_award(id, &award(160, 2));
        let snapshot = view.snapshot();
        assert_eq!(snapshot.confirmed_xp, Some(160));
        assert_eq!(snapshot.provisional_xp, 0);
        assert_eq!(snapshot.estimated_level, 2);
    }

    #[test]
    fn test_server_total_wins_over_local_estimate() {
        let mut view = ProgressView::new(LevelTable::default());
        let id = Uuid::new_v4();
        view.record_local(id, 15);
        // The server knows about XP earned elsewhere
        view.confirm_award(id, &award(500, 4));
        assert_eq!(view.estimated_xp(), 500);
        assert_eq!(view.confirmed_level(), Some(4));
    }

    #[test]
    fn test_out_of_order_answers_keep_latest_total() {
        let mut view = ProgressView::new(LevelTable::default());
        let (first, second) = (Uuid::new_v4(), Uuid::new_v4());
        view.record_local(first, 10);
        view.record_local(second, 20);
        view.confirm_award(second, &award(30, 1));
        view.confirm_award(first, &award(10, 1));
        assert_eq!(view.snapshot().confirmed_xp, Some(30));
    }

    #[test]
    fn test_failed_awards_stay_provisional() {
        let mut view = ProgressView::new(LevelTable::default());
        let id = Uuid::new_v4();
        view.record_local(id, 120);
        view.award_failed(id);
        let snapshot = view.snapshot();
        assert_eq!(snapshot.in_flight, 0);
        assert_eq!(snapshot.unconfirmed, 1);
        assert_eq!(snapshot.estimated_xp, 120);
        assert_eq!(view.estimate("u").level, 2);
    }

    #[test]
    fn test_failed_award_settled_by_next_total() {
        let mut view = ProgressView::new(LevelTable::default());
        let id = Uuid::new_v4();
        view.record_local(id, 60);
        view.award_failed(id);

        // The service did record it after all
        view.confirm_progress(&UserProgress {
            user_id: "u".to_string(),
            xp_total: 60,
            level: 1,
            xp_to_next_level: 40,
        });
        let snapshot = view.snapshot();
        assert_eq!(snapshot.estimated_xp, 60);
        assert_eq!(snapshot.estimated_level, 1);
        assert_eq!(snapshot.unconfirmed, 0);
    }

    #[test]
    fn test_stale_total_keeps_failed_awards() {
        let mut view = ProgressView::new(LevelTable::default());
        view.confirm_progress(&UserProgress {
            user_id: "u".to_string(),
            xp_total: 100,
            level: 2,
            xp_to_next_level: 150,
        });
        let (failed, late) = (Uuid::new_v4(), Uuid::new_v4());
        view.record_local(failed, 60);
        view.award_failed(failed);

        view.record_local(late, 10);
        view.confirm_award(late, &award(40, 1));
        let snapshot = view.snapshot();
        assert_eq!(snapshot.confirmed_xp, Some(100));
        assert_eq!(snapshot.unconfirmed, 1);
        assert_eq!(snapshot.estimated_xp, 160);
    }
}
