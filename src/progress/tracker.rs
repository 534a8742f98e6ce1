//! Progression tracker
//!
//! The tracker is the authority for a user's XP total. Level and unlocks are derived
//! from that total through the level table on every read, so they can never drift
//! from it. `apply_xp` is the only mutation and runs under a lock, which keeps the
//! read-modify-write of a record atomic.

use std::sync::Mutex;

use chrono::Utc;

use super::levels::LevelTable;
use super::models::{LeaderboardEntry, ProgressRecord, UserProgress, XpApplication};
use super::storage::{ProgressStorage, Result};
use crate::techniques::unlocked_between;

pub struct ProgressTracker {
    storage: ProgressStorage,
    levels: LevelTable,
    write_lock: Mutex<()>,
}

impl ProgressTracker {
    pub fn new(storage: ProgressStorage, levels: LevelTable) -> Self {
        Self {
            storage,
            levels,
            write_lock: Mutex::new(()),
        }
    }

    pub fn levels(&self) -> &LevelTable {
        &self.levels
    }

    fn project(&self, user_id: &str, xp_total: u64) -> UserProgress {
        UserProgress {
            user_id: user_id.to_string(),
            xp_total,
            level: self.levels.level_for(xp_total),
            xp_to_next_level: self.levels.xp_to_next_level(xp_total),
        }
    }

    /// Current progress of a user. Never writes; an unknown user reads as zero XP.
    pub fn get_progress(&self, user_id: &str) -> Result<UserProgress> {
        let xp_total = self
            .storage
            .load(user_id)?
            .map(|record| record.xp_total)
            .unwrap_or(0);
        Ok(self.project(user_id, xp_total))
    }

    /// Add `amount` XP to a user's total
    pub fn apply_xp(&self, user_id: &str, amount: u64) -> Result<XpApplication> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut record = self
            .storage
            .load(user_id)?
            .unwrap_or_else(|| ProgressRecord::new(user_id));

        let level_before = self.levels.level_for(record.xp_total);
        record.xp_total = record.xp_total.saturating_add(amount);
        record.updated_at = Utc::now();
        self.storage.save(&record)?;

        let level = self.levels.level_for(record.xp_total);
        let newly_unlocked = unlocked_between(level_before, level);

        if level > level_before {
            log::info!(
                "progress: {} reached level {} ({} XP), unlocked {:?}",
                user_id,
                level,
                record.xp_total,
                newly_unlocked
            );
        } else {
            log::debug!("progress: {} +{} XP -> {}", user_id, amount, record.xp_total);
        }

        Ok(XpApplication {
            xp_total: record.xp_total,
            level,
            leveled_up: level > level_before,
            newly_unlocked,
        })
    }

    /// Top users by XP, ranked from 1
    pub fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        let mut records = self.storage.list()?;
        records.sort_by(|a, b| {
            b.xp_total
                .cmp(&a.xp_total)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });

        Ok(records
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(i, record)| LeaderboardEntry {
                rank: i + 1,
                level: self.levels.level_for(record.xp_total),
                user_id: record.user_id,
                xp_total: record.xp_total,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::techniques::TechniqueId;
    use tempfile::TempDir;

    fn create_test_tracker() -> (ProgressTracker, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = ProgressStorage::new(temp_dir.path().to_path_buf()).unwrap();
        (ProgressTracker::new(storage, LevelTable::default()), temp_dir)
    }

    #[test]
    fn test_level_up_scenario() {
        let (tracker, _temp) = create_test_tracker();
        tracker.apply_xp("user", 40).unwrap();

        let result = tracker.apply_xp("user", 60).unwrap();
        assert_eq!(result.xp_total, 100);
        assert_eq!(result.level, 2);
        assert!(result.leveled_up);
        assert_eq!(result.newly_unlocked, vec![TechniqueId::MultipleChoice]);
    }

    #[test]
    fn test_order_independent_totals() {
        let orders: [[u64; 3]; 6] = [
            [10, 20, 5],
            [10, 5, 20],
            [20, 10, 5],
            [20, 5, 10],
            [5, 10, 20],
            [5, 20, 10],
        ];
        let mut outcomes = Vec::new();
        for order in orders {
            let (tracker, _temp) = create_test_tracker();
            for amount in order {
                tracker.apply_xp("u", amount).unwrap();
            }
            let progress = tracker.get_progress("u").unwrap();
            outcomes.push((progress.xp_total, progress.level));
        }
        assert!(outcomes.iter().all(|o| *o == (35, 1)));
    }

    #[test]
    fn test_get_progress_is_idempotent() {
        let (tracker, temp) = create_test_tracker();
        let first = tracker.get_progress("newcomer").unwrap();
        let second = tracker.get_progress("newcomer").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.level, 1);
        assert_eq!(first.xp_to_next_level, 100);
        // Reading must not create a record
        assert!(!temp.path().join("progress").join("newcomer.json").exists());

        tracker.apply_xp("newcomer", 260).unwrap();
        let third = tracker.get_progress("newcomer").unwrap();
        assert_eq!(third, tracker.get_progress("newcomer").unwrap());
        assert_eq!(third.level, 3);
    }

    #[test]
    fn test_multi_level_jump_unlocks_all_between() {
        let (tracker, _temp) = create_test_tracker();
        let result = tracker.apply_xp("u", 460).unwrap();
        assert_eq!(result.level, 4);
        assert_eq!(
            result.newly_unlocked,
            vec![
                TechniqueId::MultipleChoice,
                TechniqueId::Pomodoro,
                TechniqueId::SpacedRepetition
            ]
        );

        let again = tracker.apply_xp("u", 10).unwrap();
        assert!(!again.leveled_up);
        assert!(again.newly_unlocked.is_empty());
    }

    #[test]
    fn test_leaderboard() {
        let (tracker, _temp) = create_test_tracker();
        tracker.apply_xp("ann", 300).unwrap();
        tracker.apply_xp("ben", 900).unwrap();
        tracker.apply_xp("cat", 50).unwrap();

        let board = tracker.leaderboard(2).unwrap();
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].user_id, "ben");
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[0].level, 5);
        assert_eq!(board[1].user_id, "ann");
    }
}
