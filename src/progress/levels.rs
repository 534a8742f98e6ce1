//! Level threshold table
//!
//! `threshold(L)` is the cumulative XP at which level `L` starts. Level 1 always
//! starts at 0 XP. The level of a user is the largest `L` whose threshold is not above
//! their total.

use serde::{Deserialize, Serialize};

use super::storage::{ProgressError, Result};

pub const DEFAULT_THRESHOLDS: [u64; 8] = [0, 100, 250, 450, 700, 1000, 1400, 1900];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u64>", into = "Vec<u64>")]
pub struct LevelTable {
    thresholds: Vec<u64>,
}

impl LevelTable {
    /// Build a table from ascending thresholds, the first of which must be 0
    pub fn new(thresholds: Vec<u64>) -> Result<Self> {
        if thresholds.first() != Some(&0) {
            return Err(ProgressError::InvalidThresholds(
                "the first threshold must be 0".to_string(),
            ));
        }
        if thresholds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ProgressError::InvalidThresholds(
                "thresholds must be strictly ascending".to_string(),
            ));
        }
        Ok(Self { thresholds })
    }

    /// XP at which `level` starts, `None` past the table
    pub fn threshold(&self, level: u32) -> Option<u64> {
        if level == 0 {
            return None;
        }
        self.thresholds.get(level as usize - 1).copied()
    }

    pub fn max_level(&self) -> u32 {
        self.thresholds.len() as u32
    }

    pub fn level_for(&self, xp_total: u64) -> u32 {
        // Thresholds are ascending, so the count of thresholds <= xp is the level.
        self.thresholds.partition_point(|&t| t <= xp_total) as u32
    }

    /// XP still missing for the next level, 0 at the top of the table
    pub fn xp_to_next_level(&self, xp_total: u64) -> u64 {
        let level = self.level_for(xp_total);
        self.threshold(level + 1)
            .map(|next| next - xp_total)
            .unwrap_or(0)
    }
}

impl Default for LevelTable {
    fn default() -> Self {
        Self {
            thresholds: DEFAULT_THRESHOLDS.to_vec(),
        }
    }
}

impl TryFrom<Vec<u64>> for LevelTable {
    type Error = ProgressError;

    fn try_from(thresholds: Vec<u64>) -> Result<Self> {
        Self::new(thresholds)
    }
}

impl From<LevelTable> for Vec<u64> {
    fn from(table: LevelTable) -> Self {
        table.thresholds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for() {
        let table = LevelTable::default();
        assert_eq!(table.level_for(0), 1);
        assert_eq!(table.level_for(99), 1);
        assert_eq!(table.level_for(100), 2);
        assert_eq!(table.level_for(449), 3);
        assert_eq!(table.level_for(450), 4);
        assert_eq!(table.level_for(1_000_000), 8);
    }

    #[test]
    fn test_level_matches_definition() {
        let table = LevelTable::default();
        for xp in 0..2500u64 {
            let level = table.level_for(xp);
            assert!(table.threshold(level).unwrap() <= xp);
            if let Some(next) = table.threshold(level + 1) {
                assert!(next > xp);
            }
        }
    }

    #[test]
    fn test_xp_to_next_level() {
        let table = LevelTable::default();
        assert_eq!(table.xp_to_next_level(40), 60);
        assert_eq!(table.xp_to_next_level(100), 150);
        assert_eq!(table.xp_to_next_level(5000), 0);
    }

    #[test]
    fn test_rejects_bad_tables() {
        assert!(LevelTable::new(vec![]).is_err());
        assert!(LevelTable::new(vec![10, 20]).is_err());
        assert!(LevelTable::new(vec![0, 50, 50]).is_err());
        assert!(LevelTable::new(vec![0, 10]).is_ok());
    }

    #[test]
    fn test_deserialize_validates() {
        let table: LevelTable = serde_json::from_str("[0, 10, 30]").unwrap();
        assert_eq!(table.max_level(), 3);
        assert!(serde_json::from_str::<LevelTable>("[5, 10]").is_err());
    }
}
