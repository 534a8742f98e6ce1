//! Storage operations for user progress
//!
//! Directory structure:
//! ```text
//! {data_dir}/progress/
//! └── {user-id}.json   # ProgressRecord
//! ```

use std::fs;
use std::path::PathBuf;

use thiserror::Error;

use super::models::ProgressRecord;

#[derive(Error, Debug)]
pub enum ProgressError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid user id: {0:?}")]
    InvalidUserId(String),

    #[error("Invalid level thresholds: {0}")]
    InvalidThresholds(String),
}

pub type Result<T> = std::result::Result<T, ProgressError>;

/// Storage manager for per-user progress records
pub struct ProgressStorage {
    progress_dir: PathBuf,
}

impl ProgressStorage {
    /// Create storage rooted at `data_dir`, creating the progress directory
    pub fn new(data_dir: PathBuf) -> Result<Self> {
        let progress_dir = data_dir.join("progress");
        fs::create_dir_all(&progress_dir)?;
        Ok(Self { progress_dir })
    }

    /// User ids become file names, so only a conservative character set is allowed
    fn validate_user_id(user_id: &str) -> Result<()> {
        let valid = !user_id.is_empty()
            && user_id.len() <= 128
            && !user_id.starts_with('.')
            && user_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if valid {
            Ok(())
        } else {
            Err(ProgressError::InvalidUserId(user_id.to_string()))
        }
    }

    /// Get the path to a user's progress file
    fn record_path(&self, user_id: &str) -> Result<PathBuf> {
        Self::validate_user_id(user_id)?;
        Ok(self.progress_dir.join(format!("{}.json", user_id)))
    }

    /// Load a user's record, `None` if the user has never earned XP
    pub fn load(&self, user_id: &str) -> Result<Option<ProgressRecord>> {
        let path = self.record_path(user_id)?;
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        let record: ProgressRecord = serde_json::from_str(&content)?;
        Ok(Some(record))
    }

    /// Write a user's record
    pub fn save(&self, record: &ProgressRecord) -> Result<()> {
        let path = self.record_path(&record.user_id)?;
        fs::write(&path, serde_json::to_string_pretty(record)?)?;
        Ok(())
    }

    /// List every stored record
    pub fn list(&self) -> Result<Vec<ProgressRecord>> {
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.progress_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                let content = fs::read_to_string(&path)?;
                match serde_json::from_str::<ProgressRecord>(&content) {
                    Ok(record) => records.push(record),
                    Err(e) => log::warn!("progress: skipping unreadable record {:?}: {}", path, e),
                }
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_storage() -> (ProgressStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = ProgressStorage::new(temp_dir.path().to_path_buf()).unwrap();
        (storage, temp_dir)
    }

    #[test]
    fn test_save_and_load() {
        let (storage, _temp) = create_test_storage();
        assert!(storage.load("alice").unwrap().is_none());

        let mut record = ProgressRecord::new("alice");
        record.xp_total = 120;
        storage.save(&record).unwrap();

        let loaded = storage.load("alice").unwrap().unwrap();
        assert_eq!(loaded, record);
        assert_eq!(storage.list().unwrap().len(), 1);
    }

    #[test]
    fn test_rejects_path_like_user_ids() {
        let (storage, _temp) = create_test_storage();
        for bad in ["", "../etc", "a/b", ".hidden"] {
            assert!(matches!(
                storage.load(bad),
                Err(ProgressError::InvalidUserId(_))
            ));
        }
    }

    #[test]
    fn test_stored_level_field_is_ignored() {
        let (storage, temp) = create_test_storage();
        let json = r#"{
            "userId": "bob",
            "xpTotal": 40,
            "level": 9,
            "createdAt": "2025-01-01T00:00:00Z",
            "updatedAt": "2025-01-01T00:00:00Z"
        }"#;
        fs::write(temp.path().join("progress").join("bob.json"), json).unwrap();

        let record = storage.load("bob").unwrap().unwrap();
        assert_eq!(record.xp_total, 40);
    }
}
