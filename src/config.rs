//! Engine configuration
//!
//! Read from a TOML file. Every field has a default, so an empty or missing file
//! yields a working offline setup:
//!
//! ```toml
//! data_dir = "/home/me/.local/share/studyquest"
//!
//! [backend]
//! base_url = "http://localhost:5000"
//! timeout_secs = 30
//! user_id = "demo_user"
//!
//! [progression]
//! level_thresholds = [0, 100, 250, 450, 700, 1000, 1400, 1900]
//!
//! [session]
//! mastery_reviews = 2
//! award_flush_timeout_ms = 2000
//! distractor_count = 3
//! default_card_count = 10
//! require_character = false
//!
//! [sprint]
//! focus_minutes = 25
//! break_minutes = 5
//! tick_ms = 1000
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::progress::LevelTable;
use crate::session::SessionSettings;
use crate::techniques::SprintSettings;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Could not determine the data directory")]
    DataDirNotFound,

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

const APP_DIR: &str = "studyquest";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Where progress records live; the platform data dir when unset
    pub data_dir: Option<PathBuf>,
    pub backend: BackendConfig,
    pub progression: ProgressionConfig,
    pub session: SessionConfig,
    pub sprint: SprintConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Study service URL. Without one, cards come from the local fallback and progress
    /// is kept on disk.
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub user_id: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 30,
            user_id: "demo_user".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    pub level_thresholds: LevelTable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub mastery_reviews: u32,
    /// How long completion waits for outstanding XP awards
    pub award_flush_timeout_ms: u64,
    pub distractor_count: usize,
    pub default_card_count: usize,
    /// Refuse to start sessions without a character
    pub require_character: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mastery_reviews: 2,
            award_flush_timeout_ms: 2000,
            distractor_count: 3,
            default_card_count: 10,
            require_character: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SprintConfig {
    pub focus_minutes: u64,
    pub break_minutes: u64,
    /// Timer resolution
    pub tick_ms: u64,
}

impl Default for SprintConfig {
    fn default() -> Self {
        Self {
            focus_minutes: 25,
            break_minutes: 5,
            tick_ms: 1000,
        }
    }
}

impl EngineConfig {
    /// Read and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        log::debug!("config: loaded {:?}", path);
        Ok(config)
    }

    /// Like [`EngineConfig::load`], but a missing file gives the defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("config: {:?} not found, using defaults", path);
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// `{config_dir}/studyquest/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(APP_DIR).join("config.toml"))
            .ok_or(ConfigError::DataDirNotFound)
    }

    pub fn validate(&self) -> Result<()> {
        if self.session.mastery_reviews == 0 {
            return Err(ConfigError::Invalid(
                "session.mastery_reviews must be at least 1".to_string(),
            ));
        }
        if self.sprint.focus_minutes == 0 || self.sprint.tick_ms == 0 {
            return Err(ConfigError::Invalid(
                "sprint.focus_minutes and sprint.tick_ms must be positive".to_string(),
            ));
        }
        if self.backend.user_id.trim().is_empty() {
            return Err(ConfigError::Invalid("backend.user_id is empty".to_string()));
        }
        Ok(())
    }

    /// Configured data dir, or `{data_local_dir}/studyquest`
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_local_dir()
                .map(|p| p.join(APP_DIR))
                .ok_or(ConfigError::DataDirNotFound),
        }
    }

    pub fn levels(&self) -> &LevelTable {
        &self.progression.level_thresholds
    }

    pub fn sprint_settings(&self) -> SprintSettings {
        SprintSettings::from_minutes(self.sprint.focus_minutes, self.sprint.break_minutes)
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            mastery_reviews: self.session.mastery_reviews,
            sprint: self.sprint_settings(),
        }
    }

    /// Upper bound for any single collaborator call the engine waits on
    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_secs.max(1))
    }

    pub fn award_flush_timeout(&self) -> Duration {
        Duration::from_millis(self.session.award_flush_timeout_ms)
    }

    pub fn sprint_tick(&self) -> Duration {
        Duration::from_millis(self.sprint.tick_ms)
    }
}
