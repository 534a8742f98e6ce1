use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use studyquest_lib::backend::{HttpBackend, LocalProgressService, OfflineBackend};
use studyquest_lib::progress::{ProgressStorage, ProgressTracker, UserProgress};
use studyquest_lib::{Collaborators, EngineConfig, StudyEngine};

/// Shared application state for CLI commands
pub struct App {
    pub config: EngineConfig,
    pub tracker: Arc<ProgressTracker>,
    pub user_id: String,
}

impl App {
    /// Load the config file (or defaults) and open local progress storage
    pub fn new(config_path: Option<&Path>, user: Option<&str>) -> Result<Self> {
        let path = match config_path {
            Some(path) => path.to_path_buf(),
            None => EngineConfig::default_path().context("Failed to locate config directory")?,
        };
        let config = EngineConfig::load_or_default(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        let data_dir = config.data_dir().context("Failed to get data directory")?;
        let storage = ProgressStorage::new(data_dir).context("Failed to initialize progress storage")?;
        let tracker = Arc::new(ProgressTracker::new(storage, config.levels().clone()));

        let user_id = user
            .map(str::to_string)
            .unwrap_or_else(|| config.backend.user_id.clone());

        Ok(Self {
            config,
            tracker,
            user_id,
        })
    }

    /// Engine wired to the configured study service, or to local progress when there
    /// is none or `offline` is set
    pub fn build_engine(&self, offline: bool) -> Result<StudyEngine> {
        let collaborators = match self.config.backend.base_url.as_deref() {
            Some(url) if !offline => {
                let backend = Arc::new(
                    HttpBackend::new(url, &self.user_id, self.config.collaborator_timeout())
                        .context(format!("Invalid study service URL '{}'", url))?,
                );
                Collaborators {
                    cards: backend.clone(),
                    distractors: backend.clone(),
                    progress: backend,
                }
            }
            _ => Collaborators {
                cards: Arc::new(OfflineBackend),
                distractors: Arc::new(OfflineBackend),
                progress: Arc::new(LocalProgressService::new(Arc::clone(&self.tracker))),
            },
        };

        Ok(StudyEngine::new(
            self.user_id.clone(),
            self.config.clone(),
            collaborators,
        ))
    }

    /// Current progress from whichever progress service the engine talks to
    pub async fn progress(&self) -> Result<UserProgress> {
        let engine = self.build_engine(false)?;
        engine
            .refresh_progress()
            .await
            .context(format!("Progress for '{}' is unavailable", self.user_id))
    }
}
