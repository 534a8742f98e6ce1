//! Engine-level types

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::backend::{CardSource, DistractorSource, ProgressService};
use crate::progress::UserProgress;
use crate::session::{Rejection, SessionError, SessionSummary};
use crate::techniques::TechniqueId;

/// Opaque reference to a session owned by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionHandle(pub Uuid);

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Unknown session: {0}")]
    UnknownSession(SessionHandle),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("{technique} unlocks at level {required_level} (current level {level})")]
    TechniqueLocked {
        technique: TechniqueId,
        required_level: u32,
        level: u32,
    },

    #[error("{}", .0.message())]
    Rejected(Rejection),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// The services an engine talks to
#[derive(Clone)]
pub struct Collaborators {
    pub cards: Arc<dyn CardSource>,
    pub distractors: Arc<dyn DistractorSource>,
    pub progress: Arc<dyn ProgressService>,
}

/// What the user sees after a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionReport {
    pub summary: SessionSummary,
    pub progress: UserProgress,
    /// `progress` comes from the progress service rather than the local estimate
    pub progress_confirmed: bool,
    pub leveled_up: bool,
    pub newly_unlocked: Vec<TechniqueId>,
}
