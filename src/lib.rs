//! Adaptive study progression engine
//!
//! Study sessions over question / answer cards, run by one state machine shared by
//! every study technique. Grading a card earns XP (boosted by the chosen character's
//! specialties), adaptive sessions re-queue cards by difficulty, and accumulated XP
//! raises the user's level, which unlocks further techniques.

pub mod backend;
pub mod config;
pub mod engine;
pub mod flashcards;
pub mod progress;
pub mod session;
pub mod techniques;
pub mod xp;

pub use config::EngineConfig;
pub use engine::{CompletionReport, Collaborators, EngineError, SessionHandle, StudyEngine};
