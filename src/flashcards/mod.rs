//! Study cards and adaptive scheduling
//!
//! This module provides:
//! - Card models (question / answer with per-session difficulty state)
//! - The re-queue policy used by adaptive study
//! - The card queue (scheduler) sessions present from
//! - Deterministic fallback decks and distractors

pub mod algorithm;
pub mod fallback;
pub mod models;
pub mod scheduler;

pub use models::*;
pub use scheduler::{CardQueue, SchedulerError};
