//! Study techniques and their per-technique session parameters
//!
//! This module provides:
//! - The fixed catalog of techniques with their required levels
//! - Technique profiles: the knobs the session state machine is parameterized by

pub mod models;
pub mod profile;

pub use models::*;
pub use profile::{
    CardOrder, CollectingMode, GradingMode, InputGuard, SprintSettings, TechniqueProfile, XpTable,
};
