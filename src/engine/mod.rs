//! Study engine: sessions bound to XP, progress and content services

pub mod manager;
pub mod models;
pub mod reconcile;

pub use manager::StudyEngine;
pub use models::*;
pub use reconcile::{ProgressSnapshot, ProgressView};
