//! XP totals, levels and technique unlocks

pub mod levels;
pub mod models;
pub mod storage;
pub mod tracker;

pub use levels::LevelTable;
pub use models::*;
pub use storage::{ProgressError, ProgressStorage};
pub use tracker::ProgressTracker;
