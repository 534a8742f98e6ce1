//! XP awards and study characters

pub mod engine;
pub mod models;

pub use engine::{compute_award, round_half_up};
pub use models::*;
