//! Study sessions
//!
//! This module provides:
//! - The technique-agnostic session state machine
//! - Session data models (phases, responses, rejections, summaries)
//! - The sprint timer overlay used by timed techniques

pub mod machine;
pub mod models;
pub mod timer;

pub use machine::{SessionError, SessionSettings, SprintTick, StudySession};
pub use models::*;
pub use timer::{SprintClock, SprintEvent, SprintPhase, SprintSnapshot, SprintTimer};
