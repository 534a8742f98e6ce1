pub mod characters;
pub mod progress;
pub mod study;
pub mod techniques;
