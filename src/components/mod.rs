//! UI components: capability detection and the animated backdrop.

pub mod backdrop;
pub mod detector;
