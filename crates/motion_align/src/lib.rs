//! Motion Align - audio-based alignment of dance practice videos
//!
//! Estimates the time offset between a reference and a practice recording
//! from their audio tracks, and maps the overlapping window onto the
//! pose-frame grid used for landmark comparison.

pub mod alignment;
pub mod config;
pub mod logging;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
