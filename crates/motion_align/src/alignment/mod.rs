//! Audio-based temporal alignment of a practice video against a reference.
//!
//! # Architecture
//!
//! 1. **Decode** (`decode`): obtain mono audio for both videos through an
//!    `AudioDecoder`, concurrently.
//! 2. **Envelope** (`envelope`): reduce each signal to per-window RMS energy.
//! 3. **Correlation** (`correlation`): find the envelope lag with the highest
//!    normalized correlation within the search radius.
//! 4. **Projection** (`frames`): turn the lag into start points, clamp the
//!    matched window to what both tracks contain, and re-quantize it onto
//!    the pose-frame grid.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use motion_align::alignment::{align_videos, AlignConfig, AudioSource, FfmpegDecoder};
//!
//! let decoder = Arc::new(FfmpegDecoder::new());
//! let result = align_videos(
//!     decoder,
//!     AudioSource::parse("reference.mp4"),
//!     AudioSource::parse("practice.mp4"),
//!     &AlignConfig::default(),
//! )
//! .await?;
//!
//! if result.is_confident(0.5) {
//!     let poses = result.practice_range().slice(&practice_poses);
//! }
//! ```

mod aligner;
mod correlation;
mod decode;
mod envelope;
pub mod frames;
pub mod types;

pub use types::{
    AlignError, AlignResult, AlignmentResult, AudioSignal, AudioSourceError, CorrelationResult,
    CorrelationScore, Envelope, SignalSide,
};

pub use aligner::{
    align_envelopes, align_signals, align_videos, AlignConfig, DEFAULT_MAX_LAG_SECONDS,
};
pub use correlation::{cross_correlate, score_lag};
pub use decode::{AudioDecoder, AudioSource, FfmpegDecoder, DEFAULT_DECODE_SAMPLE_RATE};
pub use envelope::{compute_envelope, frame_len_samples, DEFAULT_FRAME_WINDOW_MS};
pub use frames::{PoseFrameRange, DEFAULT_POSE_FRAME_INTERVAL_MS};
