//! Conversions between the three clocks involved in alignment.
//!
//! Raw audio samples are reduced to envelope frames of `frame_window_ms`,
//! and the matched window is projected onto the pose-frame grid of
//! `pose_frame_interval_ms`. The two grids share no assumed divisor, so every
//! conversion goes through integer milliseconds with explicit floor division.

use serde::{Deserialize, Serialize};

/// Default pose-frame grid interval in milliseconds.
pub const DEFAULT_POSE_FRAME_INTERVAL_MS: u32 = 100;

/// Largest lag searched, in envelope frames: `floor(max_lag_seconds * 1000 / frame_window_ms)`.
pub fn max_lag_frames(max_lag_seconds: f64, frame_window_ms: u32) -> usize {
    let frames = (max_lag_seconds * 1000.0 / frame_window_ms as f64).floor();
    if frames.is_finite() && frames > 0.0 {
        frames as usize
    } else {
        0
    }
}

/// Offset in seconds for a lag in envelope frames.
pub fn lag_to_offset_seconds(lag_frames: i64, frame_window_ms: u32) -> f64 {
    (lag_frames * frame_window_ms as i64) as f64 / 1000.0
}

/// Envelope-frame start points of each track after applying the lag.
///
/// `offset_seconds * audio_frame_rate` equals the lag exactly, so the starts
/// are taken from the integer lag. A positive lag pushes the practice start
/// forward; a negative one pushes the reference start forward.
pub fn start_audio_frames(lag_frames: i64) -> (usize, usize) {
    let reference = (-lag_frames).max(0) as usize;
    let practice = lag_frames.max(0) as usize;
    (reference, practice)
}

/// Envelope frames both tracks still contain after their start points.
pub fn matched_audio_frames(
    reference_len: usize,
    practice_len: usize,
    reference_start: usize,
    practice_start: usize,
) -> usize {
    let available_ref = reference_len.saturating_sub(reference_start);
    let available_prac = practice_len.saturating_sub(practice_start);
    available_ref.min(available_prac)
}

/// Envelope frames to milliseconds.
pub fn audio_frames_to_ms(frames: usize, frame_window_ms: u32) -> u64 {
    frames as u64 * frame_window_ms as u64
}

/// Milliseconds to the pose frame containing that instant.
pub fn ms_to_pose_frame(ms: u64, pose_frame_interval_ms: u32) -> usize {
    (ms / pose_frame_interval_ms as u64) as usize
}

/// Inclusive range of pose frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoseFrameRange {
    pub start: usize,
    pub end: usize,
}

impl PoseFrameRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of frames in `[start, end]`.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start) + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    /// Sub-slice `[start, end]` of a per-frame sequence, clamped to its length.
    pub fn slice<'a, T>(&self, frames: &'a [T]) -> &'a [T] {
        let start = self.start.min(frames.len());
        let end = self.end.saturating_add(1).min(frames.len()).max(start);
        &frames[start..end]
    }
}

/// The matched window on both tracks, in pose frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchedWindow {
    pub reference: PoseFrameRange,
    pub practice: PoseFrameRange,
    pub matched_audio_frames: usize,
}

/// Project a lag onto start/end pose frames for both tracks.
pub fn project_matched_window(
    lag_frames: i64,
    reference_len: usize,
    practice_len: usize,
    frame_window_ms: u32,
    pose_frame_interval_ms: u32,
) -> MatchedWindow {
    let (reference_start, practice_start) = start_audio_frames(lag_frames);
    let matched = matched_audio_frames(reference_len, practice_len, reference_start, practice_start);
    let matched_ms = audio_frames_to_ms(matched, frame_window_ms);

    let to_range = |start_frames: usize| {
        let start_ms = audio_frames_to_ms(start_frames, frame_window_ms);
        PoseFrameRange::new(
            ms_to_pose_frame(start_ms, pose_frame_interval_ms),
            ms_to_pose_frame(start_ms + matched_ms, pose_frame_interval_ms),
        )
    };

    MatchedWindow {
        reference: to_range(reference_start),
        practice: to_range(practice_start),
        matched_audio_frames: matched,
    }
}
