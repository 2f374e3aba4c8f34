//! Core types for audio alignment.

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};

use super::frames::PoseFrameRange;

/// Decoded mono audio from one video source.
#[derive(Debug, Clone)]
pub struct AudioSignal {
    /// Mono samples, roughly in [-1, 1].
    pub samples: Vec<f64>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Duration in seconds.
    pub duration_secs: f64,
}

impl AudioSignal {
    /// Create a signal, deriving the duration from the sample count.
    pub fn new(samples: Vec<f64>, sample_rate: u32) -> Self {
        let duration_secs = if sample_rate == 0 {
            0.0
        } else {
            samples.len() as f64 / sample_rate as f64
        };
        Self {
            samples,
            sample_rate,
            duration_secs,
        }
    }

    /// Get the number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the signal has no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Short-time RMS energy envelope of an audio signal.
///
/// One value per non-overlapping window of `frame_window_ms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub values: Vec<f64>,
    pub frame_window_ms: u32,
}

impl Envelope {
    pub fn new(values: Vec<f64>, frame_window_ms: u32) -> Self {
        Self {
            values,
            frame_window_ms,
        }
    }

    /// Envelope frames per second.
    pub fn frame_rate(&self) -> f64 {
        1000.0 / self.frame_window_ms as f64
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Normalized correlation score of the best lag.
///
/// `NoOverlap` means no candidate lag had a single valid pair, so nothing
/// was scored. It must not be read as a zero-offset answer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum CorrelationScore {
    Scored(f64),
    NoOverlap,
}

impl CorrelationScore {
    /// The score, or `None` when nothing overlapped.
    pub fn value(&self) -> Option<f64> {
        match self {
            CorrelationScore::Scored(score) => Some(*score),
            CorrelationScore::NoOverlap => None,
        }
    }

    /// The score as a plain float, with `NoOverlap` mapped to negative infinity.
    pub fn as_f64(&self) -> f64 {
        self.value().unwrap_or(f64::NEG_INFINITY)
    }

    pub fn is_no_overlap(&self) -> bool {
        matches!(self, CorrelationScore::NoOverlap)
    }
}

impl From<Option<f64>> for CorrelationScore {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(score) => CorrelationScore::Scored(score),
            None => CorrelationScore::NoOverlap,
        }
    }
}

impl From<CorrelationScore> for Option<f64> {
    fn from(score: CorrelationScore) -> Self {
        score.value()
    }
}

impl fmt::Display for CorrelationScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrelationScore::Scored(score) => write!(f, "{:.4}", score),
            CorrelationScore::NoOverlap => write!(f, "no overlap"),
        }
    }
}

/// Best lag between two envelopes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrelationResult {
    /// Shift applied to the second envelope relative to the first, in envelope frames.
    pub lag_frames: i64,
    pub score: CorrelationScore,
}

impl CorrelationResult {
    /// Result used when no lag could be scored.
    pub fn no_overlap() -> Self {
        Self {
            lag_frames: 0,
            score: CorrelationScore::NoOverlap,
        }
    }
}

/// Alignment of a practice video against a reference video.
///
/// Frame fields are indices into the pose-frame grid, not the audio envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentResult {
    /// Positive when the practice track lags the reference.
    pub offset_seconds: f64,
    /// Best lag in audio envelope frames.
    pub lag_frames: i64,
    pub score: CorrelationScore,
    pub reference_start_frame: usize,
    pub reference_end_frame: usize,
    pub practice_start_frame: usize,
    pub practice_end_frame: usize,
    /// Length of the matched window in audio envelope frames.
    pub matched_audio_frame_count: usize,
    /// Pose-frame grid interval the frame fields refer to.
    pub pose_frame_interval_ms: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_envelope: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub practice_envelope: Option<Vec<f64>>,
}

impl AlignmentResult {
    /// Pose frames of the reference video covered by the matched window.
    pub fn reference_range(&self) -> PoseFrameRange {
        PoseFrameRange::new(self.reference_start_frame, self.reference_end_frame)
    }

    /// Pose frames of the practice video covered by the matched window.
    pub fn practice_range(&self) -> PoseFrameRange {
        PoseFrameRange::new(self.practice_start_frame, self.practice_end_frame)
    }

    /// Whether the score reaches `min_score`. `NoOverlap` never does.
    pub fn is_confident(&self, min_score: f64) -> bool {
        self.score.value().is_some_and(|score| score >= min_score)
    }

    /// Serialize for the downstream pose-frame consumer.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Which of the two inputs an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalSide {
    Reference,
    Practice,
}

impl fmt::Display for SignalSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalSide::Reference => write!(f, "reference"),
            SignalSide::Practice => write!(f, "practice"),
        }
    }
}

/// Failure to fetch or decode an audio source.
#[derive(Debug, thiserror::Error)]
pub enum AudioSourceError {
    /// Local source file does not exist.
    #[error("Audio source not found: {0}")]
    NotFound(String),

    /// The decoder process could not be started.
    #[error("Failed to spawn {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// Reading decoder output failed.
    #[error("I/O error while {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// The decoder exited unsuccessfully.
    #[error("{tool} exited with code {code:?} for {input}")]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        input: String,
    },
}

/// Error types for alignment operations.
#[derive(Debug, thiserror::Error)]
pub enum AlignError {
    /// Acquiring one of the two audio tracks failed.
    #[error("Failed to acquire {side} audio: {source}")]
    AudioSource {
        side: SignalSide,
        #[source]
        source: AudioSourceError,
    },

    /// Alignment parameters are out of range.
    #[error("Invalid alignment config: {0}")]
    InvalidConfig(String),

    /// A decoded signal violates the signal contract.
    #[error("Invalid audio signal: {0}")]
    InvalidSignal(String),

    /// A decode worker panicked or was cancelled.
    #[error("Decode task failed: {0}")]
    TaskJoin(String),
}

impl AlignError {
    pub fn audio_source(side: SignalSide, source: AudioSourceError) -> Self {
        Self::AudioSource { side, source }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

/// Type alias for alignment results.
pub type AlignResult<T> = Result<T, AlignError>;
