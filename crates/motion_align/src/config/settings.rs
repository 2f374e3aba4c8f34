//! Settings struct with TOML-based sections.
//!
//! Each section maps to a TOML table and can be updated independently.

use serde::{Deserialize, Serialize};

use crate::alignment::{
    AlignConfig, AlignResult, FfmpegDecoder, DEFAULT_DECODE_SAMPLE_RATE, DEFAULT_FRAME_WINDOW_MS,
    DEFAULT_MAX_LAG_SECONDS, DEFAULT_POSE_FRAME_INTERVAL_MS,
};
use crate::logging::LogLevel;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Alignment parameters.
    #[serde(default)]
    pub alignment: AlignmentSettings,

    /// Audio decoding.
    #[serde(default)]
    pub decode: DecodeSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Alignment parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentSettings {
    /// Envelope window in milliseconds.
    #[serde(default = "default_frame_window_ms")]
    pub frame_window_ms: u32,

    /// Lag search radius in seconds.
    #[serde(default = "default_max_lag_seconds")]
    pub max_lag_seconds: f64,

    /// Pose-frame grid interval in milliseconds.
    #[serde(default = "default_pose_frame_interval_ms")]
    pub pose_frame_interval_ms: u32,

    /// Include both envelopes in alignment results.
    #[serde(default)]
    pub keep_envelopes: bool,
}

fn default_frame_window_ms() -> u32 {
    DEFAULT_FRAME_WINDOW_MS
}

fn default_max_lag_seconds() -> f64 {
    DEFAULT_MAX_LAG_SECONDS
}

fn default_pose_frame_interval_ms() -> u32 {
    DEFAULT_POSE_FRAME_INTERVAL_MS
}

impl Default for AlignmentSettings {
    fn default() -> Self {
        Self {
            frame_window_ms: default_frame_window_ms(),
            max_lag_seconds: default_max_lag_seconds(),
            pose_frame_interval_ms: default_pose_frame_interval_ms(),
            keep_envelopes: false,
        }
    }
}

impl AlignmentSettings {
    /// Build a validated alignment config.
    pub fn to_align_config(&self) -> AlignResult<AlignConfig> {
        let config = AlignConfig {
            frame_window_ms: self.frame_window_ms,
            max_lag_seconds: self.max_lag_seconds,
            pose_frame_interval_ms: self.pose_frame_interval_ms,
            keep_envelopes: self.keep_envelopes,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Audio decoding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeSettings {
    /// FFmpeg executable.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    /// Sample rate audio is resampled to before analysis.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Use SOXR high-quality resampling via FFmpeg.
    #[serde(default)]
    pub use_soxr: bool,

    /// Audio stream to decode when a file has several.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_stream_index: Option<usize>,
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_sample_rate() -> u32 {
    DEFAULT_DECODE_SAMPLE_RATE
}

impl Default for DecodeSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            sample_rate: default_sample_rate(),
            use_soxr: false,
            audio_stream_index: None,
        }
    }
}

impl DecodeSettings {
    /// Build an FFmpeg decoder from these settings.
    pub fn build_decoder(&self) -> FfmpegDecoder {
        FfmpegDecoder::new()
            .with_ffmpeg_path(&self.ffmpeg_path)
            .with_sample_rate(self.sample_rate)
            .with_soxr(self.use_soxr)
            .with_audio_stream(self.audio_stream_index)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default level when `RUST_LOG` is not set.
    #[serde(default)]
    pub level: LogLevel,
}

/// Config sections that can be updated independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Alignment,
    Decode,
    Logging,
}

impl ConfigSection {
    /// All sections, in file order.
    pub const ALL: [ConfigSection; 3] = [
        ConfigSection::Alignment,
        ConfigSection::Decode,
        ConfigSection::Logging,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Alignment => "alignment",
            ConfigSection::Decode => "decode",
            ConfigSection::Logging => "logging",
        }
    }
}
