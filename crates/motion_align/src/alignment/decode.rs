//! Audio acquisition for alignment.
//!
//! Decoding is behind the `AudioDecoder` trait so hosts can plug in their own
//! media stack. `FfmpegDecoder` extracts the audio of any ffmpeg-readable
//! input (local file or URL), downmixes to mono, resamples, and reads raw
//! f64 samples from ffmpeg's stdout.

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::types::{AudioSignal, AudioSourceError};

/// Default decode sample rate (48kHz, what browser audio contexts use).
pub const DEFAULT_DECODE_SAMPLE_RATE: u32 = 48000;

/// Opaque identifier of a video whose audio should be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// Local media file.
    Path(PathBuf),
    /// Remote media URL.
    Url(String),
}

impl AudioSource {
    /// Classify an identifier: anything with a URL scheme is remote.
    pub fn parse(identifier: &str) -> Self {
        if identifier.contains("://") {
            AudioSource::Url(identifier.to_string())
        } else {
            AudioSource::Path(PathBuf::from(identifier))
        }
    }
}

impl fmt::Display for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioSource::Path(path) => write!(f, "{}", path.display()),
            AudioSource::Url(url) => write!(f, "{}", url),
        }
    }
}

impl From<&Path> for AudioSource {
    fn from(path: &Path) -> Self {
        AudioSource::Path(path.to_path_buf())
    }
}

/// Fetches and decodes the audio track of a source into a mono signal.
///
/// Implementations block; the aligner runs them on blocking worker threads.
pub trait AudioDecoder: Send + Sync {
    /// Name of this decoder (for logging).
    fn name(&self) -> &str;

    /// Decode the source's audio to mono samples with a known sample rate.
    fn decode(&self, source: &AudioSource) -> Result<AudioSignal, AudioSourceError>;
}

/// Decoder backed by an `ffmpeg` executable.
#[derive(Debug, Clone)]
pub struct FfmpegDecoder {
    ffmpeg_path: PathBuf,
    sample_rate: u32,
    use_soxr: bool,
    audio_stream_index: Option<usize>,
}

impl FfmpegDecoder {
    /// Decoder using `ffmpeg` from `PATH` at the default sample rate.
    pub fn new() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            sample_rate: DEFAULT_DECODE_SAMPLE_RATE,
            use_soxr: false,
            audio_stream_index: None,
        }
    }

    pub fn with_ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg_path = path.into();
        self
    }

    /// Resample to this rate; 0 keeps the default.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        if sample_rate > 0 {
            self.sample_rate = sample_rate;
        }
        self
    }

    /// Use the SOXR high-quality resampler.
    pub fn with_soxr(mut self, use_soxr: bool) -> Self {
        self.use_soxr = use_soxr;
        self
    }

    /// Decode a specific audio stream (`-map 0:a:N`) instead of the default one.
    pub fn with_audio_stream(mut self, index: Option<usize>) -> Self {
        self.audio_stream_index = index;
        self
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn build_command(&self, source: &AudioSource) -> Command {
        let mut cmd = Command::new(&self.ffmpeg_path);
        cmd.arg("-nostdin").arg("-i");
        match source {
            AudioSource::Path(path) => cmd.arg(path),
            AudioSource::Url(url) => cmd.arg(url),
        };

        if let Some(idx) = self.audio_stream_index {
            cmd.arg("-map").arg(format!("0:a:{}", idx));
        }

        cmd.arg("-vn") // No video
            .arg("-ac")
            .arg("1") // Mono
            .arg("-ar")
            .arg(self.sample_rate.to_string());

        if self.use_soxr {
            cmd.arg("-resampler").arg("soxr");
        }

        cmd.arg("-f")
            .arg("f64le")
            .arg("-acodec")
            .arg("pcm_f64le")
            .arg("pipe:1");

        cmd.stdin(Stdio::null())
            .stderr(Stdio::null())
            .stdout(Stdio::piped());
        cmd
    }

    fn tool_name(&self) -> String {
        self.ffmpeg_path.display().to_string()
    }
}

impl Default for FfmpegDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioDecoder for FfmpegDecoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn decode(&self, source: &AudioSource) -> Result<AudioSignal, AudioSourceError> {
        if let AudioSource::Path(path) = source {
            if !path.exists() {
                return Err(AudioSourceError::NotFound(path.display().to_string()));
            }
        }

        let mut cmd = self.build_command(source);
        tracing::debug!("Running FFmpeg: {:?}", cmd);

        let mut child = cmd.spawn().map_err(|e| AudioSourceError::Spawn {
            tool: self.tool_name(),
            source: e,
        })?;

        let mut buffer = Vec::new();
        if let Some(mut stdout) = child.stdout.take() {
            if let Err(e) = stdout.read_to_end(&mut buffer) {
                let _ = child.kill();
                let _ = child.wait();
                return Err(AudioSourceError::Io {
                    operation: "reading ffmpeg output".to_string(),
                    source: e,
                });
            }
        }

        let status = child.wait().map_err(|e| AudioSourceError::Io {
            operation: "waiting for ffmpeg".to_string(),
            source: e,
        })?;

        if !status.success() {
            return Err(AudioSourceError::ToolFailed {
                tool: self.tool_name(),
                code: status.code(),
                input: source.to_string(),
            });
        }

        // An audio stream with no samples is valid; it aligns as silence
        let samples = bytes_to_f64_samples(&buffer);
        if samples.is_empty() {
            tracing::warn!("FFmpeg produced no audio samples for {}", source);
        }

        tracing::debug!(
            "Decoded {} samples ({:.2}s) from {}",
            samples.len(),
            samples.len() as f64 / self.sample_rate as f64,
            source
        );

        Ok(AudioSignal::new(samples, self.sample_rate))
    }
}

/// Convert raw little-endian bytes to f64 samples, ignoring a trailing partial sample.
fn bytes_to_f64_samples(bytes: &[u8]) -> Vec<f64> {
    bytes
        .chunks_exact(8)
        .map(|chunk| {
            let mut arr = [0u8; 8];
            arr.copy_from_slice(chunk);
            f64::from_le_bytes(arr)
        })
        .collect()
}
