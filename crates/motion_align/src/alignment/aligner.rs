//! Alignment of a practice video against a reference video.
//!
//! `align_videos` decodes both audio tracks concurrently, then runs the
//! envelope, correlation and projection steps synchronously. The pure part is
//! exposed as `align_signals` / `align_envelopes` for callers that already
//! hold decoded audio.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::correlation::cross_correlate;
use super::decode::{AudioDecoder, AudioSource};
use super::envelope::{compute_envelope, DEFAULT_FRAME_WINDOW_MS};
use super::frames::{
    lag_to_offset_seconds, max_lag_frames, project_matched_window, DEFAULT_POSE_FRAME_INTERVAL_MS,
};
use super::types::{
    AlignError, AlignResult, AlignmentResult, AudioSignal, Envelope, SignalSide,
};

/// Default lag search radius in seconds.
pub const DEFAULT_MAX_LAG_SECONDS: f64 = 10.0;

/// Parameters for one alignment.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignConfig {
    /// Envelope window in milliseconds.
    pub frame_window_ms: u32,
    /// Largest offset searched in either direction, in seconds.
    pub max_lag_seconds: f64,
    /// Pose-frame grid interval in milliseconds.
    pub pose_frame_interval_ms: u32,
    /// Attach both envelopes to the result.
    pub keep_envelopes: bool,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            frame_window_ms: DEFAULT_FRAME_WINDOW_MS,
            max_lag_seconds: DEFAULT_MAX_LAG_SECONDS,
            pose_frame_interval_ms: DEFAULT_POSE_FRAME_INTERVAL_MS,
            keep_envelopes: false,
        }
    }
}

impl AlignConfig {
    /// Check that all parameters are in range.
    pub fn validate(&self) -> AlignResult<()> {
        if self.frame_window_ms == 0 {
            return Err(AlignError::invalid_config("frame_window_ms must be positive"));
        }
        if self.pose_frame_interval_ms == 0 {
            return Err(AlignError::invalid_config(
                "pose_frame_interval_ms must be positive",
            ));
        }
        if !self.max_lag_seconds.is_finite() || self.max_lag_seconds < 0.0 {
            return Err(AlignError::invalid_config(format!(
                "max_lag_seconds must be a non-negative number, got {}",
                self.max_lag_seconds
            )));
        }
        Ok(())
    }
}

/// Align two videos by their audio.
///
/// Both sources are decoded on blocking worker threads at the same time and
/// joined before any computation starts. The first decode failure aborts the
/// alignment; the other decode's result is discarded.
pub async fn align_videos(
    decoder: Arc<dyn AudioDecoder>,
    reference: AudioSource,
    practice: AudioSource,
    config: &AlignConfig,
) -> AlignResult<AlignmentResult> {
    config.validate()?;

    debug!(
        "Decoding reference '{}' and practice '{}' with {}",
        reference,
        practice,
        decoder.name()
    );

    let (reference_signal, practice_signal) = tokio::try_join!(
        decode_on_worker(Arc::clone(&decoder), reference, SignalSide::Reference),
        decode_on_worker(decoder, practice, SignalSide::Practice)
    )?;

    align_signals(&reference_signal, &practice_signal, config)
}

async fn decode_on_worker(
    decoder: Arc<dyn AudioDecoder>,
    source: AudioSource,
    side: SignalSide,
) -> AlignResult<AudioSignal> {
    let label = source.to_string();
    let handle = tokio::task::spawn_blocking(move || decoder.decode(&source));

    match handle.await {
        Ok(Ok(signal)) => Ok(signal),
        Ok(Err(e)) => {
            error!("Failed to decode {} audio from {}: {}", side, label, e);
            Err(AlignError::audio_source(side, e))
        }
        Err(e) => Err(AlignError::TaskJoin(format!("{} decode: {}", side, e))),
    }
}

/// Align two decoded signals.
pub fn align_signals(
    reference: &AudioSignal,
    practice: &AudioSignal,
    config: &AlignConfig,
) -> AlignResult<AlignmentResult> {
    config.validate()?;
    check_signal(reference, SignalSide::Reference)?;
    check_signal(practice, SignalSide::Practice)?;

    let reference_env = compute_envelope(reference, config.frame_window_ms)?;
    let practice_env = compute_envelope(practice, config.frame_window_ms)?;

    align_envelopes(&reference_env, &practice_env, config)
}

/// Align two envelopes computed with `config.frame_window_ms`.
pub fn align_envelopes(
    reference: &Envelope,
    practice: &Envelope,
    config: &AlignConfig,
) -> AlignResult<AlignmentResult> {
    config.validate()?;
    for (env, side) in [(reference, SignalSide::Reference), (practice, SignalSide::Practice)] {
        if env.frame_window_ms != config.frame_window_ms {
            return Err(AlignError::invalid_config(format!(
                "{} envelope uses {}ms windows, expected {}ms",
                side, env.frame_window_ms, config.frame_window_ms
            )));
        }
    }

    let max_lag = max_lag_frames(config.max_lag_seconds, config.frame_window_ms);
    debug!(
        "Correlating envelopes at {:.1} frames/s: reference {} frames, practice {} frames, max lag ±{} frames",
        reference.frame_rate(),
        reference.len(),
        practice.len(),
        max_lag
    );

    let correlation = cross_correlate(&reference.values, &practice.values, max_lag);
    let offset_seconds = lag_to_offset_seconds(correlation.lag_frames, config.frame_window_ms);

    if correlation.score.is_no_overlap() {
        warn!("No lag produced overlapping frames; alignment has no score");
    }

    let window = project_matched_window(
        correlation.lag_frames,
        reference.len(),
        practice.len(),
        config.frame_window_ms,
        config.pose_frame_interval_ms,
    );

    info!(
        "Aligned: offset {:+.3}s (lag {} frames), score {}, {} matched frames",
        offset_seconds, correlation.lag_frames, correlation.score, window.matched_audio_frames
    );

    Ok(AlignmentResult {
        offset_seconds,
        lag_frames: correlation.lag_frames,
        score: correlation.score,
        reference_start_frame: window.reference.start,
        reference_end_frame: window.reference.end,
        practice_start_frame: window.practice.start,
        practice_end_frame: window.practice.end,
        matched_audio_frame_count: window.matched_audio_frames,
        pose_frame_interval_ms: config.pose_frame_interval_ms,
        reference_envelope: config.keep_envelopes.then(|| reference.values.clone()),
        practice_envelope: config.keep_envelopes.then(|| practice.values.clone()),
    })
}

fn check_signal(signal: &AudioSignal, side: SignalSide) -> AlignResult<()> {
    if signal.sample_rate == 0 {
        return Err(AlignError::InvalidSignal(format!(
            "{} signal has a sample rate of 0",
            side
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::alignment::types::{AudioSourceError, CorrelationScore};

    const RATE: u32 = 1000;

    /// Signal whose 50ms windows have RMS equal to the given amplitudes.
    fn signal_from_amplitudes(amplitudes: &[f64]) -> AudioSignal {
        let frame_len = (RATE * 50 / 1000) as usize;
        let samples = amplitudes
            .iter()
            .flat_map(|&amp| (0..frame_len).map(move |j| if j % 2 == 0 { amp } else { -amp }))
            .collect();
        AudioSignal::new(samples, RATE)
    }

    fn amplitudes(len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| ((i * i * 31 + i * 17) % 97) as f64 / 97.0 + 0.05)
            .collect()
    }

    struct StaticDecoder {
        signals: HashMap<String, AudioSignal>,
    }

    impl AudioDecoder for StaticDecoder {
        fn name(&self) -> &str {
            "static"
        }

        fn decode(&self, source: &AudioSource) -> Result<AudioSignal, AudioSourceError> {
            self.signals
                .get(&source.to_string())
                .cloned()
                .ok_or_else(|| AudioSourceError::NotFound(source.to_string()))
        }
    }

    #[test]
    fn block_envelopes_align_practice_two_frames_late() {
        let reference = Envelope::new(vec![1.0, 1.0, 1.0, 0.0, 0.0], 50);
        let practice = Envelope::new(vec![0.0, 0.0, 1.0, 1.0, 1.0], 50);
        let config = AlignConfig {
            max_lag_seconds: 0.2, // 4 frames
            ..Default::default()
        };

        let result = align_envelopes(&reference, &practice, &config).unwrap();

        assert_eq!(result.lag_frames, 2);
        assert_eq!(result.score, CorrelationScore::Scored(1.0));
        assert!((result.offset_seconds - 0.1).abs() < 1e-12);
        assert_eq!(result.matched_audio_frame_count, 3);
        // practice starts at 100ms -> pose frame 1, ends at 250ms -> pose frame 2
        assert_eq!(result.reference_range().start, 0);
        assert_eq!(result.reference_range().end, 1);
        assert_eq!(result.practice_start_frame, 1);
        assert_eq!(result.practice_end_frame, 2);
    }

    #[test]
    fn half_second_offset_projects_to_pose_frames() {
        // Two 5-second tracks; practice is the reference delayed by 0.5s
        let amps = amplitudes(100);
        let mut delayed = vec![0.0; 10];
        delayed.extend_from_slice(&amps[..90]);

        let reference = signal_from_amplitudes(&amps);
        let practice = signal_from_amplitudes(&delayed);
        assert_eq!(reference.len(), practice.len());

        let config = AlignConfig {
            max_lag_seconds: 2.0,
            ..Default::default()
        };
        let result = align_signals(&reference, &practice, &config).unwrap();

        assert_eq!(result.lag_frames, 10);
        assert!((result.offset_seconds - 0.5).abs() < 1e-12);
        assert_eq!(result.matched_audio_frame_count, 90);
        assert_eq!(result.reference_start_frame, 0);
        assert_eq!(result.reference_end_frame, 45);
        assert_eq!(result.practice_start_frame, 5);
        assert_eq!(result.practice_end_frame, 50);
        assert!(result.is_confident(0.99));
    }

    #[test]
    fn leading_silence_shifts_lag_by_whole_frames() {
        let amps = amplitudes(80);
        let reference = signal_from_amplitudes(&amps);
        // Insert 150 silent samples (3 frames at 50 samples each)
        let mut shifted = vec![0.0; 150];
        shifted.extend_from_slice(&reference.samples);
        let practice = AudioSignal::new(shifted, RATE);

        let config = AlignConfig {
            max_lag_seconds: 1.0,
            ..Default::default()
        };
        let result = align_signals(&reference, &practice, &config).unwrap();

        assert_eq!(result.lag_frames, 3);
        assert_eq!(result.reference_start_frame, 0);
        assert!(result.matched_audio_frame_count <= 80);
    }

    #[test]
    fn silent_tracks_keep_earliest_overlapping_lag() {
        // 3s of silence = 60 frames; default search is ±200 frames
        let silent = AudioSignal::new(vec![0.0; 3000], RATE);

        let result = align_signals(&silent, &silent, &AlignConfig::default()).unwrap();

        assert_eq!(result.score, CorrelationScore::Scored(0.0));
        assert_eq!(result.lag_frames, -59);
        assert_eq!(result.matched_audio_frame_count, 1);
    }

    #[test]
    fn silent_tracks_with_short_search_match_overlap_length() {
        let silent = AudioSignal::new(vec![0.0; 3000], RATE);
        let config = AlignConfig {
            max_lag_seconds: 1.0, // 20 frames
            ..Default::default()
        };

        let result = align_signals(&silent, &silent, &config).unwrap();

        assert_eq!(result.lag_frames, -20);
        assert_eq!(result.matched_audio_frame_count, 40);
        assert_eq!(result.reference_start_frame, 10);
        assert_eq!(result.reference_end_frame, 30);
        assert_eq!(result.practice_start_frame, 0);
        assert_eq!(result.practice_end_frame, 20);
    }

    #[test]
    fn huge_search_radius_still_finds_lag() {
        let env = Envelope::new(amplitudes(30), 50);
        let config = AlignConfig {
            max_lag_seconds: 1e300,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let result = align_envelopes(&env, &env, &config).unwrap();

        assert!(!result.score.is_no_overlap());
        assert_eq!(result.lag_frames, 0);
        assert_eq!(result.matched_audio_frame_count, 30);
    }

    #[test]
    fn empty_envelope_reports_no_overlap_without_error() {
        crate::logging::init_test_tracing();
        let reference = Envelope::new(vec![0.5; 10], 50);
        let practice = Envelope::new(Vec::new(), 50);

        let result = align_envelopes(&reference, &practice, &AlignConfig::default()).unwrap();

        assert!(result.score.is_no_overlap());
        assert_eq!(result.offset_seconds, 0.0);
        assert_eq!(result.matched_audio_frame_count, 0);
        assert!(!result.is_confident(0.0));
    }

    #[test]
    fn keep_envelopes_attaches_values() {
        let signal = signal_from_amplitudes(&amplitudes(20));
        let config = AlignConfig {
            keep_envelopes: true,
            ..Default::default()
        };

        let result = align_signals(&signal, &signal, &config).unwrap();

        assert_eq!(result.reference_envelope.as_ref().map(Vec::len), Some(20));
        assert_eq!(result.practice_envelope.as_ref().map(Vec::len), Some(20));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let signal = AudioSignal::new(vec![0.1; 100], RATE);
        for config in [
            AlignConfig { frame_window_ms: 0, ..Default::default() },
            AlignConfig { pose_frame_interval_ms: 0, ..Default::default() },
            AlignConfig { max_lag_seconds: -1.0, ..Default::default() },
            AlignConfig { max_lag_seconds: f64::INFINITY, ..Default::default() },
        ] {
            assert!(matches!(
                align_signals(&signal, &signal, &config),
                Err(AlignError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn mismatched_envelope_window_is_rejected() {
        let reference = Envelope::new(vec![1.0; 4], 50);
        let practice = Envelope::new(vec![1.0; 4], 25);
        assert!(align_envelopes(&reference, &practice, &AlignConfig::default()).is_err());
    }

    #[test]
    fn zero_sample_rate_is_invalid() {
        let signal = AudioSignal::new(vec![0.1; 10], 0);
        assert!(matches!(
            align_signals(&signal, &signal, &AlignConfig::default()),
            Err(AlignError::InvalidSignal(_))
        ));
    }

    #[test]
    fn result_serializes_for_pose_consumer() {
        let reference = Envelope::new(vec![1.0, 1.0, 1.0, 0.0, 0.0], 50);
        let practice = Envelope::new(vec![0.0, 0.0, 1.0, 1.0, 1.0], 50);
        let result = align_envelopes(&reference, &practice, &AlignConfig::default()).unwrap();

        let json = result.to_json().unwrap();

        assert!(json.contains("\"practiceStartFrame\":1"));
        assert!(json.contains("\"poseFrameIntervalMs\":100"));
        assert!(!json.contains("referenceEnvelope"));
        let parsed: AlignmentResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, result);
    }

    #[tokio::test]
    async fn align_videos_decodes_both_sources() {
        let amps = amplitudes(60);
        let mut delayed = vec![0.0; 4];
        delayed.extend_from_slice(&amps[..56]);

        let mut signals = HashMap::new();
        signals.insert("ref.mp4".to_string(), signal_from_amplitudes(&amps));
        signals.insert("practice.mp4".to_string(), signal_from_amplitudes(&delayed));
        let decoder: Arc<dyn AudioDecoder> = Arc::new(StaticDecoder { signals });

        let config = AlignConfig {
            max_lag_seconds: 1.0,
            ..Default::default()
        };
        let result = align_videos(
            decoder,
            AudioSource::parse("ref.mp4"),
            AudioSource::parse("practice.mp4"),
            &config,
        )
        .await
        .unwrap();

        assert_eq!(result.lag_frames, 4);
        assert!((result.offset_seconds - 0.2).abs() < 1e-12);
        assert_eq!(result.practice_start_frame, 2);
    }

    #[tokio::test]
    async fn align_videos_accepts_empty_decoded_audio() {
        let mut signals = HashMap::new();
        signals.insert("ref.mp4".to_string(), AudioSignal::new(Vec::new(), RATE));
        signals.insert("practice.mp4".to_string(), AudioSignal::new(Vec::new(), RATE));
        let decoder: Arc<dyn AudioDecoder> = Arc::new(StaticDecoder { signals });
        let config = AlignConfig {
            keep_envelopes: true,
            ..Default::default()
        };

        let result = align_videos(
            decoder,
            AudioSource::parse("ref.mp4"),
            AudioSource::parse("practice.mp4"),
            &config,
        )
        .await
        .unwrap();

        assert_eq!(result.reference_envelope, Some(vec![0.0]));
        assert_eq!(result.practice_envelope, Some(vec![0.0]));
        assert_eq!(result.score, CorrelationScore::Scored(0.0));
        assert_eq!(result.lag_frames, 0);
    }

    #[tokio::test]
    async fn align_videos_fails_when_either_decode_fails() {
        let mut signals = HashMap::new();
        signals.insert("ref.mp4".to_string(), signal_from_amplitudes(&amplitudes(20)));
        let decoder: Arc<dyn AudioDecoder> = Arc::new(StaticDecoder { signals });

        let err = align_videos(
            decoder,
            AudioSource::parse("ref.mp4"),
            AudioSource::parse("missing.mp4"),
            &AlignConfig::default(),
        )
        .await
        .unwrap_err();

        match err {
            AlignError::AudioSource { side, source } => {
                assert_eq!(side, SignalSide::Practice);
                assert!(matches!(source, AudioSourceError::NotFound(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn align_videos_validates_before_decoding() {
        let decoder: Arc<dyn AudioDecoder> = Arc::new(StaticDecoder {
            signals: HashMap::new(),
        });
        let config = AlignConfig {
            frame_window_ms: 0,
            ..Default::default()
        };

        let err = align_videos(
            decoder,
            AudioSource::parse("a.mp4"),
            AudioSource::parse("b.mp4"),
            &config,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AlignError::InvalidConfig(_)));
    }
}
