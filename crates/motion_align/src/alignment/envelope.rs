//! RMS energy envelope extraction.
//!
//! Pure function, no I/O.

use super::types::{AlignError, AlignResult, AudioSignal, Envelope};

/// Default envelope window in milliseconds.
pub const DEFAULT_FRAME_WINDOW_MS: u32 = 50;

/// Number of raw samples in one envelope window (at least 1).
pub fn frame_len_samples(sample_rate: u32, frame_window_ms: u32) -> usize {
    let len = (sample_rate as u64 * frame_window_ms as u64) / 1000;
    len.max(1) as usize
}

/// Compute the short-time RMS envelope of a signal.
///
/// Samples are split into non-overlapping windows of `frame_window_ms`; a
/// trailing partial window is dropped. Signals shorter than one window still
/// yield a single frame covering whatever samples exist, and an empty signal
/// yields a single zero frame.
pub fn compute_envelope(signal: &AudioSignal, frame_window_ms: u32) -> AlignResult<Envelope> {
    if frame_window_ms == 0 {
        return Err(AlignError::invalid_config("frame_window_ms must be positive"));
    }

    let frame_len = frame_len_samples(signal.sample_rate, frame_window_ms);
    let samples = &signal.samples;
    let frame_count = (samples.len() / frame_len).max(1);

    let values = (0..frame_count)
        .map(|i| {
            let start = (i * frame_len).min(samples.len());
            let end = samples.len().min((i + 1) * frame_len);
            rms(&samples[start..end])
        })
        .collect();

    Ok(Envelope::new(values, frame_window_ms))
}

/// Root mean square, 0 for an empty span.
fn rms(span: &[f64]) -> f64 {
    if span.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = span.iter().map(|x| x * x).sum();
    (sum_sq / span.len() as f64).sqrt()
}
