//! Bounded-lag normalized cross-correlation of two envelopes.
//!
//! Pure functions that don't do I/O or mutate their inputs.

use super::types::{CorrelationResult, CorrelationScore};

/// Find the lag in `[-max_lag_frames, max_lag_frames]` that best aligns `b` to `a`.
///
/// For lag `L`, every `a[i]` is paired with `b[i + L]` where that index exists.
/// Lags without any valid pair are skipped. Lags are scanned in increasing
/// order and only a strictly greater score replaces the current best, so ties
/// go to the most negative lag.
///
/// Returns a `NoOverlap` score when no lag had a valid pair.
pub fn cross_correlate(a: &[f64], b: &[f64], max_lag_frames: usize) -> CorrelationResult {
    let mut best = CorrelationResult::no_overlap();
    if a.is_empty() || b.is_empty() {
        return best;
    }

    // Lags outside [-(a.len() - 1), b.len() - 1] have no pairs and would be skipped
    let max_lag = i64::try_from(max_lag_frames).unwrap_or(i64::MAX);
    let min_lag = (-max_lag).max(1 - i64::try_from(a.len()).unwrap_or(i64::MAX));
    let max_lag = max_lag.min(i64::try_from(b.len()).unwrap_or(i64::MAX) - 1);
    let mut best_score = f64::NEG_INFINITY;

    for lag in min_lag..=max_lag {
        let Some(score) = score_lag(a, b, lag) else {
            continue;
        };
        if score > best_score {
            best_score = score;
            best = CorrelationResult {
                lag_frames: lag,
                score: CorrelationScore::Scored(score),
            };
        }
    }

    best
}

/// Normalized correlation coefficient for a single lag.
///
/// Returns `None` when the lag has no valid pairs and `Some(0.0)` when either
/// side of the overlap has zero energy.
pub fn score_lag(a: &[f64], b: &[f64], lag: i64) -> Option<f64> {
    let (start, end) = overlap(a.len(), b.len(), lag)?;

    let mut num = 0.0;
    let mut sum_a2 = 0.0;
    let mut sum_b2 = 0.0;
    for i in start..end {
        let va = a[i];
        let vb = b[(i as i64 + lag) as usize];
        num += va * vb;
        sum_a2 += va * va;
        sum_b2 += vb * vb;
    }

    let denom = (sum_a2 * sum_b2).sqrt();
    Some(if denom > 0.0 { num / denom } else { 0.0 })
}

/// Range of `i` in `a` for which `i + lag` indexes into `b`.
fn overlap(a_len: usize, b_len: usize, lag: i64) -> Option<(usize, usize)> {
    let start = (-lag).max(0);
    let end = (a_len as i64).min(b_len as i64 - lag);
    if start >= end {
        return None;
    }
    Some((start as usize, end as usize))
}
