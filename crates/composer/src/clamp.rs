//! Silent correction of out-of-range timeline values.
//!
//! Trim windows, rates, and volumes are often computed before a source was
//! re-imported at a different duration. They are corrected here rather than
//! rejected; every component clamps through these functions so the limits
//! stay in one place.

/// Minimum trim window length, in seconds.
pub const TRIM_EPSILON_SECS: f64 = 0.1;

/// Practical playback-rate range.
pub const MIN_PLAYBACK_RATE: f64 = 0.1;
pub const MAX_PLAYBACK_RATE: f64 = 3.0;

/// Rates within this distance of 1.0 are played unscaled.
pub const RATE_TOLERANCE: f64 = 1e-3;

/// Overlay gain ceiling.
pub const MAX_VOLUME: f64 = 2.0;

/// Clamp a trim window against a source of `source_duration` seconds.
///
/// `in_point` lands in `[0, duration - ε]` and `out_point` in
/// `[in_point + ε, duration]`. When the window cannot fit (a source shorter
/// than ε) the minimum length wins. A non-positive or non-finite duration is
/// treated as unknown and only the lower bounds apply.
pub fn clamp_trim(in_point: f64, out_point: f64, source_duration: f64) -> (f64, f64) {
    let duration = if source_duration.is_finite() && source_duration > 0.0 {
        source_duration
    } else {
        f64::INFINITY
    };

    let in_point = if in_point.is_finite() { in_point } else { 0.0 };
    let out_point = if out_point.is_nan() { duration } else { out_point };

    let in_point = in_point.min(duration - TRIM_EPSILON_SECS).max(0.0);
    let out_point = out_point.min(duration).max(in_point + TRIM_EPSILON_SECS);
    (in_point, out_point)
}

/// Clamp a playback rate to the practical range. Non-finite or
/// non-positive rates play at normal speed.
pub fn clamp_rate(rate: f64) -> f64 {
    if !rate.is_finite() || rate <= 0.0 {
        return 1.0;
    }
    rate.clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE)
}

/// Whether a (clamped) rate needs no time scaling.
pub fn is_unit_rate(rate: f64) -> bool {
    (rate - 1.0).abs() <= RATE_TOLERANCE
}

/// Clamp an overlay gain to `[0, 2]`. NaN is treated as unity.
pub fn clamp_volume(volume: f64) -> f64 {
    if volume.is_nan() {
        return 1.0;
    }
    volume.clamp(0.0, MAX_VOLUME)
}
