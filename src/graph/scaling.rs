// Finding Correlations - Correlation Graph
// scaling.rs - Degree normalisation feeding node size
//
// The renderer maps the normalised value onto its own pixel range; that
// mapping is not done here.
//
// Copyright (c) 2026 CIPS Corps. All rights reserved.

/// Value returned when every node has the same degree.
pub const DEGENERATE_SCALE: f64 = 0.5;

/// Normalise `value` into [0.0, 1.0] against the observed degree range.
///
/// `(value - min) / (max - min)`, clamped. When `max == min` there is no
/// range to normalise against and the result is exactly [`DEGENERATE_SCALE`].
/// `total` is accepted to match the renderer's callback shape and is unused.
pub fn custom_scaling_function(min: f64, max: f64, _total: f64, value: f64) -> f64 {
    if max == min {
        return DEGENERATE_SCALE;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

/// Interpolate a normalised value onto `[lo, hi]`.
pub fn interpolate(scale: f64, lo: f64, hi: f64) -> f64 {
    lo + (hi - lo) * scale.clamp(0.0, 1.0)
}
