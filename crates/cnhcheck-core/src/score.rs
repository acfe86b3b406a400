//! Score scale helpers.
//!
//! The provider reports liveness and face similarity as probabilities in
//! `[0, 1]`. Everything downstream of the client works on a percentage scale
//! `[0, 100]`. Thresholds are applied to the unrounded percentage;
//! [`probability_to_percent`] is for display.

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Convert a provider probability to a percentage, rounded to two decimals.
pub fn probability_to_percent(probability: f64) -> f64 {
    round2(probability * 100.0)
}
