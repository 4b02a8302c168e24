//! Decay calculator (spec §4.2). Pure functions; no collaborator calls.

use chrono::{DateTime, Utc};

const DEFAULT_HALF_LIFE_HOURS: f64 = 168.0;
const WRITE_BACK_EPSILON: f32 = 1e-3;
const ACCESS_BOOST: f32 = 0.1;

/// Hours between `reference` and `now`, floored at zero so a
/// reference time in the future never produces a negative decay.
fn hours_since(reference: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - reference).num_milliseconds().max(0) as f64 / 3_600_000.0
}

/// `exp(-λ · hours_since_ref)` with `λ = ln 2 / half_life_hours`.
pub fn decay_factor(reference: DateTime<Utc>, now: DateTime<Utc>, half_life_hours: f64) -> f32 {
    let lambda = std::f64::consts::LN_2 / half_life_hours;
    (-lambda * hours_since(reference, now)).exp() as f32
}

/// `(clamp(importance,0,1) + decay_factor) / 2`, always in `[0, 1]`.
pub fn combined_score(importance: f32, reference: DateTime<Utc>, now: DateTime<Utc>, half_life_hours: f64) -> f32 {
    let factor = decay_factor(reference, now, half_life_hours);
    (importance.clamp(0.0, 1.0) + factor) / 2.0
}

/// Recompute a memory's score with the default half-life. `None` means
/// the change is below the write-back threshold and should be skipped.
pub fn recompute(importance: f32, reference: DateTime<Utc>, now: DateTime<Utc>, stored_score: f32) -> Option<f32> {
    let score = combined_score(importance, reference, now, DEFAULT_HALF_LIFE_HOURS);
    if (score - stored_score).abs() < WRITE_BACK_EPSILON {
        None
    } else {
        Some(score)
    }
}

/// Access boost: `+0.1`, clamped at `1.0` (spec §4.2).
pub fn boost(current_score: f32) -> f32 {
    (current_score + ACCESS_BOOST).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn decay_factor_is_one_at_zero_elapsed() {
        let now = Utc::now();
        assert!((decay_factor(now, now, DEFAULT_HALF_LIFE_HOURS) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn decay_factor_is_half_at_one_half_life() {
        let now = Utc::now();
        let reference = now - Duration::hours(168);
        let factor = decay_factor(reference, now, DEFAULT_HALF_LIFE_HOURS);
        assert!((factor - 0.5).abs() < 1e-3, "factor = {factor}");
    }

    #[test]
    fn combined_score_is_bounded_when_both_components_are_maxed() {
        let now = Utc::now();
        let score = combined_score(1.0, now, now, DEFAULT_HALF_LIFE_HOURS);
        assert!(score <= 1.0);
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn recompute_skips_tiny_changes() {
        let now = Utc::now();
        let score = combined_score(0.5, now, now, DEFAULT_HALF_LIFE_HOURS);
        assert!(recompute(0.5, now, now, score).is_none());
        assert!(recompute(0.5, now, now, score - 0.5).is_some());
    }

    #[test]
    fn boost_clamps_at_one() {
        assert_eq!(boost(0.95), 1.0);
        assert!((boost(0.5) - 0.6).abs() < 1e-6);
    }
}
