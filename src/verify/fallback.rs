//! Fallback Scorer
//!
//! Synthesizes a trust score when the oracle cannot be reached and the
//! failure policy is fail-open. Scores are drawn uniformly from
//! [0.4, 1.0), a range that sits mostly above the default threshold.

use rand::Rng;

/// Lower bound of the synthetic score range
pub const FALLBACK_FLOOR: f64 = 0.4;

/// Produce a synthetic trust score uniformly distributed in [0.4, 1.0)
pub fn fallback_score() -> f64 {
    rand::thread_rng().gen_range(FALLBACK_FLOOR..1.0)
}
