//! Domain-weighted cosine similarity.
//!
//! `DOMAIN_WEIGHT` is one global scalar applied after the cosine ratio. It
//! scales every score uniformly and is not a per-dimension feature weight.

use crate::error::{CoreError, Result};

/// Uniform amplification applied to every cosine score
pub const DOMAIN_WEIGHT: f64 = 1.2;

/// Score returned when either vector has zero magnitude
pub const UNDEFINED_SIMILARITY: f64 = 0.0;

/// Fail with `LengthMismatch` unless both vectors have the same dimension.
pub fn check_dimensions(a: &[f64], b: &[f64]) -> Result<()> {
    if a.len() != b.len() {
        return Err(CoreError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(())
}

/// Largest absolute component, 0 for an empty vector. NaN components are ignored.
pub fn max_abs(v: &[f64]) -> f64 {
    v.iter().fold(0.0, |m, x| m.max(x.abs()))
}

/// Per-vector scale factors that keep the squared sums representable.
///
/// `None` when either vector has zero magnitude or an infinite component,
/// in which case the score is `UNDEFINED_SIMILARITY`.
pub fn scale_factors(a: &[f64], b: &[f64]) -> Option<(f64, f64)> {
    let (scale_a, scale_b) = (max_abs(a), max_abs(b));
    if scale_a == 0.0 || scale_b == 0.0 || !scale_a.is_finite() || !scale_b.is_finite() {
        return None;
    }
    Some((scale_a, scale_b))
}

/// Combine accumulated sums into the final weighted score.
///
/// Zero magnitudes and non-finite results map to `UNDEFINED_SIMILARITY`.
pub fn weighted_cosine(dot: f64, norm_a_sq: f64, norm_b_sq: f64) -> f64 {
    if norm_a_sq == 0.0 || norm_b_sq == 0.0 {
        return UNDEFINED_SIMILARITY;
    }

    let score = dot / (norm_a_sq.sqrt() * norm_b_sq.sqrt()) * DOMAIN_WEIGHT;
    if score.is_finite() {
        score
    } else {
        UNDEFINED_SIMILARITY
    }
}

/// Reference similarity kernel: one sequential pass over both vectors.
///
/// Each vector is divided by its largest component first; cosine is
/// invariant under that scaling and the sums cannot underflow or overflow.
pub fn similarity(a: &[f64], b: &[f64]) -> Result<f64> {
    check_dimensions(a, b)?;

    let Some((scale_a, scale_b)) = scale_factors(a, b) else {
        return Ok(UNDEFINED_SIMILARITY);
    };

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;

    for (x, y) in a.iter().zip(b) {
        let (x, y) = (x / scale_a, y / scale_b);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    Ok(weighted_cosine(dot, norm_a, norm_b))
}
