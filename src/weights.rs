use serde::{Deserialize, Serialize};

use crate::error::{ensure_same_len, PipelineError, Result};

/// What to do with an observation whose total pixel count is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroTotalPolicy {
    /// The fraction becomes NaN and the observation gets weight 0
    #[default]
    Nan,
    /// Fail the whole call with `DivisionByZero`
    Fail,
}

/// Fraction of valid (unmasked) pixels per observation.
pub fn valid_fractions(valid: &[u64], total: &[u64], policy: ZeroTotalPolicy) -> Result<Vec<f64>> {
    ensure_same_len(valid.len(), total.len())?;

    valid
        .iter()
        .zip(total)
        .enumerate()
        .map(|(index, (&v, &t))| match (t, policy) {
            (0, ZeroTotalPolicy::Fail) => Err(PipelineError::DivisionByZero { index }),
            (0, ZeroTotalPolicy::Nan) => Ok(f64::NAN),
            _ => Ok(v as f64 / t as f64),
        })
        .collect()
}

/// Map a valid-pixel fraction onto the 0..=5 quality ladder.
///
/// Each band is exclusive at its lower cutoff. NaN falls through to 0.
pub fn weight_for_fraction(fraction: f64) -> u8 {
    if fraction > 0.80 {
        5
    } else if fraction > 0.65 {
        4
    } else if fraction > 0.55 {
        3
    } else if fraction > 0.40 {
        2
    } else if fraction > 0.30 {
        1
    } else {
        0
    }
}

pub fn assign_weights(fractions: &[f64]) -> Vec<u8> {
    fractions.iter().map(|&f| weight_for_fraction(f)).collect()
}

/// Fractions and weights in one call.
pub fn assign_weights_checked(
    valid: &[u64],
    total: &[u64],
    policy: ZeroTotalPolicy,
) -> Result<(Vec<f64>, Vec<u8>)> {
    let fractions = valid_fractions(valid, total, policy)?;
    let weights = assign_weights(&fractions);
    Ok((fractions, weights))
}
