//! Face comparator.
//!
//! Decodes two encoded representations, measures Euclidean distance, and
//! turns the distance into a match decision plus a confidence score.

use serde::Serialize;

use crate::encoder::decode_embedding;
use crate::error::CompareError;

/// Default match tolerance: two faces within this embedding distance are
/// considered the same person.
pub const DEFAULT_TOLERANCE: f64 = 0.6;

/// Outcome of comparing two encoded representations.
///
/// `confidence` is `(1 - distance) * 100` and deliberately unclamped: it
/// goes negative or above 100 when the distance leaves [0, 1]. Callers must
/// not treat it as a percentage guarantee.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonResult {
    pub is_match: bool,
    pub distance: f64,
    pub confidence: f64,
}

/// Compare two encoded representations at the given tolerance.
///
/// The tolerance is taken as-is, including out-of-range values; bounds
/// checking is the caller's product decision, not the comparator's.
pub fn compare(
    encoding_a: &str,
    encoding_b: &str,
    tolerance: f64,
) -> Result<ComparisonResult, CompareError> {
    let a = decode_embedding(encoding_a)?;
    let b = decode_embedding(encoding_b)?;

    if a.len() != b.len() {
        return Err(CompareError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let distance = a.euclidean_distance(&b);
    Ok(ComparisonResult {
        is_match: distance <= tolerance,
        distance,
        confidence: (1.0 - distance) * 100.0,
    })
}
