//! Trait distance functions
//!
//! Each function returns a scalar dissimilarity between two values of the
//! same trait kind. Larger means further apart.

use crate::densify::densify_topic_mixture;
use crate::{Result, TraitVector};
use ahash::AHashSet;

/// Assumed combined active-term count of two compared term sets
pub const TERM_SET_SPAN: f64 = 20.0;

/// `TERM_SET_SPAN - 2 * |a ∩ b|`.
///
/// This equals the Hamming distance between the two binary term vectors
/// only when each set holds exactly `TERM_SET_SPAN / 2` distinct terms
/// (the stored top-10 stems per record). For sets of other sizes it is a
/// monotone transform of the intersection size, so only compare values
/// produced under that fixed-cardinality assumption.
pub fn term_set_distance<S: AsRef<str>>(a: &[S], b: &[S]) -> f64 {
    let a: AHashSet<&str> = a.iter().map(|s| s.as_ref()).collect();
    let b: AHashSet<&str> = b.iter().map(|s| s.as_ref()).collect();
    let shared = a.intersection(&b).count();
    TERM_SET_SPAN - 2.0 * shared as f64
}

/// `1 - cos(a, b)` of the normalized vectors
pub fn vector_cosine_distance(a: &TraitVector, b: &TraitVector) -> Result<f64> {
    Ok(1.0 - a.cosine_similarity(b)?)
}

/// Cosine distance between two densified topic mixtures
pub fn topic_mixture_distance(
    a: &[(usize, f64)],
    b: &[(usize, f64)],
    topics: usize,
    normalize: bool,
) -> Result<f64> {
    let a = densify_topic_mixture(a, topics, normalize)?;
    let b = densify_topic_mixture(b, topics, normalize)?;
    vector_cosine_distance(&a, &b)
}
