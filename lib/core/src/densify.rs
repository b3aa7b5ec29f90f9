//! Densification of stored trait values into fixed-length [`TraitVector`]s.
//!
//! Term sets become binary indicator vectors over a vocabulary, topic
//! mixtures become length-`K` weight vectors, and semantic vectors are
//! already dense.

use crate::{Error, Result, TraitVector};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Term (stem) to column index mapping used for term-set densification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vocabulary {
    index: AHashMap<String, usize>,
}

impl Vocabulary {
    /// Build from an explicit term -> index map.
    ///
    /// Indices must all be below the number of terms.
    pub fn new(index: AHashMap<String, usize>) -> Result<Self> {
        let size = index.len();
        if let Some((term, &i)) = index.iter().find(|(_, &i)| i >= size) {
            return Err(Error::InvalidConfig(format!(
                "vocabulary index {} for term '{}' exceeds size {}",
                i, term, size
            )));
        }
        Ok(Self { index })
    }

    /// Assign indices in iteration order, skipping duplicates
    pub fn from_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut index = AHashMap::new();
        for term in terms {
            let next = index.len();
            index.entry(term.into()).or_insert(next);
        }
        Self { index }
    }

    /// Load a JSON object of the form `{"stem": index, ...}`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let index: AHashMap<String, usize> = serde_json::from_slice(&bytes)?;
        Self::new(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[inline]
    pub fn get(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }
}

/// Binary indicator vector of length `vocabulary.len()`.
///
/// Terms missing from the vocabulary are skipped; the number skipped is
/// logged at debug level.
pub fn densify_term_set<S: AsRef<str>>(terms: &[S], vocabulary: &Vocabulary) -> TraitVector {
    let mut dense = TraitVector::zeros(vocabulary.len());
    let mut dropped = 0usize;
    for term in terms {
        match vocabulary.get(term.as_ref()) {
            Some(i) => dense.as_mut_slice()[i] = 1.0,
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        tracing::debug!(dropped, total = terms.len(), "skipped out-of-vocabulary terms");
    }
    dense
}

/// Length-`topics` vector of topic weights.
///
/// With `normalize`, topics absent from `pairs` share the remaining mass
/// equally, so the result sums to 1. That needs at least one absent topic.
pub fn densify_topic_mixture(
    pairs: &[(usize, f64)],
    topics: usize,
    normalize: bool,
) -> Result<TraitVector> {
    if let Some(&(index, _)) = pairs.iter().find(|(t, _)| *t >= topics) {
        return Err(Error::TopicOutOfRange { index, topics });
    }

    let fill = if normalize {
        if pairs.len() >= topics {
            return Err(Error::DegenerateMixture { topics });
        }
        let given: f64 = pairs.iter().map(|(_, w)| w).sum();
        (1.0 - given) / (topics - pairs.len()) as f64
    } else {
        0.0
    };

    let mut dense = TraitVector::new(vec![fill; topics]);
    for &(topic, weight) in pairs {
        dense.as_mut_slice()[topic] = weight;
    }
    Ok(dense)
}

#[inline]
pub fn densify_semantic_vector(v: &[f64]) -> TraitVector {
    TraitVector::from_slice(v)
}
