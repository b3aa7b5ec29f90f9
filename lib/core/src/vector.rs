use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// Dense numeric form of a trait value, used for distance and variance math
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraitVector {
    data: Vec<f64>,
}

impl TraitVector {
    #[inline]
    #[must_use]
    pub fn new(data: Vec<f64>) -> Self {
        Self { data }
    }

    #[inline]
    #[must_use]
    pub fn zeros(dim: usize) -> Self {
        Self {
            data: vec![0.0; dim],
        }
    }

    #[inline]
    #[must_use]
    pub fn from_slice(data: &[f64]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }

    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    #[inline]
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    #[inline]
    #[must_use]
    pub fn dot(&self, other: &TraitVector) -> f64 {
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a * b)
            .sum()
    }

    /// Euclidean norm
    #[inline]
    #[must_use]
    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Unit-length copy. Fails on the zero vector, which has no direction.
    pub fn normalized(&self) -> Result<Self> {
        let norm = self.norm();
        if norm == 0.0 || !norm.is_finite() {
            return Err(Error::ZeroVector);
        }
        let inv_norm = 1.0 / norm;
        Ok(Self::new(self.data.iter().map(|x| x * inv_norm).collect()))
    }

    /// Cosine similarity of the normalized vectors
    pub fn cosine_similarity(&self, other: &TraitVector) -> Result<f64> {
        if self.dim() != other.dim() {
            return Err(Error::DimensionMismatch {
                expected: self.dim(),
                actual: other.dim(),
            });
        }
        let a = self.normalized()?;
        let b = other.normalized()?;
        Ok(a.dot(&b))
    }

    /// Component-wise population variance of a set of equal-length vectors.
    ///
    /// An empty set yields `None`; a single vector yields all zeros.
    pub fn component_variance(vectors: &[TraitVector]) -> Result<Option<TraitVector>> {
        let first = match vectors.first() {
            Some(v) => v,
            None => return Ok(None),
        };
        let dim = first.dim();
        let n = vectors.len() as f64;

        let mut mean = TraitVector::zeros(dim);
        for v in vectors {
            if v.dim() != dim {
                return Err(Error::DimensionMismatch {
                    expected: dim,
                    actual: v.dim(),
                });
            }
            mean = &mean + v;
        }
        for x in mean.as_mut_slice() {
            *x /= n;
        }

        let mut variance = TraitVector::zeros(dim);
        for v in vectors {
            let diff = v - &mean;
            for (acc, d) in variance.as_mut_slice().iter_mut().zip(diff.as_slice()) {
                *acc += d * d;
            }
        }
        for x in variance.as_mut_slice() {
            *x /= n;
        }
        Ok(Some(variance))
    }
}

impl From<Vec<f64>> for TraitVector {
    fn from(data: Vec<f64>) -> Self {
        Self::new(data)
    }
}

impl Add for &TraitVector {
    type Output = TraitVector;

    fn add(self, other: &TraitVector) -> TraitVector {
        assert_eq!(self.dim(), other.dim());
        TraitVector::new(
            self.data
                .iter()
                .zip(other.data.iter())
                .map(|(a, b)| a + b)
                .collect(),
        )
    }
}

impl Sub for &TraitVector {
    type Output = TraitVector;

    fn sub(self, other: &TraitVector) -> TraitVector {
        assert_eq!(self.dim(), other.dim());
        TraitVector::new(
            self.data
                .iter()
                .zip(other.data.iter())
                .map(|(a, b)| a - b)
                .collect(),
        )
    }
}
