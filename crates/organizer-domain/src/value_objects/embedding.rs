//! `Embedding` value object and finiteness/dimension validation helpers.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A dense vector produced by the embedding model, tagged with the model
/// that produced it. Dimension `d` is fixed per model; mixing dimensions in
/// one collection is forbidden.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    /// The vector's components.
    pub vector: Vec<f32>,
    /// Identifier of the model that produced this vector.
    pub model: String,
}

impl Embedding {
    /// Construct an embedding, failing if any component is non-finite.
    pub fn new(vector: Vec<f32>, model: impl Into<String>) -> Result<Self> {
        if vector.is_empty() || vector.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidArgument {
                message: "embedding vector must be non-empty and finite".to_string(),
            });
        }
        Ok(Self {
            vector,
            model: model.into(),
        })
    }

    /// Validate that this embedding matches a collection's declared
    /// dimension.
    pub fn validate_dimension(&self, expected: usize) -> Result<()> {
        if self.vector.len() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                actual: self.vector.len(),
            });
        }
        Ok(())
    }

    /// Cosine similarity between two equal-length vectors, or `0.0` if either
    /// is zero-length/zero-magnitude.
    #[must_use]
    pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot / (norm_a * norm_b)
    }

    /// Convert cosine distance to the normalized score used across the
    /// vector store adapter and the folder matcher: `max(0, 1 - distance/2)`
    #[must_use]
    pub fn score_from_distance(distance: f32) -> f32 {
        (1.0 - distance / 2.0).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_finite_vectors() {
        assert!(Embedding::new(vec![1.0, f32::NAN], "m").is_err());
        assert!(Embedding::new(vec![], "m").is_err());
    }

    #[test]
    fn dimension_validation() {
        let e = Embedding::new(vec![1.0, 2.0, 3.0], "m").unwrap();
        assert!(e.validate_dimension(3).is_ok());
        assert!(matches!(
            e.validate_dimension(4),
            Err(Error::DimensionMismatch {
                expected: 4,
                actual: 3
            })
        ));
    }

    #[test]
    fn identical_vectors_have_similarity_one() {
        let v = vec![1.0, 0.0, 0.0];
        assert!((Embedding::cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn score_floor_is_zero() {
        assert_eq!(Embedding::score_from_distance(3.0), 0.0);
    }
}
