//! Distance metric implementations for HNSW search.
//!
//! Supports three distance functions: cosine, euclidean (L2²), and dot product,
//! matching the `cosine` / `l2` / `ip` space names used in collection configuration.

use serde::{Deserialize, Serialize};

/// Distance metric used for vector similarity computation.
///
/// All metrics return a distance value where **lower is better** (more similar).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Cosine distance: `1 - cosine_similarity`. Range: \[0, 2\].
    #[default]
    #[serde(rename = "cosine")]
    Cosine,
    /// Squared Euclidean distance (L2²). Range: \[0, ∞).
    #[serde(rename = "l2")]
    Euclidean,
    /// Negative dot product: `-dot(a, b)`. Lower = higher similarity.
    #[serde(rename = "ip")]
    DotProduct,
}

impl DistanceMetric {
    /// Exact f32-vs-f32 distance.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Cosine => 1.0 - cosine_similarity(a, b),
            DistanceMetric::Euclidean => euclidean_sq(a, b),
            DistanceMetric::DotProduct => -dot_product(a, b),
        }
    }

    /// Cosine distance with the query's squared norm computed once by the caller.
    /// Other metrics ignore `query_norm_sq`.
    #[inline]
    pub fn distance_prenorm(&self, query: &[f32], stored: &[f32], query_norm_sq: f32) -> f32 {
        match self {
            DistanceMetric::Cosine => {
                let denom = (query_norm_sq * norm_sq(stored)).sqrt();
                if denom == 0.0 {
                    1.0
                } else {
                    1.0 - dot_product(query, stored) / denom
                }
            }
            _ => self.distance(query, stored),
        }
    }
}

/// Dot product, four lanes at a time so the optimizer can vectorize.
#[inline]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    let mut acc = [0.0f32; 4];
    let chunks_a = a.chunks_exact(4);
    let chunks_b = b.chunks_exact(4);
    let tail: f32 = chunks_a
        .remainder()
        .iter()
        .zip(chunks_b.remainder())
        .map(|(x, y)| x * y)
        .sum();
    for (ca, cb) in chunks_a.zip(chunks_b) {
        for i in 0..4 {
            acc[i] += ca[i] * cb[i];
        }
    }
    acc.iter().sum::<f32>() + tail
}

#[inline]
pub fn norm_sq(a: &[f32]) -> f32 {
    dot_product(a, a)
}

/// Cosine similarity. A zero vector has similarity 0 with everything.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let denom = (norm_sq(a) * norm_sq(b)).sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot_product(a, b) / denom
    }
}

pub fn euclidean_sq(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let d = DistanceMetric::Cosine.distance(&a, &a);
        assert!(d.abs() < 1e-6, "self-distance should be ~0, got {d}");
    }

    #[test]
    fn test_cosine_orthogonal_and_opposite() {
        let d = DistanceMetric::Cosine.distance(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]);
        assert!((d - 1.0).abs() < 1e-6);
        let d = DistanceMetric::Cosine.distance(&[1.0, 0.0], &[-1.0, 0.0]);
        assert!((d - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector() {
        let d = DistanceMetric::Cosine.distance(&[0.0, 0.0], &[1.0, 0.0]);
        assert_eq!(d, 1.0);
        let d = DistanceMetric::Cosine.distance_prenorm(&[0.0, 0.0], &[1.0, 0.0], 0.0);
        assert_eq!(d, 1.0);
    }

    #[test]
    fn test_prenorm_matches_exact() {
        let q = [0.5, -0.3, 0.8, 0.1, 0.9, -0.2, 0.6];
        let s = [0.7, 0.2, -0.5, 0.3, 0.1, 0.8, -0.4];
        let d1 = DistanceMetric::Cosine.distance(&q, &s);
        let d2 = DistanceMetric::Cosine.distance_prenorm(&q, &s, norm_sq(&q));
        assert!((d1 - d2).abs() < 1e-6, "{d1} vs {d2}");
    }

    #[test]
    fn test_euclidean() {
        let d = DistanceMetric::Euclidean.distance(&[0.0, 0.0, 0.0], &[3.0, 4.0, 0.0]);
        assert!((d - 25.0).abs() < 1e-4);
    }

    #[test]
    fn test_dot_product_metric() {
        let d = DistanceMetric::DotProduct.distance(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]);
        assert!((d + 32.0).abs() < 1e-4);
    }

    #[test]
    fn test_space_names() {
        for (name, metric) in [
            ("cosine", DistanceMetric::Cosine),
            ("l2", DistanceMetric::Euclidean),
            ("ip", DistanceMetric::DotProduct),
        ] {
            let json = format!("\"{name}\"");
            assert_eq!(serde_json::from_str::<DistanceMetric>(&json).unwrap(), metric);
            assert_eq!(serde_json::to_string(&metric).unwrap(), json);
        }
        assert!(serde_json::from_str::<DistanceMetric>("\"hamming\"").is_err());
    }
}
