//! Deterministic feature-hashing embedder.
//!
//! Each token (and each adjacent token pair, at half weight) is hashed with
//! 64-bit FNV-1a into one of `dimension` buckets with a hash-derived sign; the
//! result is L2-normalized. Texts sharing vocabulary land close under cosine
//! distance, which is enough for tests and offline demos.

use crate::config;
use crate::embedding::tokenizer::tokenize;
use crate::embedding::{EmbeddingError, EmbeddingFunction};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
const BIGRAM_WEIGHT: f32 = 0.5;

fn fnv1a(parts: &[&str]) -> u64 {
    let mut hash = FNV_OFFSET;
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hash ^= u64::from(b' ');
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        for &b in part.as_bytes() {
            hash ^= u64::from(b);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}

/// Bag-of-words embedder using the hashing trick.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    /// Creates an embedder producing vectors of `dimension` components.
    pub fn new(dimension: usize) -> Result<Self, EmbeddingError> {
        if dimension == 0 || dimension > config::MAX_DIMENSION {
            return Err(EmbeddingError::new(format!(
                "hashing embedder dimension must be in 1..={}, got {}",
                config::MAX_DIMENSION,
                dimension
            )));
        }
        Ok(Self { dimension })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn accumulate(&self, out: &mut [f32], hash: u64, weight: f32) {
        let bucket = (hash % self.dimension as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        out[bucket] += sign * weight;
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dimension: config::HASHING_EMBEDDER_DEFAULT_DIM,
        }
    }
}

impl EmbeddingFunction for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let tokens = tokenize(text);
        let mut out = vec![0.0f32; self.dimension];
        for token in tokens.iter() {
            self.accumulate(&mut out, fnv1a(&[token]), 1.0);
        }
        for (a, b) in tokens.bigrams() {
            self.accumulate(&mut out, fnv1a(&[a, b]), BIGRAM_WEIGHT);
        }

        let norm = out.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            out.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(out)
    }
}
