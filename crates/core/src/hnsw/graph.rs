//! HNSW graph structure and configuration.
//!
//! [`HnswConfig`] defines tuning parameters (M, ef_construction, ef_search, distance metric).
//! [`HnswIndex`] stores the graph using Struct-of-Arrays layout: all vectors live in one
//! contiguous f32 arena, with separate arrays for neighbor lists, layer assignments and
//! soft-delete flags, all addressed by the node's internal `u32` id.

use crate::config;
use crate::error::{Error, Result};
use crate::hnsw::distance::DistanceMetric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Configuration parameters for an HNSW index.
///
/// Controls the trade-off between build speed, search speed, recall, and memory usage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HnswConfig {
    /// Number of bidirectional links per node (except layer 0, which uses `m_max0`).
    pub m: usize,
    /// Maximum links per node at layer 0 (typically `2 * m`).
    pub m_max0: usize,
    /// Candidate list size during index construction.
    pub ef_construction: usize,
    /// Candidate list size during search (higher = better recall, slower).
    pub ef_search: usize,
    /// Maximum number of layers in the graph.
    pub max_layers: usize,
    /// Distance function for similarity computation.
    #[serde(rename = "space")]
    pub distance_metric: DistanceMetric,
    /// Seed for the level generator. Equal seeds and insert order give identical graphs.
    pub seed: u64,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            m: config::HNSW_DEFAULT_M,
            m_max0: config::HNSW_DEFAULT_M * 2,
            ef_construction: config::HNSW_DEFAULT_EF_CONSTRUCTION,
            ef_search: config::HNSW_DEFAULT_EF_SEARCH,
            max_layers: config::HNSW_DEFAULT_MAX_LAYERS,
            distance_metric: DistanceMetric::Cosine,
            seed: config::HNSW_DEFAULT_SEED,
        }
    }
}

impl HnswConfig {
    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.distance_metric = metric;
        self
    }

    /// Sets `m` and `m_max0 = 2 * m`.
    pub fn with_m(mut self, m: usize) -> Self {
        self.m = m;
        self.m_max0 = m * 2;
        self
    }

    pub fn with_ef_construction(mut self, ef: usize) -> Self {
        self.ef_construction = ef;
        self
    }

    pub fn with_ef_search(mut self, ef: usize) -> Self {
        self.ef_search = ef;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Checks that the parameters describe a usable graph.
    pub fn validate(&self) -> Result<()> {
        if self.m < 2 {
            return Err(Error::validation(format!("m must be >= 2, got {}", self.m)));
        }
        if self.m_max0 < self.m {
            return Err(Error::validation(format!(
                "m_max0 ({}) must be >= m ({})",
                self.m_max0, self.m
            )));
        }
        if self.ef_construction == 0 || self.ef_search == 0 {
            return Err(Error::validation("ef_construction and ef_search must be > 0"));
        }
        if self.max_layers == 0 || self.max_layers > usize::from(u8::MAX) {
            return Err(Error::validation(format!(
                "max_layers must be in 1..=255, got {}",
                self.max_layers
            )));
        }
        Ok(())
    }

    /// Degree cap for the given layer.
    #[inline]
    pub fn max_degree(&self, layer: usize) -> usize {
        if layer == 0 {
            self.m_max0
        } else {
            self.m
        }
    }
}

/// HNSW index in Struct-of-Arrays layout. No per-node struct; every array is
/// indexed by internal id.
#[derive(Debug, Clone)]
pub struct HnswIndex {
    pub config: HnswConfig,
    // SoA: raw f32 vector arena, `dimension` floats per node
    pub vectors: Vec<f32>,
    // SoA: graph structure
    pub neighbors: Vec<Vec<Vec<u32>>>, // [node_id][layer][neighbor_ids]
    pub layers: Vec<u8>,
    pub deleted: Vec<bool>,
    pub entry_point: Option<u32>,
    pub max_layer: usize,
    pub dimension: usize,
    pub node_count: u32,
    deleted_count: usize,
    rng: StdRng,
}

impl HnswIndex {
    /// Creates a new empty HNSW index with the given dimension and configuration.
    ///
    /// Fails with `Validation` if `config` does not pass [`HnswConfig::validate`].
    pub fn new(dimension: usize, config: HnswConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::empty(dimension, config))
    }

    /// Empty index over a config that has already been validated.
    pub(crate) fn empty(dimension: usize, config: HnswConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            vectors: Vec::new(),
            neighbors: Vec::new(),
            layers: Vec::new(),
            deleted: Vec::new(),
            entry_point: None,
            max_layer: 0,
            dimension,
            node_count: 0,
            deleted_count: 0,
            rng,
        }
    }

    /// Creates a new empty HNSW index with default configuration (cosine, M=16, ef_c=200).
    pub fn with_default_config(dimension: usize) -> Self {
        Self::empty(dimension, HnswConfig::default())
    }

    /// Returns the number of non-deleted nodes in the index.
    pub fn len(&self) -> usize {
        self.node_count as usize - self.deleted_count
    }

    /// Returns `true` if the index contains no non-deleted nodes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of soft-deleted nodes still present in the graph.
    pub fn deleted_count(&self) -> usize {
        self.deleted_count
    }

    /// Fraction of graph nodes that are soft-deleted.
    pub fn deleted_ratio(&self) -> f32 {
        if self.node_count == 0 {
            0.0
        } else {
            self.deleted_count as f32 / self.node_count as f32
        }
    }

    /// Draw a layer for a new node: `floor(-ln(U) / ln(m))`, capped at `max_layers - 1`.
    pub fn random_level(&mut self) -> usize {
        let ml = 1.0 / (self.config.m as f64).ln();
        // gen::<f64>() is in [0, 1); map to (0, 1] so ln() stays finite
        let r: f64 = 1.0 - self.rng.gen::<f64>();
        let level = (-r.ln() * ml).floor() as usize;
        level.min(self.config.max_layers.saturating_sub(1))
    }

    /// Get the stored vector of a node. O(1) slice into the arena.
    #[inline]
    pub fn vector(&self, id: u32) -> &[f32] {
        let start = id as usize * self.dimension;
        &self.vectors[start..start + self.dimension]
    }

    /// Returns `true` if the node with the given internal ID has been soft-deleted.
    #[inline]
    pub fn is_deleted(&self, id: u32) -> bool {
        self.deleted[id as usize]
    }

    /// Returns the layer assignment of the given node.
    #[inline]
    pub fn get_layer(&self, id: u32) -> u8 {
        self.layers[id as usize]
    }

    /// Distance between two stored nodes.
    #[inline]
    pub fn node_distance(&self, a: u32, b: u32) -> f32 {
        self.config
            .distance_metric
            .distance(self.vector(a), self.vector(b))
    }

    /// Mark a node as deleted by internal ID. Returns `false` if the id is
    /// unknown or already deleted.
    pub fn mark_deleted(&mut self, internal_id: u32) -> bool {
        match self.deleted.get_mut(internal_id as usize) {
            Some(flag) if !*flag => {
                *flag = true;
                self.deleted_count += 1;
                true
            }
            _ => false,
        }
    }

    /// Rejects vectors of the wrong length or with non-finite components.
    pub fn check_vector(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(Error::validation(format!(
                "expected embedding of dimension {}, got {}",
                self.dimension,
                vector.len()
            )));
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(Error::validation("embedding contains NaN or infinite values"));
        }
        Ok(())
    }

    /// Checks graph invariants: parallel array lengths, entry point and neighbor
    /// ids in bounds, and per-layer degree caps.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let nc = self.node_count as usize;
        if self.vectors.len() != nc * self.dimension {
            return Err(format!(
                "vectors length {} != node_count({}) * dimension({})",
                self.vectors.len(),
                nc,
                self.dimension
            ));
        }
        if self.neighbors.len() != nc || self.layers.len() != nc || self.deleted.len() != nc {
            return Err(format!(
                "parallel arrays disagree: neighbors={}, layers={}, deleted={}, node_count={}",
                self.neighbors.len(),
                self.layers.len(),
                self.deleted.len(),
                nc
            ));
        }
        match self.entry_point {
            Some(ep) if ep as usize >= nc => {
                return Err(format!("entry_point {} >= node_count {}", ep, nc));
            }
            None if nc > 0 => return Err("non-empty graph has no entry point".to_string()),
            _ => {}
        }
        for (node_id, node_neighbors) in self.neighbors.iter().enumerate() {
            for (layer, layer_neighbors) in node_neighbors.iter().enumerate() {
                if layer_neighbors.len() > self.config.max_degree(layer) {
                    return Err(format!(
                        "node {} has {} links at layer {} (cap {})",
                        node_id,
                        layer_neighbors.len(),
                        layer,
                        self.config.max_degree(layer)
                    ));
                }
                if let Some(&bad) = layer_neighbors.iter().find(|&&n| n as usize >= nc) {
                    return Err(format!(
                        "neighbor {} out of bounds (node_count={}) at node {} layer {}",
                        bad, nc, node_id, layer
                    ));
                }
            }
        }

        Ok(())
    }

    /// Counts nodes not reachable from the entry point over layer-0 links.
    /// Connectivity is a property of the insertion heuristic, not enforced per insert.
    pub fn unreachable_count(&self) -> usize {
        let Some(ep) = self.entry_point else {
            return 0;
        };
        let mut seen = vec![false; self.node_count as usize];
        let mut stack = vec![ep];
        seen[ep as usize] = true;
        while let Some(id) = stack.pop() {
            if let Some(level0) = self.neighbors[id as usize].first() {
                for &n in level0 {
                    if !seen[n as usize] {
                        seen[n as usize] = true;
                        stack.push(n);
                    }
                }
            }
        }
        seen.iter().filter(|&&s| !s).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = HnswConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.m_max0, 2 * cfg.m);
        assert_eq!(cfg.max_degree(0), cfg.m_max0);
        assert_eq!(cfg.max_degree(3), cfg.m);
    }

    #[test]
    fn test_config_validation() {
        assert!(HnswConfig::default().with_m(1).validate().is_err());
        assert!(HnswConfig::default().with_ef_search(0).validate().is_err());
        let cfg = HnswConfig {
            max_layers: 0,
            ..HnswConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_config_deserialize_space() {
        let cfg: HnswConfig = serde_json::from_str(r#"{"space": "l2", "m": 8}"#).unwrap();
        assert_eq!(cfg.distance_metric, DistanceMetric::Euclidean);
        assert_eq!(cfg.m, 8);
        assert_eq!(cfg.ef_search, config::HNSW_DEFAULT_EF_SEARCH);
    }

    #[test]
    fn test_random_level_distribution() {
        let mut index = HnswIndex::with_default_config(4);
        let levels: Vec<usize> = (0..10_000).map(|_| index.random_level()).collect();
        let zeros = levels.iter().filter(|&&l| l == 0).count();
        // P(level 0) = 1 - 1/m = 0.9375 for m = 16
        assert!(zeros > 9_000 && zeros < 9_700, "level-0 count {zeros}");
        assert!(levels.iter().all(|&l| l < config::HNSW_DEFAULT_MAX_LAYERS));
    }

    #[test]
    fn test_random_level_is_seeded() {
        let mut a = HnswIndex::new(4, HnswConfig::default().with_seed(7)).unwrap();
        let mut b = HnswIndex::new(4, HnswConfig::default().with_seed(7)).unwrap();
        let la: Vec<usize> = (0..100).map(|_| a.random_level()).collect();
        let lb: Vec<usize> = (0..100).map(|_| b.random_level()).collect();
        assert_eq!(la, lb);
    }

    #[test]
    fn test_new_rejects_unusable_config() {
        let no_layers = HnswConfig {
            max_layers: 0,
            ..HnswConfig::default()
        };
        assert!(HnswIndex::new(4, no_layers).unwrap_err().is_validation());
        assert!(HnswIndex::new(4, HnswConfig::default().with_m(1))
            .unwrap_err()
            .is_validation());

        let mut index = HnswIndex::new(4, HnswConfig::default().with_m(2)).unwrap();
        assert!((0..1_000).all(|_| index.random_level() < config::HNSW_DEFAULT_MAX_LAYERS));
    }

    #[test]
    fn test_check_vector() {
        let index = HnswIndex::with_default_config(3);
        assert!(index.check_vector(&[1.0, 2.0, 3.0]).is_ok());
        assert!(index.check_vector(&[1.0, 2.0]).unwrap_err().is_validation());
        assert!(index.check_vector(&[1.0, f32::NAN, 3.0]).is_err());
    }

    #[test]
    fn test_empty_index() {
        let index = HnswIndex::with_default_config(3);
        assert!(index.is_empty());
        assert_eq!(index.deleted_ratio(), 0.0);
        assert!(index.validate().is_ok());
        assert_eq!(index.unreachable_count(), 0);
    }
}
