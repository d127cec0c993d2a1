//! Hierarchical Navigable Small World (HNSW) approximate nearest neighbor index.
//!
//! Nodes are addressed by dense `u32` internal ids assigned in insertion order;
//! every per-node array (vectors, neighbor lists, layers, delete flags) is indexed
//! by that id, so graph edits are plain vector updates. Mapping internal ids back
//! to document ids is the caller's job.

/// Distance metrics: cosine, euclidean, and dot product.
pub mod distance;
/// HNSW graph structure, configuration, and data storage.
pub mod graph;
/// HNSW insertion algorithm with bidirectional connections and heuristic pruning.
pub mod insert;
/// HNSW search: single-layer beam search, multi-layer KNN, and exact scan.
pub mod search;
/// Generation-based visited set for efficient graph traversal.
pub mod visited;

pub use distance::DistanceMetric;
pub use graph::{HnswConfig, HnswIndex};
pub use search::{exact_search, knn_search, Scored};
