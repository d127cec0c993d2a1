//! Global configuration constants for docsim.
//!
//! All tuning parameters and input validation limits are defined here.
//! These are compile-time constants; per-collection runtime configuration
//! lives in [`CollectionConfig`](crate::storage::CollectionConfig) and
//! [`HnswConfig`](crate::hnsw::HnswConfig).

/// Default number of bidirectional links per HNSW node.
///
/// Higher values improve recall but increase memory and build time.
/// Typical range: 8–64. Default: 16.
pub const HNSW_DEFAULT_M: usize = 16;

/// Default ef parameter during HNSW index construction.
///
/// Controls the size of the dynamic candidate list during insertion.
/// Higher values produce a better graph but slow down build time.
pub const HNSW_DEFAULT_EF_CONSTRUCTION: usize = 200;

/// Default ef parameter during HNSW search.
///
/// Controls the size of the dynamic candidate list during query.
/// Higher values improve recall at the cost of latency.
pub const HNSW_DEFAULT_EF_SEARCH: usize = 50;

/// Maximum number of layers in the HNSW graph.
pub const HNSW_DEFAULT_MAX_LAYERS: usize = 16;

/// Seed for the level generator when none is configured.
pub const HNSW_DEFAULT_SEED: u64 = 0x5eed_d0c5;

/// Candidate pool multiplier for filtered similarity queries.
///
/// A filtered query for `n` results first asks the index for `n * OVERFETCH_MULTIPLIER`
/// candidates before applying the predicate.
pub const OVERFETCH_MULTIPLIER: usize = 4;

/// Number of times the candidate pool is doubled before falling back to a full scan.
pub const OVERFETCH_ESCALATIONS: usize = 1;

/// Documents scanned between cancellation checks in the brute-force fallback.
pub const BRUTE_FORCE_CANCEL_CHECK_INTERVAL: usize = 256;

/// Fraction of soft-deleted graph nodes that triggers an index rebuild. 0.0 = disabled.
pub const DEFAULT_AUTO_COMPACT_RATIO: f32 = 0.2;

/// Maximum allowed embedding dimension.
pub const MAX_DIMENSION: usize = 4096;

/// Maximum number of results (`n`) per query.
pub const MAX_K: usize = 10_000;

/// Maximum length of a collection name in characters.
pub const MAX_COLLECTION_NAME_LEN: usize = 128;

/// Maximum number of documents per `add` call.
pub const MAX_BATCH_SIZE: usize = 10_000;

/// Output dimension of [`HashingEmbedder::default`](crate::embedding::HashingEmbedder).
pub const HASHING_EMBEDDER_DEFAULT_DIM: usize = 384;
