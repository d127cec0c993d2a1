//! # docsim-core
//!
//! Embeddable in-memory document store with HNSW approximate nearest neighbor
//! search and metadata filtering.
//!
//! Documents (text, metadata, embedding) live in named collections. A
//! collection answers exact attribute queries (`get`) and similarity queries
//! (`query`) narrowed by the same predicates. Text is turned into vectors by a
//! pluggable [`EmbeddingFunction`].
//!
//! ```
//! use docsim_core::{CollectionConfig, Database, Metadata, MetadataValue, Predicate};
//!
//! let db = Database::new();
//! let books = db.create_collection("books", CollectionConfig::default()).unwrap();
//!
//! let mut meta = Metadata::new();
//! meta.insert("rating".into(), MetadataValue::Float(4.5));
//! books
//!     .add(&["b1".to_string()], &["A novel about the sea".to_string()], &[meta])
//!     .unwrap();
//!
//! let good = Predicate::gte("rating", 4.0);
//! let hits = books.query(&["ocean story".to_string()], 1, Some(&good)).unwrap();
//! assert_eq!(hits[0][0].id, "b1");
//! ```

/// Global configuration constants: limits, defaults, and tuning parameters.
pub mod config;
/// Core document types: `Document` struct and `MetadataValue` enum.
pub mod document;
/// Embedding function trait and the built-in hashing embedder.
pub mod embedding;
/// Error type shared by every operation.
pub mod error;
/// Predicate tree used by `get`, `query` and `delete_where`.
pub mod filter_types;
/// HNSW approximate nearest neighbor index: graph structure, search, insertion, and distance metrics.
pub mod hnsw;
/// Search primitives: metadata filtering, query execution, and result types.
pub mod search;
/// Storage layer: document store, collections, and database.
pub mod storage;

pub use document::{Document, Metadata, MetadataValue};
pub use embedding::{EmbeddingError, EmbeddingFunction, HashingEmbedder};
pub use error::{Error, Result};
pub use filter_types::{FilterCondition, FilterOperator, Predicate};
pub use hnsw::{DistanceMetric, HnswConfig};
pub use search::{CancelToken, QueryMatch};
pub use storage::{Collection, CollectionConfig, Database, DocumentStore, IfExists};
