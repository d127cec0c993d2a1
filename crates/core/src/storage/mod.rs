//! Storage layer: documents, collections, and the database.
//!
//! Data lives in-memory only. A `Collection` owns a `DocumentStore` and an
//! HNSW index over the same documents; a `Database` maps names to collections.

/// Collection and database data structures.
pub mod collection;
/// Primary-key document table.
pub mod store;

pub use collection::{Collection, CollectionConfig, Database, IfExists};
pub use store::DocumentStore;
