//! Search primitives: metadata filtering, query execution, and result types.

/// Over-fetching similarity search, brute-force fallback, and cancellation.
pub mod executor;
/// Metadata predicate evaluation.
pub mod filter;
/// Query result types.
pub mod types;

pub use executor::CancelToken;
pub use filter::matches_filter;
pub use types::QueryMatch;
