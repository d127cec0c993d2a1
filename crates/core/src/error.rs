//! Error types for docsim.
//!
//! Every fallible public operation returns [`Result<T>`]. Validation happens
//! before any mutation, so an `Err` from a write leaves the collection untouched.

use crate::embedding::EmbeddingError;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the document store, index, or query layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed input: mismatched batch lengths, wrong dimension, duplicate id, bad filter.
    #[error("validation error: {0}")]
    Validation(String),

    /// Lookup of a document or collection that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A collection with the same name already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The embedding function failed. Passed through unmodified.
    #[error("embedding function failed")]
    Embedding(#[source] EmbeddingError),

    /// The request was cancelled through its [`CancelToken`](crate::search::CancelToken).
    #[error("query cancelled")]
    Cancelled,
}

impl Error {
    /// Returns true if the error was caused by the caller's input.
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<EmbeddingError> for Error {
    fn from(err: EmbeddingError) -> Self {
        Self::Embedding(err)
    }
}
