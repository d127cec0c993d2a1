//! Embedding functions: the text → vector collaborator.
//!
//! The engine never trains or owns a model. It consumes any
//! [`EmbeddingFunction`] as a deterministic, fixed-dimension mapping and passes
//! its failures through as [`Error::Embedding`](crate::error::Error::Embedding).

/// Feature-hashing embedder used for tests, benches, and offline demos.
pub mod hashing;
/// Lowercasing tokenizer with stop word removal.
pub mod tokenizer;

pub use hashing::HashingEmbedder;

type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure reported by an embedding function (model unavailable, bad input, ...).
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct EmbeddingError {
    message: String,
    #[source]
    source: Option<BoxedSource>,
}

impl EmbeddingError {
    /// Creates an error with a message and no underlying cause.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps an underlying error from the provider.
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxedSource>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the provider's message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Maps text to a fixed-length vector.
///
/// Implementations must be deterministic for a given configuration and must
/// always return vectors of the same length.
pub trait EmbeddingFunction: Send + Sync {
    /// Embeds a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embeds a batch of texts, preserving order. Fails on the first error.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

impl<F> EmbeddingFunction for F
where
    F: Fn(&str) -> Result<Vec<f32>, EmbeddingError> + Send + Sync,
{
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self(text)
    }
}
