//! Result types for similarity queries.

use crate::document::Document;
use std::sync::Arc;

/// One hit of a similarity query.
///
/// `distance` is the raw metric value (cosine distance = `1 - cosine_similarity`
/// for cosine collections); smaller means more similar.
#[derive(Debug, Clone)]
pub struct QueryMatch {
    /// Id of the matched document.
    pub id: String,
    /// Distance from the query vector.
    pub distance: f32,
    /// The matched document (shared reference).
    pub document: Arc<Document>,
}
