//! Core document types for docsim.
//!
//! A `Document` is a stored record with a caller-chosen string id, text
//! content, arbitrary key-value metadata, and its embedding vector.
//! `MetadataValue` supports boolean, integer, float, and string values for use
//! in filtered queries.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Attribute map attached to a document.
pub type Metadata = HashMap<String, MetadataValue>;

/// A typed metadata value attached to a document.
///
/// Serializes untagged, so JSON `{"rating": 4.5, "genre": "Fantasy"}` maps
/// directly onto `Float` and `String` values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// Boolean value (`true` / `false`).
    Boolean(bool),
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit floating-point number.
    Float(f64),
    /// UTF-8 string.
    String(String),
}

impl MetadataValue {
    /// Returns the value as `f64` if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Integer(i) => Some(*i as f64),
            MetadataValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Converts a JSON scalar. Arrays, objects, and null yield `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(MetadataValue::Boolean(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(MetadataValue::Integer)
                .or_else(|| n.as_f64().map(MetadataValue::Float)),
            serde_json::Value::String(s) => Some(MetadataValue::String(s.clone())),
            _ => None,
        }
    }

    /// Type-aware equality: strings and booleans match only their own kind,
    /// integers and floats compare numerically with each other.
    pub fn loose_eq(&self, other: &MetadataValue) -> bool {
        match (self, other) {
            (MetadataValue::String(a), MetadataValue::String(b)) => a == b,
            (MetadataValue::Boolean(a), MetadataValue::Boolean(b)) => a == b,
            (MetadataValue::Integer(a), MetadataValue::Integer(b)) => a == b,
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }
}

impl From<bool> for MetadataValue {
    fn from(v: bool) -> Self {
        MetadataValue::Boolean(v)
    }
}

impl From<i64> for MetadataValue {
    fn from(v: i64) -> Self {
        MetadataValue::Integer(v)
    }
}

impl From<i32> for MetadataValue {
    fn from(v: i32) -> Self {
        MetadataValue::Integer(i64::from(v))
    }
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        MetadataValue::Float(v)
    }
}

impl From<&str> for MetadataValue {
    fn from(v: &str) -> Self {
        MetadataValue::String(v.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(v: String) -> Self {
        MetadataValue::String(v)
    }
}

/// A stored document: id, text, metadata, and embedding.
///
/// Documents are immutable once stored; re-adding the same id replaces the
/// whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Caller-chosen identifier, unique within a collection.
    pub id: String,
    /// Text content the embedding was computed from.
    pub text: String,
    /// Arbitrary key-value metadata for filtering.
    pub metadata: Metadata,
    /// Embedding vector.
    pub embedding: Vec<f32>,
}

impl Document {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        metadata: Metadata,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata,
            embedding,
        }
    }

    /// Returns the embedding dimension.
    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }
}
