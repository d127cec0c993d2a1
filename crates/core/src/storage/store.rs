//! Primary-key document table.
//!
//! [`DocumentStore`] maps document id → [`Document`] and fixes the embedding
//! dimension, either up front or on the first `put`. Iteration follows
//! insertion order; replacing a document keeps its original slot.
//! The store is not synchronized itself; `Collection` guards it with a lock.

use crate::document::Document;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    documents: IndexMap<String, Arc<Document>>,
    dimension: Option<usize>,
}

impl DocumentStore {
    /// Creates an empty store. `dimension = None` fixes it on the first `put`.
    pub fn new(dimension: Option<usize>) -> Self {
        Self {
            documents: IndexMap::new(),
            dimension,
        }
    }

    /// The fixed embedding dimension, if known yet.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Rejects an embedding whose length disagrees with the store's dimension.
    pub fn check_dimension(&self, embedding: &[f32]) -> Result<()> {
        match self.dimension {
            Some(dim) if dim != embedding.len() => Err(Error::validation(format!(
                "expected embedding of dimension {}, got {}",
                dim,
                embedding.len()
            ))),
            _ if embedding.is_empty() => Err(Error::validation("embedding must not be empty")),
            _ => Ok(()),
        }
    }

    /// Inserts or replaces a document by id. Returns the replaced document, if any.
    ///
    /// Fails with `Validation` before touching the table if the embedding
    /// dimension is wrong.
    pub fn put(&mut self, doc: Document) -> Result<Option<Arc<Document>>> {
        self.check_dimension(&doc.embedding)?;
        self.dimension.get_or_insert(doc.embedding.len());
        Ok(self.documents.insert(doc.id.clone(), Arc::new(doc)))
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Document>> {
        self.documents.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.documents.contains_key(id)
    }

    /// Removes a document. Returns `true` if it existed.
    pub fn delete(&mut self, id: &str) -> bool {
        self.documents.shift_remove(id).is_some()
    }

    /// Lazy pass over every document in store order. Each call starts fresh.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Document>> + '_ {
        self.documents.values()
    }

    /// Snapshot of all documents at call time.
    pub fn all(&self) -> Vec<Arc<Document>> {
        self.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Reverts a `put` of `id`: reinstates `previous` in its slot, or removes
    /// the entry if there was none, and restores the dimension seen before the write.
    pub(crate) fn undo_put(
        &mut self,
        id: &str,
        previous: Option<Arc<Document>>,
        dimension: Option<usize>,
    ) {
        match previous {
            Some(doc) => {
                self.documents.insert(id.to_string(), doc);
            }
            None => {
                self.documents.shift_remove(id);
            }
        }
        self.dimension = dimension;
    }

    /// Drops every document. The dimension resets to `dimension`.
    pub fn clear(&mut self, dimension: Option<usize>) {
        self.documents.clear();
        self.dimension = dimension;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Metadata, MetadataValue};

    fn doc(id: &str, embedding: Vec<f32>) -> Document {
        let mut meta = Metadata::new();
        meta.insert("source".into(), MetadataValue::from("test"));
        Document::new(id, format!("text of {id}"), meta, embedding)
    }

    #[test]
    fn test_put_and_get_round_trip() {
        let mut store = DocumentStore::new(None);
        let d = doc("a", vec![1.0, 0.0]);
        assert!(store.put(d.clone()).unwrap().is_none());
        assert_eq!(store.get("a").unwrap().as_ref(), &d);
        assert_eq!(store.dimension(), Some(2));
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn test_put_replaces_and_keeps_slot() {
        let mut store = DocumentStore::new(None);
        store.put(doc("a", vec![1.0, 0.0])).unwrap();
        store.put(doc("b", vec![0.0, 1.0])).unwrap();
        let old = store.put(doc("a", vec![0.5, 0.5])).unwrap().unwrap();
        assert_eq!(old.embedding, vec![1.0, 0.0]);
        assert_eq!(store.get("a").unwrap().embedding, vec![0.5, 0.5]);
        let ids: Vec<&str> = store.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_dimension_mismatch_leaves_store_unchanged() {
        let mut store = DocumentStore::new(Some(3));
        let err = store.put(doc("a", vec![1.0, 0.0])).unwrap_err();
        assert!(err.is_validation());
        assert!(store.is_empty());
        assert!(store.put(doc("a", vec![])).is_err());
    }

    #[test]
    fn test_delete() {
        let mut store = DocumentStore::new(None);
        store.put(doc("a", vec![1.0])).unwrap();
        store.put(doc("b", vec![2.0])).unwrap();
        store.put(doc("c", vec![3.0])).unwrap();
        assert!(store.delete("b"));
        assert!(!store.delete("b"));
        let ids: Vec<&str> = store.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_undo_put() {
        let mut store = DocumentStore::new(None);
        store.put(doc("a", vec![1.0, 0.0])).unwrap();
        store.put(doc("b", vec![0.0, 1.0])).unwrap();

        let previous = store.put(doc("a", vec![0.5, 0.5])).unwrap();
        store.undo_put("a", previous, Some(2));
        assert_eq!(store.get("a").unwrap().embedding, vec![1.0, 0.0]);
        let ids: Vec<&str> = store.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        let mut empty = DocumentStore::new(None);
        let previous = empty.put(doc("x", vec![1.0, 2.0, 3.0])).unwrap();
        empty.undo_put("x", previous, None);
        assert!(empty.is_empty());
        assert_eq!(empty.dimension(), None);
    }

    #[test]
    fn test_iteration_is_restartable() {
        let mut store = DocumentStore::new(None);
        store.put(doc("a", vec![1.0])).unwrap();
        assert_eq!(store.iter().count(), 1);
        store.put(doc("b", vec![1.0])).unwrap();
        assert_eq!(store.iter().count(), 2);
        assert_eq!(store.all().len(), 2);
    }

    #[test]
    fn test_clear_resets_dimension() {
        let mut store = DocumentStore::new(None);
        store.put(doc("a", vec![1.0, 2.0])).unwrap();
        store.clear(None);
        assert!(store.is_empty());
        assert_eq!(store.dimension(), None);
        store.put(doc("a", vec![1.0, 2.0, 3.0])).unwrap();
        assert_eq!(store.dimension(), Some(3));
    }
}
