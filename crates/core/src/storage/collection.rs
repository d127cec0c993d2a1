//! Collection and database data structures.
//!
//! A [`Collection`] pairs a [`DocumentStore`] with an HNSW index over the same
//! documents, plus the id mappings between document ids and graph nodes.
//! [`Database`] manages named collections with thread-safe concurrent access.

use crate::config;
use crate::document::{Document, Metadata};
use crate::embedding::{EmbeddingFunction, HashingEmbedder};
use crate::error::{Error, Result};
use crate::filter_types::Predicate;
use crate::hnsw::{DistanceMetric, HnswConfig, HnswIndex};
use crate::search::executor::{get_matching, similarity_search, CancelToken};
use crate::search::filter::matches_optional;
use crate::search::types::QueryMatch;
use crate::storage::store::DocumentStore;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// What `create_collection` does when the name is already taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IfExists {
    /// Fail with [`Error::AlreadyExists`].
    #[default]
    Error,
    /// Empty the existing collection in place and hand it back.
    Reset,
}

/// Per-collection settings, fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// Embedding dimension. `None` fixes it on the first insert.
    pub dimension: Option<usize>,
    pub hnsw: HnswConfig,
    pub if_exists: IfExists,
    /// Deleted-node fraction above which the index is rebuilt after a write.
    /// `0.0` disables automatic compaction.
    pub auto_compact_ratio: f32,
    /// Free-form attributes of the collection itself (description, owner, ...).
    pub metadata: Metadata,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            dimension: None,
            hnsw: HnswConfig::default(),
            if_exists: IfExists::Error,
            auto_compact_ratio: config::DEFAULT_AUTO_COMPACT_RATIO,
            metadata: Metadata::new(),
        }
    }
}

impl CollectionConfig {
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.hnsw.distance_metric = metric;
        self
    }

    pub fn with_hnsw(mut self, hnsw: HnswConfig) -> Self {
        self.hnsw = hnsw;
        self
    }

    pub fn with_if_exists(mut self, if_exists: IfExists) -> Self {
        self.if_exists = if_exists;
        self
    }

    pub fn with_auto_compact_ratio(mut self, ratio: f32) -> Self {
        self.auto_compact_ratio = ratio;
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(dim) = self.dimension {
            if dim == 0 || dim > config::MAX_DIMENSION {
                return Err(Error::validation(format!(
                    "dimension must be between 1 and {}, got {}",
                    config::MAX_DIMENSION,
                    dim
                )));
            }
        }
        if !(0.0..1.0).contains(&self.auto_compact_ratio) {
            return Err(Error::validation(format!(
                "auto_compact_ratio must be in [0, 1), got {}",
                self.auto_compact_ratio
            )));
        }
        self.hnsw.validate()
    }
}

/// Internal data for a collection, protected by a `RwLock`.
///
/// Every live document has exactly one live graph node. Re-adding an id
/// soft-deletes the old node and maps the id to a fresh one.
#[derive(Debug)]
pub struct CollectionData {
    pub name: String,
    pub config: CollectionConfig,
    pub store: DocumentStore,
    pub index: HnswIndex,
    id_to_internal: HashMap<String, u32>,
    /// Indexed by internal id. Entries of deleted nodes are stale.
    internal_to_id: Vec<String>,
}

impl CollectionData {
    /// Creates empty collection data. Fails with `Validation` on a bad config.
    pub fn new(name: String, config: CollectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store: DocumentStore::new(config.dimension),
            index: HnswIndex::new(config.dimension.unwrap_or(0), config.hnsw.clone())?,
            name,
            config,
            id_to_internal: HashMap::new(),
            internal_to_id: Vec::new(),
        })
    }

    /// The live document behind a graph node, if the node is still current.
    pub fn document_for_node(&self, internal_id: u32) -> Option<&Arc<Document>> {
        let id = self.internal_to_id.get(internal_id as usize)?;
        if self.id_to_internal.get(id) != Some(&internal_id) {
            return None;
        }
        self.store.get(id)
    }

    pub fn internal_id_of(&self, id: &str) -> Option<u32> {
        self.id_to_internal.get(id).copied()
    }

    /// Checks a whole batch so that the following `upsert`s cannot fail halfway.
    pub fn validate_batch(&self, docs: &[Document]) -> Result<()> {
        if docs.len() > config::MAX_BATCH_SIZE {
            return Err(Error::validation(format!(
                "batch of {} exceeds the maximum of {}",
                docs.len(),
                config::MAX_BATCH_SIZE
            )));
        }
        let dimension = self
            .store
            .dimension()
            .or_else(|| docs.first().map(Document::dimension));
        if dimension.is_some_and(|dim| dim > config::MAX_DIMENSION) {
            return Err(Error::validation(format!(
                "embedding dimension exceeds the maximum of {}",
                config::MAX_DIMENSION
            )));
        }
        let mut seen = HashSet::with_capacity(docs.len());
        for doc in docs {
            if doc.id.is_empty() {
                return Err(Error::validation("document id must not be empty"));
            }
            if !seen.insert(doc.id.as_str()) {
                return Err(Error::validation(format!(
                    "duplicate id '{}' in batch",
                    doc.id
                )));
            }
            if doc.embedding.is_empty() {
                return Err(Error::validation(format!(
                    "document '{}' has an empty embedding",
                    doc.id
                )));
            }
            if let Some(dim) = dimension {
                if doc.dimension() != dim {
                    return Err(Error::validation(format!(
                        "document '{}': expected embedding of dimension {}, got {}",
                        doc.id,
                        dim,
                        doc.dimension()
                    )));
                }
            }
            if doc.embedding.iter().any(|x| !x.is_finite()) {
                return Err(Error::validation(format!(
                    "document '{}' has NaN or infinite embedding values",
                    doc.id
                )));
            }
        }
        Ok(())
    }

    /// Inserts or replaces one document in both the store and the graph.
    ///
    /// The store is written first. If the graph then rejects the vector, the
    /// store entry is rolled back and the collection is left as it was.
    pub fn upsert(&mut self, doc: Document) -> Result<()> {
        let id = doc.id.clone();
        let dimension = doc.dimension();
        let dimension_before = self.store.dimension();
        let previous = self.store.put(doc)?;

        if self.index.node_count == 0 && self.index.dimension != dimension {
            self.index = HnswIndex::empty(dimension, self.config.hnsw.clone());
        }
        let inserted = match self.store.get(&id) {
            Some(stored) => self.index.insert(&stored.embedding),
            None => Err(Error::NotFound(format!("document '{id}'"))),
        };
        let internal_id = match inserted {
            Ok(internal_id) => internal_id,
            Err(err) => {
                self.store.undo_put(&id, previous, dimension_before);
                return Err(err);
            }
        };

        if let Some(old) = self.id_to_internal.insert(id.clone(), internal_id) {
            self.index.mark_deleted(old);
        }
        self.internal_to_id.push(id);
        Ok(())
    }

    /// Removes a document and soft-deletes its graph node.
    pub fn remove(&mut self, id: &str) -> bool {
        if !self.store.delete(id) {
            return false;
        }
        if let Some(internal_id) = self.id_to_internal.remove(id) {
            self.index.mark_deleted(internal_id);
        }
        true
    }

    /// Drops every document and the graph. The dimension returns to the configured one.
    pub fn clear(&mut self) {
        self.store.clear(self.config.dimension);
        self.index = HnswIndex::empty(self.config.dimension.unwrap_or(0), self.config.hnsw.clone());
        self.id_to_internal.clear();
        self.internal_to_id.clear();
    }

    /// Rebuilds the graph from live documents in store order, dropping every
    /// soft-deleted node. Returns the number of nodes removed.
    ///
    /// The new graph is built aside and swapped in, so a failure leaves the
    /// current one untouched.
    pub fn compact(&mut self) -> Result<usize> {
        let removed = self.index.deleted_count();
        let dimension = self.store.dimension().unwrap_or(self.index.dimension);
        let mut index = HnswIndex::empty(dimension, self.config.hnsw.clone());
        let mut id_to_internal = HashMap::with_capacity(self.store.len());
        let mut internal_to_id = Vec::with_capacity(self.store.len());

        for doc in self.store.iter() {
            let internal_id = index.insert(&doc.embedding)?;
            id_to_internal.insert(doc.id.clone(), internal_id);
            internal_to_id.push(doc.id.clone());
        }

        self.index = index;
        self.id_to_internal = id_to_internal;
        self.internal_to_id = internal_to_id;
        Ok(removed)
    }

    /// Compacts if the deleted fraction exceeds the configured ratio.
    fn maybe_compact(&mut self) {
        let ratio = self.config.auto_compact_ratio;
        if ratio <= 0.0 || self.index.deleted_ratio() <= ratio {
            return;
        }
        tracing::warn!(
            collection = %self.name,
            deleted = self.index.deleted_count(),
            nodes = self.index.node_count,
            "deleted ratio above threshold, compacting index"
        );
        if let Err(err) = self.compact() {
            tracing::warn!(collection = %self.name, error = %err, "compaction failed");
        }
    }
}

/// A thread-safe collection of documents with a vector index.
///
/// All operations acquire either a read or write lock on the internal [`CollectionData`].
/// Cloning a `Collection` produces a new handle to the same shared data.
#[derive(Clone)]
pub struct Collection {
    data: Arc<RwLock<CollectionData>>,
    // Replaced together with the config when the collection is reset.
    embedder: Arc<RwLock<Arc<dyn EmbeddingFunction>>>,
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data.read();
        f.debug_struct("Collection")
            .field("name", &data.name)
            .field("count", &data.store.len())
            .field("dimension", &data.store.dimension())
            .finish_non_exhaustive()
    }
}

impl Collection {
    /// Creates a new empty collection. The name is not validated here; go
    /// through [`Database::create_collection`] for that.
    pub fn new(
        name: impl Into<String>,
        config: CollectionConfig,
        embedder: Arc<dyn EmbeddingFunction>,
    ) -> Result<Self> {
        Ok(Self {
            data: Arc::new(RwLock::new(CollectionData::new(name.into(), config)?)),
            embedder: Arc::new(RwLock::new(embedder)),
        })
    }

    pub fn name(&self) -> String {
        self.data.read().name.clone()
    }

    /// The embedding dimension, once fixed.
    pub fn dimension(&self) -> Option<usize> {
        self.data.read().store.dimension()
    }

    pub fn config(&self) -> CollectionConfig {
        self.data.read().config.clone()
    }

    /// Attributes attached to the collection at creation or last reset.
    pub fn metadata(&self) -> Metadata {
        self.data.read().config.metadata.clone()
    }

    /// Number of live documents.
    pub fn count(&self) -> usize {
        self.data.read().store.len()
    }

    /// Number of soft-deleted nodes still in the graph.
    pub fn deleted_count(&self) -> usize {
        self.data.read().index.deleted_count()
    }

    /// Embeds `texts` and inserts the batch. An existing id is replaced.
    ///
    /// All three slices must have the same length. The batch is validated as
    /// a whole; on any error nothing is written.
    pub fn add(&self, ids: &[String], texts: &[String], metadatas: &[Metadata]) -> Result<usize> {
        check_lengths(ids.len(), &[("texts", texts.len()), ("metadatas", metadatas.len())])?;
        if ids.len() > config::MAX_BATCH_SIZE {
            return Err(Error::validation(format!(
                "batch of {} exceeds the maximum of {}",
                ids.len(),
                config::MAX_BATCH_SIZE
            )));
        }
        let embeddings = self.embed(texts)?;
        self.write_batch(build_documents(ids, texts, metadatas, embeddings))
    }

    /// Same as [`add`](Self::add) with caller-supplied embeddings.
    pub fn add_with_embeddings(
        &self,
        ids: &[String],
        texts: &[String],
        metadatas: &[Metadata],
        embeddings: Vec<Vec<f32>>,
    ) -> Result<usize> {
        check_lengths(
            ids.len(),
            &[
                ("texts", texts.len()),
                ("metadatas", metadatas.len()),
                ("embeddings", embeddings.len()),
            ],
        )?;
        self.write_batch(build_documents(ids, texts, metadatas, embeddings))
    }

    /// Insert-or-replace. Identical to [`add`](Self::add); provided for callers
    /// that want to spell out the replace intent.
    pub fn upsert(&self, ids: &[String], texts: &[String], metadatas: &[Metadata]) -> Result<usize> {
        self.add(ids, texts, metadatas)
    }

    fn write_batch(&self, docs: Vec<Document>) -> Result<usize> {
        let count = docs.len();
        let mut data = self.data.write();
        data.validate_batch(&docs)?;

        let mut replaced = 0usize;
        for doc in docs {
            if data.store.contains(&doc.id) {
                replaced += 1;
            }
            data.upsert(doc)?;
        }
        data.maybe_compact();

        tracing::info!(
            collection = %data.name,
            count,
            replaced,
            total = data.store.len(),
            "Batch inserted"
        );
        Ok(count)
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let embedder = Arc::clone(&*self.embedder.read());
        let embeddings = embedder.embed_batch(texts)?;
        if embeddings.len() != texts.len() {
            return Err(Error::validation(format!(
                "embedding function returned {} vectors for {} texts",
                embeddings.len(),
                texts.len()
            )));
        }
        Ok(embeddings)
    }

    /// Every document matching `predicate` (all if `None`), in store order.
    pub fn get(&self, predicate: Option<&Predicate>) -> Vec<Arc<Document>> {
        get_matching(&self.data.read(), predicate)
    }

    /// Paginated [`get`](Self::get): skips `offset` matches, returns at most `limit`.
    pub fn get_with(
        &self,
        predicate: Option<&Predicate>,
        limit: Option<usize>,
        offset: usize,
    ) -> Vec<Arc<Document>> {
        let data = self.data.read();
        data.store
            .iter()
            .filter(|doc| matches_optional(&doc.metadata, predicate))
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    /// Retrieves a document by id.
    pub fn get_document(&self, id: &str) -> Result<Arc<Document>> {
        self.data
            .read()
            .store
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("document '{id}'")))
    }

    /// The documents with the given ids, in request order. Unknown ids are skipped.
    pub fn get_by_ids<S: AsRef<str>>(&self, ids: &[S]) -> Vec<Arc<Document>> {
        let data = self.data.read();
        ids.iter()
            .filter_map(|id| data.store.get(id.as_ref()).cloned())
            .collect()
    }

    /// Embeds each query text and returns its `n` nearest matching documents.
    pub fn query(
        &self,
        texts: &[String],
        n: usize,
        predicate: Option<&Predicate>,
    ) -> Result<Vec<Vec<QueryMatch>>> {
        check_k(n)?;
        let embeddings = self.embed(texts)?;
        self.run_queries(&embeddings, n, predicate, None)
    }

    /// Same as [`query`](Self::query) with caller-supplied query vectors.
    pub fn query_embeddings(
        &self,
        embeddings: &[Vec<f32>],
        n: usize,
        predicate: Option<&Predicate>,
    ) -> Result<Vec<Vec<QueryMatch>>> {
        check_k(n)?;
        self.run_queries(embeddings, n, predicate, None)
    }

    /// Like [`query_embeddings`](Self::query_embeddings), but aborts with
    /// [`Error::Cancelled`] once `cancel` fires during a brute-force scan.
    pub fn query_with_cancel(
        &self,
        embeddings: &[Vec<f32>],
        n: usize,
        predicate: Option<&Predicate>,
        cancel: &CancelToken,
    ) -> Result<Vec<Vec<QueryMatch>>> {
        check_k(n)?;
        self.run_queries(embeddings, n, predicate, Some(cancel))
    }

    fn run_queries(
        &self,
        embeddings: &[Vec<f32>],
        n: usize,
        predicate: Option<&Predicate>,
        cancel: Option<&CancelToken>,
    ) -> Result<Vec<Vec<QueryMatch>>> {
        let data = self.data.read();
        embeddings
            .iter()
            .map(|query| similarity_search(&data, query, n, predicate, cancel))
            .collect()
    }

    /// Removes a document by id. Returns `true` if it existed.
    pub fn delete(&self, id: &str) -> bool {
        let mut data = self.data.write();
        let removed = data.remove(id);
        if removed {
            data.maybe_compact();
        }
        removed
    }

    /// Removes every document matching `predicate`. Returns how many were removed.
    pub fn delete_where(&self, predicate: &Predicate) -> usize {
        let mut data = self.data.write();
        let ids: Vec<String> = get_matching(&data, Some(predicate))
            .iter()
            .map(|doc| doc.id.clone())
            .collect();
        for id in &ids {
            data.remove(id);
        }
        if !ids.is_empty() {
            data.maybe_compact();
            tracing::info!(collection = %data.name, count = ids.len(), "Documents deleted");
        }
        ids.len()
    }

    /// Empties the collection. The configured dimension (if any) is kept.
    pub fn reset(&self) {
        let mut data = self.data.write();
        data.clear();
        tracing::info!(collection = %data.name, "Collection reset");
    }

    /// Rebuilds the index without soft-deleted nodes. Returns how many were dropped.
    pub fn compact(&self) -> Result<usize> {
        let mut data = self.data.write();
        let removed = data.compact()?;
        tracing::info!(collection = %data.name, removed, "Index compacted");
        Ok(removed)
    }

    /// Replaces the configuration and embedding function, then empties the collection.
    fn reset_with(&self, config: CollectionConfig, embedder: Arc<dyn EmbeddingFunction>) {
        let mut data = self.data.write();
        data.config = config;
        data.clear();
        *self.embedder.write() = embedder;
        tracing::info!(collection = %data.name, "Collection reset");
    }
}

fn check_lengths(expected: usize, others: &[(&str, usize)]) -> Result<()> {
    for &(what, len) in others {
        if len != expected {
            return Err(Error::validation(format!(
                "got {expected} ids but {len} {what}"
            )));
        }
    }
    Ok(())
}

fn check_k(n: usize) -> Result<()> {
    if n > config::MAX_K {
        return Err(Error::validation(format!(
            "n must be at most {}, got {}",
            config::MAX_K,
            n
        )));
    }
    Ok(())
}

fn build_documents(
    ids: &[String],
    texts: &[String],
    metadatas: &[Metadata],
    embeddings: Vec<Vec<f32>>,
) -> Vec<Document> {
    ids.iter()
        .zip(texts)
        .zip(metadatas)
        .zip(embeddings)
        .map(|(((id, text), meta), embedding)| {
            Document::new(id.clone(), text.clone(), meta.clone(), embedding)
        })
        .collect()
}

/// Rejects names that are empty, too long, or contain characters outside
/// `[A-Za-z0-9._-]`.
pub fn validate_collection_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::validation("collection name must not be empty"));
    }
    if name.len() > config::MAX_COLLECTION_NAME_LEN {
        return Err(Error::validation(format!(
            "collection name exceeds {} characters",
            config::MAX_COLLECTION_NAME_LEN
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(Error::validation(format!(
            "collection name '{name}' may only contain [A-Za-z0-9._-]"
        )));
    }
    Ok(())
}

/// Database holds all collections.
#[derive(Clone)]
pub struct Database {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
    embedder: Arc<dyn EmbeddingFunction>,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("collections", &self.list_collections())
            .finish_non_exhaustive()
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl Database {
    /// Creates an empty database whose collections embed with a [`HashingEmbedder`].
    pub fn new() -> Self {
        Self::with_embedder(Arc::new(HashingEmbedder::default()))
    }

    /// Creates an empty database with a default embedding function for new collections.
    pub fn with_embedder(embedder: Arc<dyn EmbeddingFunction>) -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
            embedder,
        }
    }

    /// Creates a collection using the database's embedding function.
    ///
    /// On a taken name, `config.if_exists` decides: `Error` fails with
    /// `AlreadyExists`, `Reset` empties the existing collection, applies
    /// `config` and the embedding function, and returns a handle to it.
    pub fn create_collection(&self, name: &str, config: CollectionConfig) -> Result<Collection> {
        self.create_collection_with_embedder(name, config, Arc::clone(&self.embedder))
    }

    pub fn create_collection_with_embedder(
        &self,
        name: &str,
        config: CollectionConfig,
        embedder: Arc<dyn EmbeddingFunction>,
    ) -> Result<Collection> {
        validate_collection_name(name)?;
        config.validate()?;

        let mut collections = self.collections.write();
        if let Some(existing) = collections.get(name) {
            return match config.if_exists {
                IfExists::Error => Err(Error::AlreadyExists(format!("collection '{name}'"))),
                IfExists::Reset => {
                    existing.reset_with(config, embedder);
                    Ok(existing.clone())
                }
            };
        }

        let collection = Collection::new(name, config, embedder)?;
        collections.insert(name.to_string(), collection.clone());
        tracing::info!(collection = %name, "Collection created");
        Ok(collection)
    }

    /// Returns a handle to the named collection.
    pub fn get_collection(&self, name: &str) -> Result<Collection> {
        self.collections
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("collection '{name}'")))
    }

    /// Returns the named collection, creating it with `config` if absent.
    pub fn get_or_create_collection(
        &self,
        name: &str,
        config: CollectionConfig,
    ) -> Result<Collection> {
        if let Some(existing) = self.collections.read().get(name) {
            return Ok(existing.clone());
        }
        match self.create_collection(name, config.with_if_exists(IfExists::Error)) {
            Err(Error::AlreadyExists(_)) => self.get_collection(name),
            other => other,
        }
    }

    /// Drops a collection. Outstanding handles keep working on the detached data.
    pub fn delete_collection(&self, name: &str) -> Result<()> {
        if self.collections.write().remove(name).is_none() {
            return Err(Error::NotFound(format!("collection '{name}'")));
        }
        tracing::info!(collection = %name, "Collection deleted");
        Ok(())
    }

    /// Collection names, sorted.
    pub fn list_collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }
}
