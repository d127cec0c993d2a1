//! Query execution: exact retrieval and filtered similarity search.
//!
//! The HNSW index knows nothing about metadata, so a filtered query over-fetches:
//! it asks the index for `n * OVERFETCH_MULTIPLIER` candidates, keeps those that
//! pass the predicate in index order, and doubles the pool up to
//! `OVERFETCH_ESCALATIONS` times while it under-fills. If the pool still yields
//! fewer than `n` matches, a brute-force scan over every matching document
//! computes the exact top `n`. That scan is the only unbounded path and honors a
//! [`CancelToken`].

use crate::config;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::filter_types::Predicate;
use crate::hnsw::distance::norm_sq;
use crate::hnsw::knn_search;
use crate::search::filter::matches_optional;
use crate::search::types::QueryMatch;
use crate::storage::collection::CollectionData;
use ordered_float::OrderedFloat;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared between a caller and a running query.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Every clone observes it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Every document whose metadata satisfies `predicate` (all documents if `None`),
/// in store-iteration order.
pub fn get_matching(data: &CollectionData, predicate: Option<&Predicate>) -> Vec<Arc<Document>> {
    data.store
        .iter()
        .filter(|doc| matches_optional(&doc.metadata, predicate))
        .cloned()
        .collect()
}

/// The `n` documents nearest to `query` among those satisfying `predicate`,
/// sorted by non-decreasing distance.
pub fn similarity_search(
    data: &CollectionData,
    query: &[f32],
    n: usize,
    predicate: Option<&Predicate>,
    cancel: Option<&CancelToken>,
) -> Result<Vec<QueryMatch>> {
    let live = data.store.len();
    if n == 0 || live == 0 {
        return Ok(Vec::new());
    }
    data.store.check_dimension(query)?;

    let multiplier = if predicate.is_some() {
        config::OVERFETCH_MULTIPLIER
    } else {
        1
    };
    let mut pool = n.saturating_mul(multiplier).min(live);
    let mut escalations = 0;

    loop {
        let candidates = knn_search(&data.index, query, pool)?;
        let passing: Vec<QueryMatch> = candidates
            .into_iter()
            .filter_map(|(distance, internal_id)| {
                let doc = data.document_for_node(internal_id)?;
                matches_optional(&doc.metadata, predicate).then(|| QueryMatch {
                    id: doc.id.clone(),
                    distance,
                    document: Arc::clone(doc),
                })
            })
            .take(n)
            .collect();

        if passing.len() >= n {
            tracing::debug!(
                collection = %data.name,
                pool,
                escalations,
                results = passing.len(),
                "similarity query served from index"
            );
            return Ok(passing);
        }
        if pool >= live || escalations >= config::OVERFETCH_ESCALATIONS {
            break;
        }
        pool = pool.saturating_mul(2).min(live);
        escalations += 1;
    }

    tracing::warn!(
        collection = %data.name,
        pool,
        live,
        n,
        "over-fetch under-filled, falling back to brute-force scan"
    );
    brute_force(data, query, n, predicate, cancel)
}

/// Exact top-`n` over every document matching `predicate`. Ties go to the
/// earlier-inserted document.
pub fn brute_force(
    data: &CollectionData,
    query: &[f32],
    n: usize,
    predicate: Option<&Predicate>,
    cancel: Option<&CancelToken>,
) -> Result<Vec<QueryMatch>> {
    data.store.check_dimension(query)?;
    let metric = data.index.config.distance_metric;
    let query_norm_sq = norm_sq(query);

    let mut scored: Vec<(OrderedFloat<f32>, u32, &Arc<Document>)> = Vec::new();
    for (scanned, doc) in data.store.iter().enumerate() {
        if scanned % config::BRUTE_FORCE_CANCEL_CHECK_INTERVAL == 0
            && cancel.is_some_and(CancelToken::is_cancelled)
        {
            return Err(Error::Cancelled);
        }
        if !matches_optional(&doc.metadata, predicate) {
            continue;
        }
        let distance = metric.distance_prenorm(query, &doc.embedding, query_norm_sq);
        let order = data.internal_id_of(&doc.id).unwrap_or(u32::MAX);
        scored.push((OrderedFloat(distance), order, doc));
    }

    scored.sort_unstable_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
    Ok(scored
        .into_iter()
        .take(n)
        .map(|(distance, _, doc)| QueryMatch {
            id: doc.id.clone(),
            distance: distance.0,
            document: Arc::clone(doc),
        })
        .collect())
}
