//! HNSW search algorithms: single-layer beam search and multi-layer KNN.
//!
//! `search_layer` takes an acceptance predicate `Fn(u32) -> bool`. Rejected nodes
//! are still expanded for navigation but never enter the result set; KNN search
//! uses it to hide soft-deleted nodes, construction accepts everything.

use crate::error::Result;
use crate::hnsw::distance::norm_sq;
use crate::hnsw::graph::HnswIndex;
use crate::hnsw::visited::VisitedSet;
use ordered_float::OrderedFloat;
use std::cell::RefCell;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// `(distance, internal_id)` pair returned by every search routine.
pub type Scored = (f32, u32);

thread_local! {
    /// Per-thread visited buffer reused across queries.
    static SEARCH_VISITED: RefCell<VisitedSet> = RefCell::new(VisitedSet::new(0));
}

/// Heap entry ordered by distance, then by internal id so that among equal
/// distances the earlier-inserted node ranks first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    distance: OrderedFloat<f32>,
    id: u32,
}

impl Entry {
    fn new(distance: f32, id: u32) -> Self {
        Self {
            distance: OrderedFloat(distance),
            id,
        }
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .cmp(&other.distance)
            .then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[inline]
fn distance_to(index: &HnswIndex, query: &[f32], node_id: u32, query_norm_sq: f32) -> f32 {
    index
        .config
        .distance_metric
        .distance_prenorm(query, index.vector(node_id), query_norm_sq)
}

/// Search a single layer of the HNSW graph.
///
/// Returns up to `ef` accepted nodes closest to the query, sorted by
/// `(distance, id)`. `visited` is cleared at the start of each call.
#[allow(clippy::too_many_arguments)]
pub fn search_layer<F: Fn(u32) -> bool>(
    index: &HnswIndex,
    query: &[f32],
    entry_points: &[u32],
    ef: usize,
    layer: usize,
    visited: &mut VisitedSet,
    query_norm_sq: f32,
    accept: &F,
) -> Vec<Scored> {
    visited.clear();
    // Min-heap frontier and max-heap result set (worst result on top)
    let mut candidates: BinaryHeap<Reverse<Entry>> = BinaryHeap::with_capacity(ef * 2);
    let mut results: BinaryHeap<Entry> = BinaryHeap::with_capacity(ef + 1);

    for &ep in entry_points {
        if visited.insert(ep) {
            let entry = Entry::new(distance_to(index, query, ep, query_norm_sq), ep);
            candidates.push(Reverse(entry));
            if accept(ep) {
                results.push(entry);
                if results.len() > ef {
                    results.pop();
                }
            }
        }
    }

    while let Some(Reverse(current)) = candidates.pop() {
        // Closest frontier node is worse than the worst kept result: nothing left can improve it
        if results.len() >= ef && results.peek().is_some_and(|worst| current > *worst) {
            break;
        }

        let Some(neighbor_list) = index.neighbors[current.id as usize].get(layer) else {
            continue;
        };
        for &neighbor_id in neighbor_list {
            if !visited.insert(neighbor_id) {
                continue;
            }
            let entry = Entry::new(
                distance_to(index, query, neighbor_id, query_norm_sq),
                neighbor_id,
            );
            let improves = results.len() < ef || results.peek().is_some_and(|w| entry < *w);
            if improves {
                candidates.push(Reverse(entry));
                if accept(neighbor_id) {
                    results.push(entry);
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }
    }

    results
        .into_sorted_vec()
        .into_iter()
        .map(|e| (e.distance.0, e.id))
        .collect()
}

/// Multi-layer KNN search through the HNSW graph.
///
/// Greedy descent (`ef = 1`) through the upper layers, then a layer-0 beam
/// search with `ef = max(ef_search, k)`. Soft-deleted nodes are never returned.
/// Searching an empty index yields an empty result.
pub fn knn_search(index: &HnswIndex, query: &[f32], k: usize) -> Result<Vec<Scored>> {
    index.check_vector(query)?;
    let Some(entry_point) = index.entry_point else {
        return Ok(Vec::new());
    };
    if k == 0 {
        return Ok(Vec::new());
    }

    Ok(SEARCH_VISITED.with(|cell| {
        let mut visited = cell.borrow_mut();
        visited.ensure_capacity(index.node_count as usize);
        let query_norm_sq = norm_sq(query);

        let any = |_: u32| true;
        let mut current_ep = entry_point;
        for layer in (1..=index.max_layer).rev() {
            let nearest = search_layer(
                index,
                query,
                std::slice::from_ref(&current_ep),
                1,
                layer,
                &mut visited,
                query_norm_sq,
                &any,
            );
            if let Some(&(_, id)) = nearest.first() {
                current_ep = id;
            }
        }

        let live = |id: u32| !index.is_deleted(id);
        let ef = index.config.ef_search.max(k);
        let mut results = search_layer(
            index,
            query,
            std::slice::from_ref(&current_ep),
            ef,
            0,
            &mut visited,
            query_norm_sq,
            &live,
        );
        results.truncate(k);
        results
    }))
}

/// Exact nearest neighbors by linear scan over every live node.
/// Used as ground truth in recall measurements.
pub fn exact_search(index: &HnswIndex, query: &[f32], k: usize) -> Result<Vec<Scored>> {
    index.check_vector(query)?;
    let query_norm_sq = norm_sq(query);
    let mut all: Vec<Entry> = (0..index.node_count)
        .filter(|&id| !index.is_deleted(id))
        .map(|id| Entry::new(distance_to(index, query, id, query_norm_sq), id))
        .collect();
    all.sort_unstable();
    all.truncate(k);
    Ok(all.into_iter().map(|e| (e.distance.0, e.id)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hnsw::graph::HnswConfig;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_unit_vectors(n: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                let v: Vec<f32> = (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect();
                let norm = norm_sq(&v).sqrt();
                v.into_iter().map(|x| x / norm).collect()
            })
            .collect()
    }

    fn build(vectors: &[Vec<f32>], config: HnswConfig) -> HnswIndex {
        let mut index = HnswIndex::new(vectors[0].len(), config).unwrap();
        for v in vectors {
            index.insert(v).unwrap();
        }
        index
    }

    #[test]
    fn test_empty_index_returns_empty() {
        let index = HnswIndex::with_default_config(4);
        assert!(knn_search(&index, &[1.0, 0.0, 0.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let vectors = random_unit_vectors(10, 4, 1);
        let index = build(&vectors, HnswConfig::default());
        assert!(knn_search(&index, &[1.0, 0.0], 3).unwrap_err().is_validation());
    }

    #[test]
    fn test_self_query_finds_itself() {
        let vectors = random_unit_vectors(100, 8, 7);
        let index = build(&vectors, HnswConfig::default());
        for (i, v) in vectors.iter().enumerate() {
            let res = knn_search(&index, v, 1).unwrap();
            assert_eq!(res[0].1, i as u32);
            assert!(res[0].0.abs() < 1e-5, "self distance {}", res[0].0);
        }
    }

    #[test]
    fn test_results_sorted_and_unique() {
        let vectors = random_unit_vectors(200, 8, 3);
        let index = build(&vectors, HnswConfig::default());
        let res = knn_search(&index, &vectors[17], 25).unwrap();
        assert_eq!(res.len(), 25);
        assert!(res.windows(2).all(|w| w[0].0 <= w[1].0));
        let mut ids: Vec<u32> = res.iter().map(|r| r.1).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 25);
    }

    #[test]
    fn test_recall_against_exact() {
        let vectors = random_unit_vectors(1_000, 16, 11);
        let index = build(&vectors, HnswConfig::default());
        let queries = random_unit_vectors(50, 16, 12);
        let mut hits = 0;
        for q in &queries {
            let approx = knn_search(&index, q, 10).unwrap();
            let exact = exact_search(&index, q, 10).unwrap();
            hits += approx
                .iter()
                .filter(|a| exact.iter().any(|e| e.1 == a.1))
                .count();
        }
        let recall = hits as f32 / (queries.len() * 10) as f32;
        assert!(recall > 0.9, "recall@10 too low: {recall}");
    }

    #[test]
    fn test_ties_break_by_insertion_order() {
        let mut index = HnswIndex::with_default_config(2);
        index.insert(&[1.0, 0.0]).unwrap();
        index.insert(&[0.0, 1.0]).unwrap();
        index.insert(&[1.0, 0.0]).unwrap();
        index.insert(&[2.0, 0.0]).unwrap();
        let res = knn_search(&index, &[1.0, 0.0], 3).unwrap();
        let ids: Vec<u32> = res.iter().map(|r| r.1).collect();
        assert_eq!(ids, vec![0, 2, 3]);
    }

    #[test]
    fn test_deleted_nodes_are_hidden() {
        let vectors = random_unit_vectors(50, 8, 5);
        let mut index = build(&vectors, HnswConfig::default());
        assert!(index.mark_deleted(9));
        assert!(!index.mark_deleted(9));
        let res = knn_search(&index, &vectors[9], 10).unwrap();
        assert!(res.iter().all(|r| r.1 != 9));
        assert_eq!(res.len(), 10);
        assert_eq!(index.len(), 49);
    }

    #[test]
    fn test_k_larger_than_index() {
        let vectors = random_unit_vectors(5, 4, 9);
        let index = build(&vectors, HnswConfig::default());
        let res = knn_search(&index, &vectors[0], 50).unwrap();
        assert_eq!(res.len(), 5);
    }
}
