//! HNSW insertion algorithm.
//!
//! Inserts a vector into the HNSW graph with bidirectional connections and
//! heuristic neighbor pruning (Algorithm 4 from the HNSW paper).

use crate::error::Result;
use crate::hnsw::distance::norm_sq;
use crate::hnsw::graph::HnswIndex;
use crate::hnsw::search::{search_layer, Scored};
use crate::hnsw::visited::VisitedSet;
use std::collections::HashSet;

impl HnswIndex {
    /// Insert a new vector and return its internal id.
    ///
    /// Ids are assigned densely in insertion order (`0, 1, 2, ...`), which is
    /// also the tie-break order for equal distances.
    pub fn insert(&mut self, vector: &[f32]) -> Result<u32> {
        self.check_vector(vector)?;
        let internal_id = self.node_count;
        let level = self.random_level();

        // First node: push SoA fields and return
        let Some(entry_point) = self.entry_point else {
            self.push_node(vector, vec![Vec::new(); level + 1], level);
            self.entry_point = Some(internal_id);
            self.max_layer = level;
            return Ok(internal_id);
        };

        let query_norm_sq = norm_sq(vector);
        let mut visited = VisitedSet::new(self.node_count as usize);
        let mut current_ep = entry_point;

        // Phase 1: greedy descent from the top layer down to level + 1
        let any = |_: u32| true;
        for layer in (level + 1..=self.max_layer).rev() {
            let nearest = search_layer(
                self,
                vector,
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

        // Phase 2: beam search each remaining layer and pick diverse neighbors.
        // The node is pushed only after all lists are chosen.
        let top = level.min(self.max_layer);
        let mut node_neighbors: Vec<Vec<u32>> = vec![Vec::new(); level + 1];
        let mut layer_eps: Vec<u32> = vec![current_ep];
        for layer in (0..=top).rev() {
            let candidates = search_layer(
                self,
                vector,
                &layer_eps,
                self.config.ef_construction,
                layer,
                &mut visited,
                query_norm_sq,
                &any,
            );
            let selected =
                select_neighbors_heuristic(self, &candidates, self.config.max_degree(layer));
            node_neighbors[layer] = selected.iter().map(|&(_, id)| id).collect();

            layer_eps.clear();
            layer_eps.extend(candidates.iter().map(|&(_, id)| id));
            if layer_eps.is_empty() {
                layer_eps.push(current_ep);
            }
        }

        self.push_node(vector, node_neighbors, level);

        // Phase 3: add reverse links and re-prune neighbors that overflow
        for layer in 0..=top {
            let m_max = self.config.max_degree(layer);
            let my_neighbors = self.neighbors[internal_id as usize][layer].clone();
            for neighbor_id in my_neighbors {
                let nid = neighbor_id as usize;
                if self.neighbors[nid].len() <= layer {
                    self.neighbors[nid].resize_with(layer + 1, Vec::new);
                }
                self.neighbors[nid][layer].push(internal_id);

                if self.neighbors[nid][layer].len() > m_max {
                    let candidates: Vec<Scored> = self.neighbors[nid][layer]
                        .iter()
                        .map(|&cid| (self.node_distance(neighbor_id, cid), cid))
                        .collect();
                    let pruned = select_neighbors_heuristic(self, &candidates, m_max);
                    self.neighbors[nid][layer] = pruned.iter().map(|&(_, id)| id).collect();
                }
            }
        }

        if level > self.max_layer {
            self.max_layer = level;
            self.entry_point = Some(internal_id);
        }
        Ok(internal_id)
    }

    fn push_node(&mut self, vector: &[f32], neighbors: Vec<Vec<u32>>, level: usize) {
        self.vectors.extend_from_slice(vector);
        self.neighbors.push(neighbors);
        self.layers.push(level as u8);
        self.deleted.push(false);
        self.node_count += 1;
    }
}

/// Heuristic neighbor selection (Algorithm 4 from the HNSW paper).
///
/// Walks candidates nearest-first and keeps one only if it is closer to the base
/// node than to every neighbor already kept, so links spread in different
/// directions instead of clustering. If that leaves fewer than `m` links, the
/// closest rejected candidates fill the remaining slots.
pub(crate) fn select_neighbors_heuristic(
    index: &HnswIndex,
    candidates: &[Scored],
    m: usize,
) -> Vec<Scored> {
    let mut sorted = candidates.to_vec();
    sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut selected: Vec<Scored> = Vec::with_capacity(m);
    for &(dist_to_base, cid) in &sorted {
        if selected.len() >= m {
            break;
        }
        let is_diverse = selected
            .iter()
            .all(|&(_, sid)| dist_to_base <= index.node_distance(cid, sid));
        if is_diverse {
            selected.push((dist_to_base, cid));
        }
    }

    if selected.len() < m {
        let chosen: HashSet<u32> = selected.iter().map(|&(_, id)| id).collect();
        let fill: Vec<Scored> = sorted
            .iter()
            .filter(|(_, id)| !chosen.contains(id))
            .take(m - selected.len())
            .copied()
            .collect();
        selected.extend(fill);
    }

    selected
}
