//! Generation-stamped visited set for HNSW graph traversal.
//!
//! `clear()` bumps a generation counter instead of zeroing the array, so one
//! buffer can be reused across every layer search of a query.

#[derive(Debug)]
pub struct VisitedSet {
    stamps: Vec<u32>,
    generation: u32,
}

impl VisitedSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            stamps: vec![0; capacity],
            generation: 1,
        }
    }

    /// Forget all visits. Zeroes the buffer only when the generation wraps.
    pub fn clear(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            self.stamps.fill(0);
            self.generation = 1;
        }
    }

    /// Grow to cover ids `0..cap`.
    pub fn ensure_capacity(&mut self, cap: usize) {
        if cap > self.stamps.len() {
            self.stamps.resize(cap, 0);
        }
    }

    /// Mark `id` as visited. Returns `true` if it was not visited before.
    #[inline]
    pub fn insert(&mut self, id: u32) -> bool {
        let slot = &mut self.stamps[id as usize];
        if *slot == self.generation {
            false
        } else {
            *slot = self.generation;
            true
        }
    }
}

impl Default for VisitedSet {
    fn default() -> Self {
        Self::new(0)
    }
}
