//! Brute-force in-memory neighbour index.
//!
//! The catalog never holds more than about a hundred points, so a linear
//! scan over `[f64; 5]` rows is all the index it needs.

use super::{EntryMetadata, IndexHit, NeighborIndex};
use crate::state::euclidean;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct InMemoryIndex {
    rows: Vec<(Uuid, [f64; 5], EntryMetadata)>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NeighborIndex for InMemoryIndex {
    fn add(&mut self, id: Uuid, vector: [f64; 5], metadata: EntryMetadata) {
        self.rows.push((id, vector, metadata));
    }

    fn query(&self, vector: &[f64; 5], k: usize) -> Vec<IndexHit> {
        let mut hits: Vec<IndexHit> = self
            .rows
            .iter()
            .map(|(id, row, meta)| IndexHit {
                id: *id,
                distance: euclidean(row, vector),
                metadata: meta.clone(),
            })
            .collect();

        // Stable: equal distances keep seeding order
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        hits
    }

    fn count(&self) -> usize {
        self.rows.len()
    }

    fn reset(&mut self) {
        self.rows.clear();
    }
}
