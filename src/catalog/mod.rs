//! ═══════════════════════════════════════════════════════════════════════════════
//! CATALOG — Named Reference States and Nearest-Neighbour Lookup
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Answers: "Which known state does this one most resemble?"
//!
//! A catalog is an append-only list of named reference states sitting on top of
//! a `NeighborIndex`. Seeding computes density once and stores it alongside the
//! raw vector. Queries rank entries by Euclidean distance in the five-axis space.
//!
//! - Fewer than k entries: every entry comes back
//! - Empty catalog: empty result, never an error
//! - `reset` drops everything; there is no update or single delete
//! ═══════════════════════════════════════════════════════════════════════════════

pub mod memory;

pub use memory::InMemoryIndex;

use crate::calibration::CalibrationProvider;
use crate::error::{ConduitError, ConduitResult};
use crate::state::StateVector;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use uuid::Uuid;

// ═══════════════════════════════════════════════════════════════════════════════
// INDEX CONTRACT
// ═══════════════════════════════════════════════════════════════════════════════

/// Metadata stored next to each vector in the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub name: String,
    pub description: String,
    /// Density computed at seed time
    pub density: f64,
}

/// One ranked result from an index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexHit {
    pub id: Uuid,
    pub distance: f64,
    pub metadata: EntryMetadata,
}

/// Any store that can add vectors and return the k closest.
///
/// `query` returns hits in ascending distance and at most `k` of them.
pub trait NeighborIndex {
    fn add(&mut self, id: Uuid, vector: [f64; 5], metadata: EntryMetadata);
    fn query(&self, vector: &[f64; 5], k: usize) -> Vec<IndexHit>;
    fn count(&self) -> usize;
    fn reset(&mut self);
}

// ═══════════════════════════════════════════════════════════════════════════════
// CATALOG
// ═══════════════════════════════════════════════════════════════════════════════

/// A seeded reference state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub state: StateVector,
    pub density: f64,
    /// RFC 3339
    pub seeded_at: String,
}

impl CatalogEntry {
    fn metadata(&self) -> EntryMetadata {
        EntryMetadata {
            name: self.name.clone(),
            description: self.description.clone(),
            density: self.density,
        }
    }
}

/// A query result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub id: Uuid,
    pub name: String,
    pub distance: f64,
    pub metadata: EntryMetadata,
}

impl From<IndexHit> for Neighbor {
    fn from(hit: IndexHit) -> Self {
        Self {
            id: hit.id,
            name: hit.metadata.name.clone(),
            distance: hit.distance,
            metadata: hit.metadata,
        }
    }
}

pub struct Catalog<I: NeighborIndex = InMemoryIndex> {
    index: I,
    entries: Vec<CatalogEntry>,
}

impl Catalog<InMemoryIndex> {
    pub fn in_memory() -> Self {
        Self::with_index(InMemoryIndex::new())
    }
}

impl Default for Catalog<InMemoryIndex> {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl<I: NeighborIndex> Catalog<I> {
    /// Wrap an index. Whatever the index already holds is dropped.
    pub fn with_index(mut index: I) -> Self {
        index.reset();
        Self {
            index,
            entries: Vec::new(),
        }
    }

    /// Add a named state; returns its id
    pub fn seed(&mut self, name: &str, state: &StateVector, description: &str) -> Uuid {
        let entry = CatalogEntry {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
            state: state.clone(),
            density: state.density(),
            seeded_at: chrono::Utc::now().to_rfc3339(),
        };
        let id = entry.id;
        self.push(entry);
        id
    }

    fn push(&mut self, entry: CatalogEntry) {
        self.index
            .add(entry.id, entry.state.to_array(), entry.metadata());
        self.entries.push(entry);
    }

    /// Seed every state the provider knows, keyed by its lookup name
    pub fn seed_grounded(&mut self, provider: &dyn CalibrationProvider) -> ConduitResult<usize> {
        let states = provider.grounded_states()?;
        for (key, grounded) in &states {
            let state = grounded.to_state_vector()?;
            self.seed(key, &state, &grounded.notes);
        }
        Ok(states.len())
    }

    /// Up to k nearest entries, closest first
    pub fn find_neighbors(&self, query: &StateVector, k: usize) -> Vec<Neighbor> {
        self.rank(&query.to_array(), k)
    }

    /// Query with a raw `[φ, τ, ρ, H, κ]` row. The row is validated like any
    /// other state, so NaN or out-of-range values are a domain error.
    pub fn query_vector(&self, vector: &[f64; 5], k: usize) -> ConduitResult<Vec<Neighbor>> {
        let query = StateVector::from_array(*vector)?;
        Ok(self.rank(&query.to_array(), k))
    }

    fn rank(&self, vector: &[f64; 5], k: usize) -> Vec<Neighbor> {
        if k == 0 || self.index.count() == 0 {
            return Vec::new();
        }
        self.index
            .query(vector, k.min(self.index.count()))
            .into_iter()
            .map(Neighbor::from)
            .collect()
    }

    /// Closest single entry, if any
    pub fn nearest(&self, query: &StateVector) -> Option<Neighbor> {
        self.find_neighbors(query, 1).into_iter().next()
    }

    /// First entry seeded under `name`
    pub fn get(&self, name: &str) -> ConduitResult<&CatalogEntry> {
        self.entries.iter().find(|e| e.name == name).ok_or_else(|| {
            ConduitError::not_found(
                "catalog entry",
                name,
                self.entries.iter().map(|e| e.name.as_str()),
            )
        })
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn count(&self) -> usize {
        self.index.count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Drop the entire catalog
    pub fn reset(&mut self) {
        self.index.reset();
        self.entries.clear();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SNAPSHOTS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot {
            version: SNAPSHOT_VERSION,
            saved_at: chrono::Utc::now().to_rfc3339(),
            entries: self.entries.clone(),
        }
    }

    /// Rebuild on top of `index` from a snapshot; ids and seed times are kept.
    ///
    /// Every stored density must match the density of its own vector and ids
    /// must be unique, otherwise the whole snapshot is refused.
    pub fn restore(index: I, snapshot: CatalogSnapshot) -> ConduitResult<Self> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(ConduitError::InvalidArgument(format!(
                "unsupported catalog snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }
        let mut seen = HashSet::with_capacity(snapshot.entries.len());
        for entry in &snapshot.entries {
            if !seen.insert(entry.id) {
                return Err(ConduitError::InvalidArgument(format!(
                    "duplicate catalog id {} ('{}')",
                    entry.id, entry.name
                )));
            }
            let actual = entry.state.density();
            if (entry.density - actual).abs() > DENSITY_TOLERANCE {
                return Err(ConduitError::InvalidArgument(format!(
                    "entry '{}' stores density {} but its vector gives {}",
                    entry.name, entry.density, actual
                )));
            }
        }

        let mut catalog = Self::with_index(index);
        for entry in snapshot.entries {
            catalog.push(entry);
        }
        Ok(catalog)
    }

    /// Write the entry list as pretty JSON, creating parent directories
    pub fn save_snapshot(&self, path: &Path) -> ConduitResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.snapshot())?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl Catalog<InMemoryIndex> {
    pub fn load_snapshot(path: &Path) -> ConduitResult<Self> {
        let json = fs::read_to_string(path)?;
        let snapshot: CatalogSnapshot = serde_json::from_str(&json)?;
        Self::restore(InMemoryIndex::new(), snapshot)
    }
}

pub const SNAPSHOT_VERSION: u32 = 1;

/// Allowed gap between a stored density and the recomputed one
const DENSITY_TOLERANCE: f64 = 1e-9;

/// On-disk form of a catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub version: u32,
    pub saved_at: String,
    pub entries: Vec<CatalogEntry>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::StandardCalibration;

    fn sv(i: f64, t: f64, b: f64, h: f64, k: f64) -> StateVector {
        StateVector::new(i, t, b, h, k).unwrap()
    }

    fn small() -> Catalog {
        let mut catalog = Catalog::in_memory();
        catalog.seed("wake", &sv(0.80, 0.50, 0.55, 0.50, 0.50), "baseline");
        catalog.seed("propofol", &sv(0.20, 0.10, 0.24, 0.35, 0.20), "anesthesia");
        catalog.seed("flow", &sv(0.92, 0.70, 0.70, 0.45, 0.75), "optimal");
        catalog
    }

    #[test]
    fn test_exact_query_finds_itself() {
        let catalog = small();
        let hit = catalog
            .nearest(&sv(0.20, 0.10, 0.24, 0.35, 0.20))
            .unwrap();
        assert_eq!(hit.name, "propofol");
        assert!(hit.distance.abs() < 1e-12);
        assert_eq!(hit.metadata.description, "anesthesia");
    }

    #[test]
    fn test_density_stored_at_seed_time() {
        let catalog = small();
        let entry = catalog.get("wake").unwrap();
        assert_eq!(entry.density, entry.state.density());
        let hit = catalog.nearest(&entry.state).unwrap();
        assert_eq!(hit.metadata.density, entry.density);
    }

    #[test]
    fn test_k_larger_than_catalog_returns_all() {
        let catalog = small();
        let hits = catalog.find_neighbors(&sv(0.5, 0.5, 0.5, 0.5, 0.5), 10);
        assert_eq!(hits.len(), 3);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_empty_catalog_is_not_an_error() {
        let catalog = Catalog::in_memory();
        assert!(catalog.find_neighbors(&sv(0.5, 0.5, 0.5, 0.5, 0.5), 3).is_empty());
        assert!(catalog.nearest(&sv(0.5, 0.5, 0.5, 0.5, 0.5)).is_none());
    }

    #[test]
    fn test_zero_k_returns_nothing() {
        assert!(small().find_neighbors(&sv(0.5, 0.5, 0.5, 0.5, 0.5), 0).is_empty());
    }

    #[test]
    fn test_lookup_miss_lists_names() {
        let catalog = small();
        let err = catalog.get("coma").unwrap_err();
        match err {
            ConduitError::NotFound { name, available, .. } => {
                assert_eq!(name, "coma");
                assert_eq!(available, vec!["wake", "propofol", "flow"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_reset_drops_everything() {
        let mut catalog = small();
        catalog.reset();
        assert!(catalog.is_empty());
        assert!(catalog.entries().is_empty());
        assert!(catalog.get("wake").is_err());
    }

    #[test]
    fn test_seed_grounded_states() {
        let mut catalog = Catalog::in_memory();
        let n = catalog.seed_grounded(&StandardCalibration).unwrap();
        assert_eq!(n, 17);
        assert_eq!(catalog.count(), 17);

        let ketamine = catalog.get("ketamine_anesthesia").unwrap();
        let hit = catalog.nearest(&ketamine.state).unwrap();
        assert_eq!(hit.name, "ketamine_anesthesia");
    }

    #[test]
    fn test_snapshot_restore_keeps_ids() {
        let catalog = small();
        let restored = Catalog::restore(InMemoryIndex::new(), catalog.snapshot()).unwrap();
        assert_eq!(restored.entries(), catalog.entries());
        assert_eq!(restored.count(), 3);
    }

    #[test]
    fn test_snapshot_version_checked() {
        let mut snapshot = small().snapshot();
        snapshot.version = 99;
        assert!(Catalog::restore(InMemoryIndex::new(), snapshot).is_err());
    }

    #[test]
    fn test_query_vector_validates_row() {
        let catalog = small();
        let hits = catalog.query_vector(&[0.20, 0.10, 0.24, 0.35, 0.20], 1).unwrap();
        assert_eq!(hits[0].name, "propofol");

        for bad in [
            [f64::NAN, 0.5, 0.5, 0.5, 0.5],
            [0.5, 0.5, 1.5, 0.5, 0.5],
            [0.5, 0.5, 0.5, -0.1, 0.5],
        ] {
            assert!(matches!(
                catalog.query_vector(&bad, 3),
                Err(ConduitError::Domain { .. })
            ));
        }
    }
}
