//! ═══════════════════════════════════════════════════════════════════════════════
//! EXPORT — Result Files
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! The one persisted shape is the density record:
//!
//! ```text
//! {name, integration, temporal_depth, binding, entropy, coherence, density}
//! ```
//!
//! A run writes either a name → record mapping or a list of trajectory records.
//! File naming and layout are the caller's business.
//! ═══════════════════════════════════════════════════════════════════════════════

pub mod json;

pub use json::{read_json, write_json, write_ndjson, JsonExportConfig};

use crate::state::StateVector;
use crate::trajectory::TrajectoryRecord;
use serde::{Deserialize, Serialize};

/// One state's attributes and density, as written to disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityRecord {
    pub name: Option<String>,
    pub integration: f64,
    pub temporal_depth: f64,
    pub binding: f64,
    pub entropy: f64,
    pub coherence: f64,
    pub density: f64,
}

impl From<&StateVector> for DensityRecord {
    fn from(state: &StateVector) -> Self {
        Self {
            name: state.name().map(str::to_string),
            integration: state.integration(),
            temporal_depth: state.temporal_depth(),
            binding: state.binding(),
            entropy: state.entropy(),
            coherence: state.coherence(),
            density: state.density(),
        }
    }
}

impl From<&TrajectoryRecord> for DensityRecord {
    fn from(record: &TrajectoryRecord) -> Self {
        Self {
            name: record.name.clone(),
            integration: record.integration,
            temporal_depth: record.temporal_depth,
            binding: record.binding,
            entropy: record.entropy,
            coherence: record.coherence,
            density: record.density,
        }
    }
}

impl DensityRecord {
    /// Rebuild the validated state; fails if the file was edited out of range
    pub fn to_state(&self) -> crate::error::ConduitResult<StateVector> {
        let state = StateVector::new(
            self.integration,
            self.temporal_depth,
            self.binding,
            self.entropy,
            self.coherence,
        )?;
        Ok(match &self.name {
            Some(name) => state.with_name(name.clone()),
            None => state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_shape() {
        let s = StateVector::new(0.8, 0.75, 0.65, 0.5, 0.65)
            .unwrap()
            .with_name("wake");
        let value = serde_json::to_value(DensityRecord::from(&s)).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        for key in [
            "name",
            "integration",
            "temporal_depth",
            "binding",
            "entropy",
            "coherence",
            "density",
        ] {
            assert!(keys.contains(&key), "missing {key}");
        }
        assert_eq!(keys.len(), 7);
        assert_eq!(value["density"].as_f64().unwrap(), s.density());
    }

    #[test]
    fn test_record_to_state_validates() {
        let mut r = DensityRecord::from(&StateVector::new(0.5, 0.5, 0.5, 0.5, 0.5).unwrap());
        assert!(r.to_state().is_ok());
        r.entropy = 1.5;
        assert!(r.to_state().is_err());
    }
}
