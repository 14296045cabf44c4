//! Raw-input encoding plus calibrated-state access.
//!
//! An `Encoder` either owns a `CalibrationProvider` or runs standalone. The
//! standalone form still encodes raw values; anything that needs calibrated
//! states returns `CalibrationUnavailable`.

use crate::calibration::{CalibrationProvider, StandardCalibration};
use crate::density::{self, DensityDecomposition};
use crate::error::{ConduitError, ConduitResult};
use crate::state::{self, StateVector};
use std::sync::Arc;

#[derive(Clone)]
pub struct Encoder {
    calibration: Option<Arc<dyn CalibrationProvider>>,
}

impl Encoder {
    pub fn standalone() -> Self {
        Self { calibration: None }
    }

    pub fn with_calibration(provider: Arc<dyn CalibrationProvider>) -> Self {
        Self {
            calibration: Some(provider),
        }
    }

    /// Encoder backed by the built-in literature states
    pub fn standard() -> Self {
        Self::with_calibration(Arc::new(StandardCalibration))
    }

    pub fn has_calibration(&self) -> bool {
        self.calibration.is_some()
    }

    pub fn provider(&self) -> ConduitResult<&dyn CalibrationProvider> {
        self.calibration
            .as_deref()
            .ok_or(ConduitError::CalibrationUnavailable)
    }

    pub fn encode(
        &self,
        integration: f64,
        temporal_depth: f64,
        binding: f64,
        entropy: f64,
        coherence: f64,
        name: Option<&str>,
    ) -> ConduitResult<StateVector> {
        state::encode(integration, temporal_depth, binding, entropy, coherence, name)
    }

    /// Four-invariant encoding; coherence falls back to `DEFAULT_COHERENCE`
    pub fn encode_classic(
        &self,
        integration: f64,
        temporal_depth: f64,
        binding: f64,
        entropy: f64,
        name: Option<&str>,
    ) -> ConduitResult<StateVector> {
        self.encode(
            integration,
            temporal_depth,
            binding,
            entropy,
            state::DEFAULT_COHERENCE,
            name,
        )
    }

    /// Calibrated state by lookup key, named after its display name
    pub fn from_calibration(&self, key: &str) -> ConduitResult<StateVector> {
        self.provider()?.grounded(key)?.to_state_vector()
    }

    /// Every calibrated state as `(key, vector)`, in provider order
    pub fn calibrated_states(&self) -> ConduitResult<Vec<(String, StateVector)>> {
        self.provider()?
            .grounded_states()?
            .into_iter()
            .map(|(key, grounded)| Ok((key, grounded.to_state_vector()?)))
            .collect()
    }

    pub fn density_of(&self, key: &str) -> ConduitResult<(f64, DensityDecomposition)> {
        let state = self.from_calibration(key)?;
        let parts = state.decompose();
        Ok((parts.density, parts))
    }

    /// `(key, density)` for each key, sorted by density descending
    pub fn compare(&self, keys: &[&str]) -> ConduitResult<Vec<(String, f64)>> {
        let mut rows = keys
            .iter()
            .map(|key| Ok((key.to_string(), self.from_calibration(key)?.density())))
            .collect::<ConduitResult<Vec<_>>>()?;
        rows.sort_by(|a, b| b.1.total_cmp(&a.1));
        Ok(rows)
    }

    /// density(a) / density(b)
    pub fn ratio(&self, a: &str, b: &str) -> ConduitResult<f64> {
        let da = self.from_calibration(a)?.density();
        let db = self.from_calibration(b)?.density();
        Ok(density::density_ratio(da, db))
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for Encoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encoder")
            .field("calibration", &self.has_calibration())
            .finish()
    }
}
