//! ═══════════════════════════════════════════════════════════════════════════════
//! DENSITY — The Perspectival Density Formula
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! ```text
//! D = φ × τ × ρ × clamp[(1 − √H) + (H × κ)]
//! ```
//!
//! Two parts:
//! - Structure `φ × τ × ρ` is a strict product. Any structural zero gives D = 0
//!   exactly; there is no partial credit.
//! - The entropy gate is 1 at H = 0 and tends to κ as H → 1, so coherent
//!   high-entropy states lose less than incoherent ones.
//!
//! This is the only copy of the formula in the crate. Everything else calls it.
//! ═══════════════════════════════════════════════════════════════════════════════

use crate::error::ConduitResult;
use crate::state::StateVector;
use serde::{Deserialize, Serialize};

/// φ × τ × ρ
#[inline]
pub fn structure(integration: f64, temporal_depth: f64, binding: f64) -> f64 {
    integration * temporal_depth * binding
}

/// (1 − √H), the raw entropy penalty
#[inline]
pub fn entropy_penalty(entropy: f64) -> f64 {
    1.0 - entropy.sqrt()
}

/// H × κ, the coherence rescue
#[inline]
pub fn coherence_rescue(entropy: f64, coherence: f64) -> f64 {
    entropy * coherence
}

/// Penalty plus rescue, clamped to [0, 1]
#[inline]
pub fn entropy_gate(entropy: f64, coherence: f64) -> f64 {
    (entropy_penalty(entropy) + coherence_rescue(entropy, coherence)).clamp(0.0, 1.0)
}

/// Perspectival density of a state
pub fn density(state: &StateVector) -> f64 {
    structure(state.integration(), state.temporal_depth(), state.binding())
        * entropy_gate(state.entropy(), state.coherence())
}

/// Density from raw parameters, validating them first
///
/// ```
/// let d = conduit::density::density_of(0.80, 0.75, 0.65, 0.50, 0.65).unwrap();
/// assert!((d - 0.2410).abs() < 1e-4);
/// assert!(conduit::density::density_of(1.2, 0.5, 0.5, 0.5, 0.5).is_err());
/// ```
pub fn density_of(
    integration: f64,
    temporal_depth: f64,
    binding: f64,
    entropy: f64,
    coherence: f64,
) -> ConduitResult<f64> {
    StateVector::new(integration, temporal_depth, binding, entropy, coherence).map(|s| s.density())
}

/// Intermediate terms of the density computation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DensityDecomposition {
    pub structure: f64,
    pub entropy_penalty: f64,
    pub coherence_rescue: f64,
    pub entropy_gate: f64,
    pub density: f64,
}

/// Same computation as `density`, with every intermediate term exposed
pub fn decompose(state: &StateVector) -> DensityDecomposition {
    let structure = structure(state.integration(), state.temporal_depth(), state.binding());
    let entropy_penalty = entropy_penalty(state.entropy());
    let coherence_rescue = coherence_rescue(state.entropy(), state.coherence());
    let entropy_gate = entropy_gate(state.entropy(), state.coherence());

    DensityDecomposition {
        structure,
        entropy_penalty,
        coherence_rescue,
        entropy_gate,
        density: structure * entropy_gate,
    }
}

/// `a / b`, with `+∞` when only `b` is zero and `1.0` when both are
pub fn density_ratio(a: f64, b: f64) -> f64 {
    if b == 0.0 {
        if a > 0.0 {
            f64::INFINITY
        } else {
            1.0
        }
    } else {
        a / b
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
