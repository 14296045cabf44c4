//! ═══════════════════════════════════════════════════════════════════════════════
//! OPERATORS — Directional Perturbations of a State
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Every operator is a pure function from (state, amount) to a new state:
//! - targeted attributes move by an additive or multiplicative delta
//! - every output attribute is clamped back into [0, 1]
//! - untargeted attributes are copied bit-for-bit
//! - the input is never touched
//!
//! Single-axis operators take a signed magnitude. Multi-axis operators take a
//! progress fraction (stage, depth, intensity, severity); values outside
//! [0, 1] are accepted and the clamp absorbs whatever they produce.
//! ═══════════════════════════════════════════════════════════════════════════════

use crate::error::{ConduitError, ConduitResult};
use crate::state::StateVector;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ═══════════════════════════════════════════════════════════════════════════════
// SINGLE-AXIS OPERATORS
// ═══════════════════════════════════════════════════════════════════════════════

fn rebuild(state: &StateVector, values: [f64; 5]) -> StateVector {
    let [i, t, b, h, k] = values;
    StateVector::clamped(i, t, b, h, k).with_name_opt(state.name().map(str::to_string))
}

/// ρ + magnitude. Drifting focus, anesthesia onset.
pub fn perturb_binding(state: &StateVector, magnitude: f64) -> StateVector {
    let mut v = state.to_array();
    v[2] += magnitude;
    rebuild(state, v)
}

/// φ − magnitude. Positive magnitudes fragment the system.
pub fn fracture_integration(state: &StateVector, magnitude: f64) -> StateVector {
    let mut v = state.to_array();
    v[0] -= magnitude;
    rebuild(state, v)
}

/// τ + magnitude. Positive extends the present, negative compresses it.
pub fn stretch_temporal_depth(state: &StateVector, magnitude: f64) -> StateVector {
    let mut v = state.to_array();
    v[1] += magnitude;
    rebuild(state, v)
}

/// H + magnitude
pub fn inject_entropy(state: &StateVector, magnitude: f64) -> StateVector {
    let mut v = state.to_array();
    v[3] += magnitude;
    rebuild(state, v)
}

/// κ + magnitude
pub fn modulate_coherence(state: &StateVector, magnitude: f64) -> StateVector {
    let mut v = state.to_array();
    v[4] += magnitude;
    rebuild(state, v)
}

// ═══════════════════════════════════════════════════════════════════════════════
// MULTI-AXIS OPERATORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Integration retained by each hemisphere after callosotomy
pub const SPLIT_BRAIN_INTEGRATION: f64 = 0.6;

/// Progressive decay; temporal depth goes fastest, binding slowest.
pub fn dementia_progression(state: &StateVector, stage: f64) -> StateVector {
    StateVector::clamped(
        state.integration() * (1.0 - stage * 0.5),
        state.temporal_depth() * (1.0 - stage * 0.9),
        state.binding() * (1.0 - stage * 0.3),
        state.entropy() + stage * 0.4,
        state.coherence() * (1.0 - stage * 0.4),
    )
    .with_name(format!("Dementia(stage={:.1})", stage))
}

/// One state becomes two narrower ones. Only integration changes.
pub fn split_brain(state: &StateVector) -> (StateVector, StateVector) {
    let hemisphere = |name: &str| {
        StateVector::clamped(
            state.integration() * SPLIT_BRAIN_INTEGRATION,
            state.temporal_depth(),
            state.binding(),
            state.entropy(),
            state.coherence(),
        )
        .with_name(name)
    };
    (hemisphere("Left Hemisphere"), hemisphere("Right Hemisphere"))
}

/// Joint collapse toward zero; binding goes first.
pub fn anesthesia_gradient(state: &StateVector, depth: f64) -> StateVector {
    StateVector::clamped(
        state.integration() * (1.0 - depth * 0.7),
        state.temporal_depth() * (1.0 - depth * 0.8),
        state.binding() * (1.0 - depth),
        state.entropy() * (1.0 - depth * 0.9),
        state.coherence() * (1.0 - depth * 0.6),
    )
    .with_name(format!("Anesthesia(depth={:.2})", depth))
}

/// Topology intact, motor output severed. Density is unchanged.
pub fn locked_in_syndrome(state: &StateVector) -> StateVector {
    state.clone().with_name("Locked-in Syndrome")
}

/// Structure up, entropy down, coherence up.
pub fn flow_state_induction(state: &StateVector, intensity: f64) -> StateVector {
    StateVector::clamped(
        state.integration() + intensity * 0.3,
        state.temporal_depth() + intensity * 0.2,
        state.binding() + intensity * 0.25,
        state.entropy() - intensity * 0.4,
        state.coherence() + intensity * 0.3,
    )
    .with_name(format!("Flow(intensity={:.2})", intensity))
}

/// Global alarm: slight integration and binding gain, shorter present,
/// entropy up, coherence down.
pub fn panic_induction(state: &StateVector, severity: f64) -> StateVector {
    StateVector::clamped(
        state.integration() + severity * 0.1,
        state.temporal_depth() - severity * 0.3,
        state.binding() + severity * 0.15,
        state.entropy() + severity * 0.5,
        state.coherence() - severity * 0.4,
    )
    .with_name(format!("Panic(severity={:.2})", severity))
}

/// Coherence gain lags entropy gain: κ moves with intensity^1.5.
pub fn psychedelic_onset(state: &StateVector, intensity: f64) -> StateVector {
    StateVector::clamped(
        state.integration() + intensity * 0.1,
        state.temporal_depth() + intensity * 0.3,
        state.binding(),
        state.entropy() + intensity * 0.35,
        state.coherence() + coherence_lag(intensity) * 0.4,
    )
    .with_name(format!("Psychedelic(intensity={:.2})", intensity))
}

/// intensity^1.5, signed so negative intensities stay finite
fn coherence_lag(intensity: f64) -> f64 {
    intensity.signum() * intensity.abs().powf(1.5)
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPERATOR CATALOG
// ═══════════════════════════════════════════════════════════════════════════════

/// Anything that maps (state, amount) to a new state
pub trait Perturbation {
    fn apply(&self, state: &StateVector, amount: f64) -> StateVector;
}

impl<F> Perturbation for F
where
    F: Fn(&StateVector, f64) -> StateVector,
{
    fn apply(&self, state: &StateVector, amount: f64) -> StateVector {
        self(state, amount)
    }
}

/// Every operator that can be swept over an amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    PerturbBinding,
    FractureIntegration,
    StretchTemporalDepth,
    InjectEntropy,
    ModulateCoherence,
    DementiaProgression,
    AnesthesiaGradient,
    FlowStateInduction,
    PanicInduction,
    PsychedelicOnset,
}

impl Operator {
    pub const ALL: [Operator; 10] = [
        Operator::PerturbBinding,
        Operator::FractureIntegration,
        Operator::StretchTemporalDepth,
        Operator::InjectEntropy,
        Operator::ModulateCoherence,
        Operator::DementiaProgression,
        Operator::AnesthesiaGradient,
        Operator::FlowStateInduction,
        Operator::PanicInduction,
        Operator::PsychedelicOnset,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Operator::PerturbBinding => "perturb_binding",
            Operator::FractureIntegration => "fracture_integration",
            Operator::StretchTemporalDepth => "stretch_temporal_depth",
            Operator::InjectEntropy => "inject_entropy",
            Operator::ModulateCoherence => "modulate_coherence",
            Operator::DementiaProgression => "dementia_progression",
            Operator::AnesthesiaGradient => "anesthesia_gradient",
            Operator::FlowStateInduction => "flow_state_induction",
            Operator::PanicInduction => "panic_induction",
            Operator::PsychedelicOnset => "psychedelic_onset",
        }
    }

    /// Single-axis operators take a signed magnitude; the rest a fraction
    pub fn is_single_axis(&self) -> bool {
        matches!(
            self,
            Operator::PerturbBinding
                | Operator::FractureIntegration
                | Operator::StretchTemporalDepth
                | Operator::InjectEntropy
                | Operator::ModulateCoherence
        )
    }

    /// One-line account of what the transition did
    pub fn describe(&self, before: &StateVector, after: &StateVector) -> String {
        let summary = match self {
            Operator::PerturbBinding => "Re-entrant binding modulated",
            Operator::FractureIntegration => "Structural integration fractured",
            Operator::StretchTemporalDepth => "Temporal depth stretched",
            Operator::InjectEntropy => "Entropy injected",
            Operator::ModulateCoherence => "Coherence modulated",
            Operator::DementiaProgression => {
                "Temporal depth severely impaired, but immediate 'now' persists"
            }
            Operator::AnesthesiaGradient => "Re-entrant binding collapsed",
            Operator::FlowStateInduction => "Extended temporal binding, low entropy",
            Operator::PanicInduction => "High entropy, low coherence",
            Operator::PsychedelicOnset => "Entropy rises first; coherence catches up with delay",
        };
        format!(
            "{}: {}. D {:.4} -> {:.4}",
            self.name(),
            summary,
            before.density(),
            after.density()
        )
    }
}

impl Perturbation for Operator {
    fn apply(&self, state: &StateVector, amount: f64) -> StateVector {
        match self {
            Operator::PerturbBinding => perturb_binding(state, amount),
            Operator::FractureIntegration => fracture_integration(state, amount),
            Operator::StretchTemporalDepth => stretch_temporal_depth(state, amount),
            Operator::InjectEntropy => inject_entropy(state, amount),
            Operator::ModulateCoherence => modulate_coherence(state, amount),
            Operator::DementiaProgression => dementia_progression(state, amount),
            Operator::AnesthesiaGradient => anesthesia_gradient(state, amount),
            Operator::FlowStateInduction => flow_state_induction(state, amount),
            Operator::PanicInduction => panic_induction(state, amount),
            Operator::PsychedelicOnset => psychedelic_onset(state, amount),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operator {
    type Err = ConduitError;

    fn from_str(s: &str) -> ConduitResult<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Operator::ALL
            .iter()
            .copied()
            .find(|op| op.name() == wanted)
            .ok_or_else(|| {
                ConduitError::not_found("operator", s, Operator::ALL.iter().map(|o| o.name()))
            })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
