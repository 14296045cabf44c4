//! ═══════════════════════════════════════════════════════════════════════════════
//! STATE — The Five-Invariant State Vector
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! A state is five bounded scalars:
//!
//! | Axis             | Symbol | Meaning                                  |
//! |------------------|--------|------------------------------------------|
//! | integration      | φ      | structural unification                   |
//! | temporal_depth   | τ      | reach of binding across time             |
//! | binding          | ρ      | recurrent / re-entrant coupling strength |
//! | entropy          | H      | unpredictability of output               |
//! | coherence        | κ      | structure present within the entropy     |
//!
//! Every attribute lives in [0, 1]. Construction rejects anything else; it
//! never clamps. Operators clamp their *outputs* through `clamped`, which is
//! crate-private. Instances are immutable: transforms return new vectors.
//! ═══════════════════════════════════════════════════════════════════════════════

use crate::density;
use crate::error::{ConduitError, ConduitResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coherence assumed by callers that only know the four classic invariants
pub const DEFAULT_COHERENCE: f64 = 0.50;

// ═══════════════════════════════════════════════════════════════════════════════
// AXIS
// ═══════════════════════════════════════════════════════════════════════════════

/// One of the five attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Integration,
    TemporalDepth,
    Binding,
    Entropy,
    Coherence,
}

impl Axis {
    /// All axes in storage order (φ, τ, ρ, H, κ)
    pub const ALL: [Axis; 5] = [
        Axis::Integration,
        Axis::TemporalDepth,
        Axis::Binding,
        Axis::Entropy,
        Axis::Coherence,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::Integration => "integration",
            Axis::TemporalDepth => "temporal_depth",
            Axis::Binding => "binding",
            Axis::Entropy => "entropy",
            Axis::Coherence => "coherence",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Axis::Integration => "φ",
            Axis::TemporalDepth => "τ",
            Axis::Binding => "ρ",
            Axis::Entropy => "H",
            Axis::Coherence => "κ",
        }
    }

    /// Position in `to_array()`
    pub fn index(&self) -> usize {
        match self {
            Axis::Integration => 0,
            Axis::TemporalDepth => 1,
            Axis::Binding => 2,
            Axis::Entropy => 3,
            Axis::Coherence => 4,
        }
    }

    /// True for the three multiplicative structural terms
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Axis::Integration | Axis::TemporalDepth | Axis::Binding
        )
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Axis {
    type Err = ConduitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "integration" | "phi" => Ok(Axis::Integration),
            "temporal_depth" | "temporal-depth" | "tau" => Ok(Axis::TemporalDepth),
            "binding" | "rho" => Ok(Axis::Binding),
            "entropy" | "h" => Ok(Axis::Entropy),
            "coherence" | "kappa" => Ok(Axis::Coherence),
            _ => Err(ConduitError::not_found(
                "axis",
                s,
                Axis::ALL.iter().map(|a| a.as_str()),
            )),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATE VECTOR
// ═══════════════════════════════════════════════════════════════════════════════

/// An immutable point in the five-dimensional state space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStateVector")]
pub struct StateVector {
    integration: f64,
    temporal_depth: f64,
    binding: f64,
    entropy: f64,
    coherence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    /// Informal confidence label, never used in computation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    confidence: Option<String>,
}

/// Unvalidated wire form; every deserialized vector goes through `new`
#[derive(Deserialize)]
struct RawStateVector {
    integration: f64,
    temporal_depth: f64,
    binding: f64,
    entropy: f64,
    coherence: f64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    confidence: Option<String>,
}

impl TryFrom<RawStateVector> for StateVector {
    type Error = ConduitError;

    fn try_from(raw: RawStateVector) -> Result<Self, Self::Error> {
        let mut state = StateVector::new(
            raw.integration,
            raw.temporal_depth,
            raw.binding,
            raw.entropy,
            raw.coherence,
        )?;
        state.name = raw.name;
        state.confidence = raw.confidence;
        Ok(state)
    }
}

fn check(field: &str, value: f64) -> ConduitResult<f64> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ConduitError::domain(field, value))
    }
}

/// Clamp into [0, 1]; NaN collapses to zero
fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

impl StateVector {
    /// Validated construction. Fails on the first attribute outside [0, 1].
    pub fn new(
        integration: f64,
        temporal_depth: f64,
        binding: f64,
        entropy: f64,
        coherence: f64,
    ) -> ConduitResult<Self> {
        Ok(Self {
            integration: check("integration", integration)?,
            temporal_depth: check("temporal_depth", temporal_depth)?,
            binding: check("binding", binding)?,
            entropy: check("entropy", entropy)?,
            coherence: check("coherence", coherence)?,
            name: None,
            confidence: None,
        })
    }

    /// Build from `[φ, τ, ρ, H, κ]`
    pub fn from_array(values: [f64; 5]) -> ConduitResult<Self> {
        Self::new(values[0], values[1], values[2], values[3], values[4])
    }

    /// Operator output path: clamps instead of failing
    pub(crate) fn clamped(
        integration: f64,
        temporal_depth: f64,
        binding: f64,
        entropy: f64,
        coherence: f64,
    ) -> Self {
        Self {
            integration: unit(integration),
            temporal_depth: unit(temporal_depth),
            binding: unit(binding),
            entropy: unit(entropy),
            coherence: unit(coherence),
            name: None,
            confidence: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_confidence(mut self, confidence: impl Into<String>) -> Self {
        self.confidence = Some(confidence.into());
        self
    }

    pub(crate) fn with_name_opt(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    /// Copy with one attribute replaced (validated)
    pub fn with(&self, axis: Axis, value: f64) -> ConduitResult<Self> {
        let mut values = self.to_array();
        values[axis.index()] = check(axis.as_str(), value)?;
        let mut next = Self::from_array(values)?;
        next.name = self.name.clone();
        next.confidence = self.confidence.clone();
        Ok(next)
    }

    pub fn integration(&self) -> f64 {
        self.integration
    }

    pub fn temporal_depth(&self) -> f64 {
        self.temporal_depth
    }

    pub fn binding(&self) -> f64 {
        self.binding
    }

    pub fn entropy(&self) -> f64 {
        self.entropy
    }

    pub fn coherence(&self) -> f64 {
        self.coherence
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn confidence(&self) -> Option<&str> {
        self.confidence.as_deref()
    }

    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Integration => self.integration,
            Axis::TemporalDepth => self.temporal_depth,
            Axis::Binding => self.binding,
            Axis::Entropy => self.entropy,
            Axis::Coherence => self.coherence,
        }
    }

    /// `[φ, τ, ρ, H, κ]`, the layout used by the neighbour index
    pub fn to_array(&self) -> [f64; 5] {
        [
            self.integration,
            self.temporal_depth,
            self.binding,
            self.entropy,
            self.coherence,
        ]
    }

    /// Perspectival density (derived, never stored)
    pub fn density(&self) -> f64 {
        density::density(self)
    }

    pub fn decompose(&self) -> density::DensityDecomposition {
        density::decompose(self)
    }

    /// Euclidean distance in attribute space
    pub fn distance(&self, other: &StateVector) -> f64 {
        euclidean(&self.to_array(), &other.to_array())
    }
}

impl fmt::Display for StateVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "StateVector('{}': ", name)?,
            None => write!(f, "StateVector(unnamed: ")?,
        }
        write!(
            f,
            "φ={:.2}, τ={:.2}, ρ={:.2}, H={:.2}, κ={:.2}, D={:.4})",
            self.integration,
            self.temporal_depth,
            self.binding,
            self.entropy,
            self.coherence,
            self.density()
        )
    }
}

pub(crate) fn euclidean(a: &[f64; 5], b: &[f64; 5]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENCODING & INTERPOLATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Encode raw inputs into a validated state
pub fn encode(
    integration: f64,
    temporal_depth: f64,
    binding: f64,
    entropy: f64,
    coherence: f64,
    name: Option<&str>,
) -> ConduitResult<StateVector> {
    let state = StateVector::new(integration, temporal_depth, binding, entropy, coherence)?;
    Ok(state.with_name_opt(name.map(str::to_string)))
}

/// Linear interpolation between two states (t = 0 → a, t = 1 → b)
pub fn interpolate(a: &StateVector, b: &StateVector, t: f64) -> ConduitResult<StateVector> {
    if !(0.0..=1.0).contains(&t) {
        return Err(ConduitError::InvalidArgument(format!(
            "t must be in [0, 1], got {}",
            t
        )));
    }

    let (from, to) = (a.to_array(), b.to_array());
    let mut mixed = [0.0; 5];
    for i in 0..5 {
        mixed[i] = from[i] + t * (to[i] - from[i]);
    }

    // Convex combination of in-range values stays in range; clamp only
    // absorbs last-bit rounding.
    let [i, tau, rho, h, k] = mixed;
    Ok(StateVector::clamped(i, tau, rho, h, k).with_name(format!("Interpolated({:.2})", t)))
}

/// `steps + 1` states from `a` to `b`, endpoints included
pub fn path_between(
    a: &StateVector,
    b: &StateVector,
    steps: usize,
) -> ConduitResult<Vec<StateVector>> {
    if steps == 0 {
        return Err(ConduitError::InvalidArgument(
            "path needs at least one step".to_string(),
        ));
    }
    (0..=steps)
        .map(|i| interpolate(a, b, i as f64 / steps as f64))
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn wake() -> StateVector {
        StateVector::new(0.80, 0.50, 0.55, 0.50, 0.50)
            .unwrap()
            .with_name("Wakefulness")
    }

    #[test]
    fn test_rejects_out_of_range() {
        let err = StateVector::new(0.5, 0.5, 1.2, 0.5, 0.5).unwrap_err();
        match err {
            ConduitError::Domain { field, value } => {
                assert_eq!(field, "binding");
                assert_eq!(value, 1.2);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(StateVector::new(-0.01, 0.5, 0.5, 0.5, 0.5).is_err());
        assert!(StateVector::new(0.5, 0.5, 0.5, f64::NAN, 0.5).is_err());
    }

    #[test]
    fn test_accepts_closed_bounds() {
        assert!(StateVector::new(0.0, 0.0, 0.0, 0.0, 0.0).is_ok());
        assert!(StateVector::new(1.0, 1.0, 1.0, 1.0, 1.0).is_ok());
    }

    #[test]
    fn test_clamped_absorbs_everything() {
        let s = StateVector::clamped(1.5, -0.2, f64::NAN, 0.3, 2.0);
        assert_eq!(s.to_array(), [1.0, 0.0, 0.0, 0.3, 1.0]);
    }

    #[test]
    fn test_axis_roundtrip_names() {
        for axis in Axis::ALL {
            assert_eq!(axis.as_str().parse::<Axis>().unwrap(), axis);
        }
        assert_eq!("kappa".parse::<Axis>().unwrap(), Axis::Coherence);
        assert_eq!("H".parse::<Axis>().unwrap(), Axis::Entropy);
        assert!("valence".parse::<Axis>().is_err());
    }

    #[test]
    fn test_with_replaces_single_axis() {
        let s = wake();
        let t = s.with(Axis::Entropy, 0.9).unwrap();
        assert_eq!(t.entropy(), 0.9);
        assert_eq!(t.integration(), s.integration());
        assert_eq!(t.name(), Some("Wakefulness"));
        assert!(s.with(Axis::Coherence, 1.1).is_err());
    }

    #[test]
    fn test_display_includes_density() {
        let text = wake().to_string();
        assert!(text.starts_with("StateVector('Wakefulness': φ=0.80"));
        assert!(text.contains("D=0.1194"));
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: StateVector = serde_json::from_str(
            r#"{"integration":0.8,"temporal_depth":0.5,"binding":0.55,"entropy":0.5,"coherence":0.5,"name":"w"}"#,
        )
        .unwrap();
        assert_eq!(ok.name(), Some("w"));

        let bad = serde_json::from_str::<StateVector>(
            r#"{"integration":1.8,"temporal_depth":0.5,"binding":0.55,"entropy":0.5,"coherence":0.5}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_interpolate_endpoints() {
        let a = wake();
        let b = StateVector::new(0.20, 0.10, 0.215, 0.35, 0.20).unwrap();

        let start = interpolate(&a, &b, 0.0).unwrap();
        let end = interpolate(&a, &b, 1.0).unwrap();
        for axis in Axis::ALL {
            assert!((start.get(axis) - a.get(axis)).abs() < 1e-12);
            assert!((end.get(axis) - b.get(axis)).abs() < 1e-12);
        }
        assert!(interpolate(&a, &b, 1.5).is_err());
    }

    #[test]
    fn test_path_between_length_and_monotone_density() {
        let a = wake();
        let b = StateVector::new(0.20, 0.10, 0.215, 0.35, 0.20).unwrap();
        let path = path_between(&a, &b, 5).unwrap();

        assert_eq!(path.len(), 6);
        assert!(path.first().unwrap().density() > path.last().unwrap().density());
        assert!(path_between(&a, &b, 0).is_err());
    }

    #[test]
    fn test_distance_zero_to_self() {
        let a = wake();
        assert_eq!(a.distance(&a), 0.0);
        let b = a.with(Axis::Binding, 0.95).unwrap();
        assert!((a.distance(&b) - 0.40).abs() < 1e-12);
    }
}
