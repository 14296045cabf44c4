//! ═══════════════════════════════════════════════════════════════════════════════
//! ANALYSIS — Structural Checks on the Density Surface
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! - Zero elimination: any structural zero must give D = 0 exactly
//! - Coherence gate: the same entropy reads differently under different κ
//! - Sensitivity: finite-difference ∂D/∂axis around a state
//! - Degeneracy: topologically distant states that share a density
//!
//! Pure functions. Sampling takes an explicit seed.
//! ═══════════════════════════════════════════════════════════════════════════════

use crate::density::{self, DensityDecomposition};
use crate::error::{ConduitError, ConduitResult};
use crate::state::{Axis, StateVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

/// Value held by the structural axes that a sweep is not varying
pub const SWEEP_FIXED: f64 = 0.9;
/// Pairs closer than this in density count as degenerate
pub const DEGENERACY_DENSITY_EPS: f64 = 0.001;
/// ... provided they are at least this far apart in (φ, ρ, H)
pub const DEGENERACY_MIN_TOPOLOGY: f64 = 0.5;
pub const MAX_DEGENERACIES: usize = 20;

fn linspace(start: f64, end: f64, n: usize) -> impl Iterator<Item = f64> {
    let step = if n > 1 {
        (end - start) / (n - 1) as f64
    } else {
        0.0
    };
    (0..n).map(move |i| start + step * i as f64)
}

// ═══════════════════════════════════════════════════════════════════════════════
// ZERO ELIMINATION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct ZeroCase {
    pub case: String,
    pub density: f64,
    pub is_zero: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ZeroEliminationReport {
    pub cases: Vec<ZeroCase>,
    pub holds: bool,
    pub n_tests: usize,
    pub n_passed: usize,
}

/// One structural axis zeroed, the other two high, H = κ = 0.5
pub fn zero_elimination_report() -> ZeroEliminationReport {
    let mut cases = Vec::with_capacity(9);

    for high in [0.9, 0.95, 1.0] {
        for zeroed in [Axis::Integration, Axis::TemporalDepth, Axis::Binding] {
            let mut values = [high, high, high, 0.5, 0.5];
            values[zeroed.index()] = 0.0;
            let d = density::structure(values[0], values[1], values[2])
                * density::entropy_gate(values[3], values[4]);

            cases.push(ZeroCase {
                case: format!(
                    "φ={}, τ={}, ρ={}",
                    values[0], values[1], values[2]
                ),
                density: d,
                is_zero: d == 0.0,
            });
        }
    }

    let n_passed = cases.iter().filter(|c| c.is_zero).count();
    ZeroEliminationReport {
        n_tests: cases.len(),
        holds: n_passed == cases.len(),
        n_passed,
        cases,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COHERENCE GATE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct GateCase {
    pub name: &'static str,
    pub entropy: f64,
    pub coherence: f64,
    pub terms: DensityDecomposition,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoherenceGateReport {
    /// (φ, τ, ρ) shared by every case
    pub structure: [f64; 3],
    pub cases: Vec<GateCase>,
    /// Structured chaos outranks unstructured chaos at equal entropy
    pub dmt_resolves: bool,
}

const GATE_STRUCTURE: [f64; 3] = [0.60, 0.50, 0.50];

const GATE_CASES: [(&str, f64, f64); 7] = [
    ("Low H, Low κ (normal)", 0.30, 0.30),
    ("Low H, High κ (focused)", 0.30, 0.80),
    ("High H, Low κ (panic)", 0.80, 0.20),
    ("High H, High κ (DMT)", 0.80, 0.85),
    ("Max H, Zero κ (pure chaos)", 1.00, 0.00),
    ("Max H, Max κ (max structured chaos)", 1.00, 1.00),
    ("Zero H, Any κ (perfect order)", 0.00, 0.50),
];

pub fn coherence_gate_cases() -> CoherenceGateReport {
    let [phi, tau, rho] = GATE_STRUCTURE;
    let cases: Vec<GateCase> = GATE_CASES
        .iter()
        .map(|&(name, entropy, coherence)| {
            // Every constant above is in range, so the clamped path is exact
            let state = StateVector::clamped(phi, tau, rho, entropy, coherence);
            GateCase {
                name,
                entropy,
                coherence,
                terms: state.decompose(),
            }
        })
        .collect();

    let dmt_resolves = cases[3].terms.density > cases[2].terms.density;
    CoherenceGateReport {
        structure: GATE_STRUCTURE,
        cases,
        dmt_resolves,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SENSITIVITY
// ═══════════════════════════════════════════════════════════════════════════════

/// Finite-difference ∂D/∂axis at `base`.
///
/// Steps forward by `perturbation`, or backward where forward would leave
/// [0, 1]. `perturbation` must be in (0, 0.5].
pub fn sensitivity(base: &StateVector, perturbation: f64) -> ConduitResult<Vec<(Axis, f64)>> {
    if !(perturbation > 0.0 && perturbation <= 0.5) {
        return Err(ConduitError::InvalidArgument(format!(
            "perturbation must be in (0, 0.5], got {}",
            perturbation
        )));
    }

    let base_d = base.density();
    Axis::ALL
        .iter()
        .map(|&axis| {
            let value = base.get(axis);
            let delta = if value + perturbation > 1.0 {
                -perturbation
            } else {
                perturbation
            };
            let moved = base.with(axis, value + delta)?;
            Ok((axis, (moved.density() - base_d) / delta))
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// SWEEPS
// ═══════════════════════════════════════════════════════════════════════════════

/// Density along `axis` over [0, 1] in `resolution` points.
///
/// Unvaried structural axes sit at 0.9; unvaried H and κ take the given values.
pub fn gradient_sweep(
    axis: Axis,
    entropy: f64,
    coherence: f64,
    resolution: usize,
) -> ConduitResult<Vec<(f64, f64)>> {
    if resolution < 2 {
        return Err(ConduitError::InvalidArgument(
            "sweep resolution must be at least 2".to_string(),
        ));
    }
    let anchor = StateVector::new(SWEEP_FIXED, SWEEP_FIXED, SWEEP_FIXED, entropy, coherence)?;

    linspace(0.0, 1.0, resolution)
        .map(|x| {
            // Last-bit rounding can put x a hair over 1.0
            let x = x.min(1.0);
            Ok((x, anchor.with(axis, x)?.density()))
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct Degeneracy {
    pub first: StateVector,
    pub second: StateVector,
    pub density_diff: f64,
    pub topology_diff: f64,
}

/// Grid pairs with near-equal density but distant (φ, ρ, H).
///
/// The grid spans φ and ρ over [0.1, 0.9] at `resolution` points each, H in
/// {0.3, 0.5, 0.7}, with τ = κ = 0.5. Returns the first twenty found.
pub fn find_degeneracies(resolution: usize) -> Vec<Degeneracy> {
    let mut grid = Vec::with_capacity(resolution * resolution * 3);
    for phi in linspace(0.1, 0.9, resolution) {
        for rho in linspace(0.1, 0.9, resolution) {
            for h in [0.3, 0.5, 0.7] {
                grid.push(StateVector::clamped(phi, 0.5, rho, h, 0.5));
            }
        }
    }

    let densities: Vec<f64> = grid.iter().map(StateVector::density).collect();
    let mut found = Vec::new();

    for i in 0..grid.len() {
        for j in (i + 1)..grid.len() {
            let density_diff = (densities[i] - densities[j]).abs();
            if density_diff >= DEGENERACY_DENSITY_EPS {
                continue;
            }
            let (a, b) = (&grid[i], &grid[j]);
            let topology_diff = (a.integration() - b.integration()).abs()
                + (a.binding() - b.binding()).abs()
                + (a.entropy() - b.entropy()).abs();
            if topology_diff > DEGENERACY_MIN_TOPOLOGY {
                found.push(Degeneracy {
                    first: a.clone(),
                    second: b.clone(),
                    density_diff,
                    topology_diff,
                });
                if found.len() == MAX_DEGENERACIES {
                    return found;
                }
            }
        }
    }
    found
}

// ═══════════════════════════════════════════════════════════════════════════════
// ISOCLINES
// ═══════════════════════════════════════════════════════════════════════════════

const ISOCLINE_ATTEMPTS_PER_SAMPLE: usize = 10_000;
/// Largest sample count a single call accepts
pub const MAX_ISOCLINE_SAMPLES: usize = 100_000;

/// Up to `samples` uniform random states with |D − target| ≤ tolerance.
///
/// Rejection sampling with a bounded number of draws; may return fewer than
/// requested for targets the surface rarely reaches.
pub fn sample_isocline(
    target: f64,
    tolerance: f64,
    samples: usize,
    seed: u64,
) -> ConduitResult<Vec<StateVector>> {
    if !(0.0..=1.0).contains(&target) {
        return Err(ConduitError::domain("target", target));
    }
    if !(tolerance > 0.0) {
        return Err(ConduitError::InvalidArgument(format!(
            "tolerance must be positive, got {}",
            tolerance
        )));
    }

    if samples > MAX_ISOCLINE_SAMPLES {
        return Err(ConduitError::InvalidArgument(format!(
            "at most {} isocline samples per call, got {}",
            MAX_ISOCLINE_SAMPLES, samples
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut found = Vec::with_capacity(samples.min(1024));
    let budget = samples.saturating_mul(ISOCLINE_ATTEMPTS_PER_SAMPLE);

    for _ in 0..budget {
        if found.len() == samples {
            break;
        }
        let state = StateVector::clamped(
            rng.gen::<f64>(),
            rng.gen::<f64>(),
            rng.gen::<f64>(),
            rng.gen::<f64>(),
            rng.gen::<f64>(),
        );
        if (state.density() - target).abs() <= tolerance {
            found.push(state);
        }
    }
    Ok(found)
}

/// Farthest-apart pair `(i, j, distance)` among `states`
pub fn max_degeneracy(states: &[StateVector]) -> Option<(usize, usize, f64)> {
    let mut best: Option<(usize, usize, f64)> = None;
    for i in 0..states.len() {
        for j in (i + 1)..states.len() {
            let d = states[i].distance(&states[j]);
            if best.map_or(true, |(_, _, b)| d > b) {
                best = Some((i, j, d));
            }
        }
    }
    best
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_elimination_holds() {
        let report = zero_elimination_report();
        assert_eq!(report.n_tests, 9);
        assert_eq!(report.n_passed, 9);
        assert!(report.holds);
    }

    #[test]
    fn test_gate_cases() {
        let report = coherence_gate_cases();
        assert_eq!(report.cases.len(), 7);
        assert!(report.dmt_resolves);

        // H = 0: gate fully open
        assert_eq!(report.cases[6].terms.entropy_gate, 1.0);
        // H = 1: gate equals κ
        assert_eq!(report.cases[4].terms.density, 0.0);
        assert!((report.cases[5].terms.density - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_sensitivity_signs() {
        let base = StateVector::new(0.8, 0.75, 0.65, 0.5, 0.65).unwrap();
        let partials = sensitivity(&base, 0.05).unwrap();
        assert_eq!(partials.len(), 5);
        for (axis, value) in &partials {
            match axis {
                Axis::Integration | Axis::TemporalDepth | Axis::Binding | Axis::Coherence => {
                    assert!(*value > 0.0, "{axis}: {value}")
                }
                Axis::Entropy => assert!(*value < 0.0, "{value}"),
            }
        }
    }

    #[test]
    fn test_sensitivity_steps_backward_at_top() {
        let base = StateVector::new(1.0, 1.0, 1.0, 0.0, 1.0).unwrap();
        let partials = sensitivity(&base, 0.05).unwrap();
        assert!(partials.iter().all(|(_, v)| v.is_finite()));
        assert!(sensitivity(&base, 0.0).is_err());
    }

    #[test]
    fn test_gradient_sweep_endpoints() {
        let sweep = gradient_sweep(Axis::Integration, 0.5, 0.5, 100).unwrap();
        assert_eq!(sweep.len(), 100);
        assert_eq!(sweep[0], (0.0, 0.0));
        assert_eq!(sweep[99].0, 1.0);
        assert!(sweep.windows(2).all(|w| w[0].1 <= w[1].1));
        assert!(gradient_sweep(Axis::Entropy, 0.5, 0.5, 1).is_err());
    }

    #[test]
    fn test_degeneracies_found_and_capped() {
        let found = find_degeneracies(20);
        assert!(!found.is_empty());
        assert!(found.len() <= MAX_DEGENERACIES);
        for d in &found {
            assert!(d.density_diff < DEGENERACY_DENSITY_EPS);
            assert!(d.topology_diff > DEGENERACY_MIN_TOPOLOGY);
        }
    }

    #[test]
    fn test_isocline_is_reproducible() {
        let a = sample_isocline(0.05, 0.005, 10, 7).unwrap();
        let b = sample_isocline(0.05, 0.005, 10, 7).unwrap();
        assert_eq!(a.len(), 10);
        assert_eq!(a, b);
        assert!(a.iter().all(|s| (s.density() - 0.05).abs() <= 0.005));
    }

    #[test]
    fn test_isocline_spans_distinct_topologies() {
        let states = sample_isocline(0.05, 0.005, 10, 11).unwrap();
        let (i, j, d) = max_degeneracy(&states).unwrap();
        assert!(i < j);
        assert!(d > 0.3, "farthest pair only {d} apart");
    }

    #[test]
    fn test_isocline_rejects_oversized_requests() {
        assert!(matches!(
            sample_isocline(0.05, 0.005, usize::MAX, 1),
            Err(ConduitError::InvalidArgument(_))
        ));
        assert!(matches!(
            sample_isocline(0.05, 0.005, MAX_ISOCLINE_SAMPLES + 1, 1),
            Err(ConduitError::InvalidArgument(_))
        ));
        assert!(sample_isocline(0.05, 0.005, 0, 1).unwrap().is_empty());
    }

    #[test]
    fn test_max_degeneracy_needs_two() {
        assert!(max_degeneracy(&[]).is_none());
        let one = [StateVector::new(0.5, 0.5, 0.5, 0.5, 0.5).unwrap()];
        assert!(max_degeneracy(&one).is_none());
    }
}
