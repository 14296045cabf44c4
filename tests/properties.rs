//! Property Tests - Does the formula behave everywhere, not just at the reference states?
//!
//! Grids are deterministic (seeded StdRng) so failures reproduce.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use conduit::density;
use conduit::operators::{self, Operator, Perturbation};
use conduit::trajectory::simulate_trajectory;
use conduit::{Axis, Catalog, StateVector};

fn random_state(rng: &mut StdRng) -> StateVector {
    StateVector::new(rng.gen(), rng.gen(), rng.gen(), rng.gen(), rng.gen()).unwrap()
}

fn within_unit(state: &StateVector) -> bool {
    state.to_array().iter().all(|v| (0.0..=1.0).contains(v))
}

/// Any structural zero forces D = 0, whatever H and κ are
#[test]
fn structural_zero_eliminates_density() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..500 {
        let s = random_state(&mut rng);
        for axis in [Axis::Integration, Axis::TemporalDepth, Axis::Binding] {
            let zeroed = s.with(axis, 0.0).unwrap();
            assert_eq!(zeroed.density(), 0.0, "{} = 0 left D > 0 for {}", axis, s);
        }
    }
}

/// Gate stays in [0, 1] and D never exceeds structure
#[test]
fn gate_and_density_bounds() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..2000 {
        let s = random_state(&mut rng);
        let parts = s.decompose();
        assert!((0.0..=1.0).contains(&parts.entropy_gate));
        assert!((0.0..=1.0).contains(&parts.density));
        assert!(parts.density <= parts.structure + 1e-12);
    }
}

/// Raising a structural axis never lowers D
#[test]
fn density_monotone_in_structure() {
    let mut rng = StdRng::seed_from_u64(13);
    for _ in 0..500 {
        let s = random_state(&mut rng);
        for axis in [Axis::Integration, Axis::TemporalDepth, Axis::Binding] {
            let higher = s.with(axis, (s.get(axis) + 0.1).min(1.0)).unwrap();
            assert!(higher.density() >= s.density() - 1e-12);
        }
    }
}

/// Raising coherence never lowers D, at any entropy
#[test]
fn density_monotone_in_coherence() {
    let mut rng = StdRng::seed_from_u64(19);
    for _ in 0..1000 {
        let s = random_state(&mut rng);
        let step: f64 = rng.gen_range(0.0..=1.0);
        let higher = s
            .with(Axis::Coherence, (s.coherence() + step).min(1.0))
            .unwrap();
        assert!(
            higher.density() >= s.density() - 1e-12,
            "κ {} -> {} lowered D for {}",
            s.coherence(),
            higher.coherence(),
            s
        );
    }
}

/// At H = 1 the gate equals κ
#[test]
fn full_entropy_gate_is_coherence() {
    for k in [0.0, 0.25, 0.5, 1.0] {
        assert!((density::entropy_gate(1.0, k) - k).abs() < 1e-12);
    }
}

/// Operators keep every attribute in range for magnitudes in [-2, 2]
#[test]
fn operators_stay_in_range() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..300 {
        let s = random_state(&mut rng);
        let amount: f64 = rng.gen_range(-2.0..=2.0);
        for op in Operator::ALL {
            let out = op.apply(&s, amount);
            assert!(within_unit(&out), "{} at {} escaped: {}", op, amount, out);
        }
        let (left, right) = operators::split_brain(&s);
        assert!(within_unit(&left) && within_unit(&right));
    }
}

/// Single-axis operators leave the other four attributes bit-for-bit equal
#[test]
fn single_axis_operators_touch_one_axis() {
    let targets = [
        (Operator::PerturbBinding, Axis::Binding),
        (Operator::FractureIntegration, Axis::Integration),
        (Operator::StretchTemporalDepth, Axis::TemporalDepth),
        (Operator::InjectEntropy, Axis::Entropy),
        (Operator::ModulateCoherence, Axis::Coherence),
    ];
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..100 {
        let s = random_state(&mut rng);
        let amount: f64 = rng.gen_range(-1.0..=1.0);
        for (op, target) in targets {
            let out = op.apply(&s, amount);
            for axis in Axis::ALL {
                if axis != target {
                    assert_eq!(out.get(axis).to_bits(), s.get(axis).to_bits());
                }
            }
        }
    }
}

/// Operators never mutate their input
#[test]
fn operators_leave_input_alone() {
    let s = StateVector::new(0.8, 0.75, 0.65, 0.5, 0.65).unwrap();
    let copy = s.clone();
    for op in Operator::ALL {
        let _ = op.apply(&s, 0.9);
    }
    let _ = operators::split_brain(&s);
    assert_eq!(s, copy);
}

/// Ten-step sweep starts at progress 0 with the unperturbed state and ends at 1
#[test]
fn trajectory_endpoints() {
    let wake = StateVector::new(0.8, 0.75, 0.65, 0.5, 0.65).unwrap();
    let records = simulate_trajectory(&wake, &Operator::AnesthesiaGradient, 10).unwrap();

    assert_eq!(records.len(), 10);
    assert_eq!(records[0].progress, 0.0);
    assert_eq!(records[9].progress, 1.0);
    assert!((records[0].density - wake.density()).abs() < 1e-12);
    for pair in records.windows(2) {
        assert!(pair[1].progress > pair[0].progress);
        assert!(pair[1].density <= pair[0].density + 1e-12);
    }
}

/// A closure works anywhere an operator does
#[test]
fn closure_as_perturbation() {
    let halve_entropy = |s: &StateVector, t: f64| {
        s.with(Axis::Entropy, s.entropy() * (1.0 - 0.5 * t)).unwrap()
    };
    let s = StateVector::new(0.5, 0.5, 0.5, 0.8, 0.2).unwrap();
    let records = simulate_trajectory(&s, &halve_entropy, 3).unwrap();
    assert!((records[2].entropy - 0.4).abs() < 1e-12);
}

/// Seeding a state then querying with it returns that state at distance zero
#[test]
fn catalog_exact_match() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut catalog = Catalog::in_memory();
    let states: Vec<StateVector> = (0..25).map(|_| random_state(&mut rng)).collect();
    for (i, s) in states.iter().enumerate() {
        catalog.seed(&format!("s{i}"), s, "");
    }
    for (i, s) in states.iter().enumerate() {
        let hit = catalog.nearest(s).unwrap();
        assert_eq!(hit.name, format!("s{i}"));
        assert_eq!(hit.distance, 0.0);
        assert_eq!(hit.metadata.density, s.density());
    }
}

/// Out-of-range JSON never becomes a StateVector
#[test]
fn deserialization_validates() {
    let good = r#"{"integration":0.8,"temporal_depth":0.75,"binding":0.65,"entropy":0.5,"coherence":0.65,"name":"wake"}"#;
    let s: StateVector = serde_json::from_str(good).unwrap();
    assert_eq!(s.name(), Some("wake"));

    for bad in [
        r#"{"integration":1.2,"temporal_depth":0.5,"binding":0.5,"entropy":0.5,"coherence":0.5}"#,
        r#"{"integration":0.5,"temporal_depth":-0.1,"binding":0.5,"entropy":0.5,"coherence":0.5}"#,
        r#"{"integration":0.5,"temporal_depth":0.5,"binding":0.5,"entropy":0.5}"#,
    ] {
        assert!(serde_json::from_str::<StateVector>(bad).is_err(), "{bad}");
    }
}

/// Single-axis operators at magnitude 0 return the input unchanged
#[test]
fn zero_magnitude_is_identity() {
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..100 {
        let s = random_state(&mut rng);
        for op in Operator::ALL.into_iter().filter(Operator::is_single_axis) {
            assert_eq!(op.apply(&s, 0.0).to_array(), s.to_array(), "{}", op);
        }
    }
}

/// Both hemispheres keep 0.6 of integration and nothing else moves
#[test]
fn split_brain_hemispheres() {
    let mut rng = StdRng::seed_from_u64(17);
    for _ in 0..100 {
        let s = random_state(&mut rng);
        let (left, right) = operators::split_brain(&s);
        for half in [&left, &right] {
            assert_eq!(half.integration(), s.integration() * 0.6);
            assert_eq!(&half.to_array()[1..], &s.to_array()[1..]);
        }
    }
}

/// High coherence out-produces low coherence at equal high entropy
#[test]
fn coherence_rescues_high_entropy() {
    let low = StateVector::new(0.6, 0.5, 0.5, 0.8, 0.20).unwrap();
    let high = StateVector::new(0.6, 0.5, 0.5, 0.8, 0.85).unwrap();
    assert!(high.density() > low.density());
}

/// Worked example from waking reference coordinates
#[test]
fn end_to_end_density() {
    let s = StateVector::new(0.80, 0.75, 0.65, 0.50, 0.65).unwrap();
    assert!((s.density() - 0.2410).abs() < 1e-4);
}
