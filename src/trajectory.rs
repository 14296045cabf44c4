//! ═══════════════════════════════════════════════════════════════════════════════
//! TRAJECTORY — Time-Stepped Evolution of a State
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Two simulators, both producing exactly N records:
//!
//! 1. Operator sweep: apply a perturbation at progress `step / (N − 1)`.
//! 2. Lag dynamics: every attribute chases a time-varying target,
//!
//!    ```text
//!    value ← value + rate × (target(t) − value),   rate ∈ (0, 1]
//!    ```
//!
//!    with a separate rate per attribute, so slow axes (coherence) trail fast
//!    ones (entropy) under the same driver.
//!
//! Each call owns its state. Nothing is shared between runs.
//! ═══════════════════════════════════════════════════════════════════════════════

use crate::error::{ConduitError, ConduitResult};
use crate::operators::Perturbation;
use crate::state::{Axis, StateVector};
use serde::{Deserialize, Serialize};

/// One step of a trajectory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRecord {
    pub step: usize,
    /// Fraction of the run completed, 0 at the first record and 1 at the last
    pub progress: f64,
    /// Elapsed time in the simulator's unit (steps for sweeps, minutes for lag runs)
    pub elapsed: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub integration: f64,
    pub temporal_depth: f64,
    pub binding: f64,
    pub entropy: f64,
    pub coherence: f64,
    pub density: f64,
}

impl TrajectoryRecord {
    fn capture(step: usize, progress: f64, elapsed: f64, state: &StateVector) -> Self {
        Self {
            step,
            progress,
            elapsed,
            name: state.name().map(str::to_string),
            integration: state.integration(),
            temporal_depth: state.temporal_depth(),
            binding: state.binding(),
            entropy: state.entropy(),
            coherence: state.coherence(),
            density: state.density(),
        }
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

    /// Rebuild the state this record was captured from
    pub fn to_state(&self) -> ConduitResult<StateVector> {
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

fn progress_at(step: usize, steps: usize) -> f64 {
    if steps > 1 {
        step as f64 / (steps - 1) as f64
    } else {
        0.0
    }
}

fn require_steps(steps: usize) -> ConduitResult<()> {
    if steps == 0 {
        return Err(ConduitError::InvalidArgument(
            "trajectory needs at least one step".to_string(),
        ));
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPERATOR SWEEPS
// ═══════════════════════════════════════════════════════════════════════════════

/// Apply `op` to the initial state at progress 0, 1/(N−1), …, 1.
pub fn simulate_trajectory<P: Perturbation + ?Sized>(
    initial: &StateVector,
    op: &P,
    steps: usize,
) -> ConduitResult<Vec<TrajectoryRecord>> {
    require_steps(steps)?;
    Ok((0..steps)
        .map(|step| {
            let progress = progress_at(step, steps);
            let state = op.apply(initial, progress);
            TrajectoryRecord::capture(step, progress, step as f64, &state)
        })
        .collect())
}

/// Like `simulate_trajectory`, but each step perturbs the previous output
/// instead of the initial state, so effects accumulate.
pub fn simulate_compounding<P: Perturbation + ?Sized>(
    initial: &StateVector,
    op: &P,
    steps: usize,
) -> ConduitResult<Vec<TrajectoryRecord>> {
    require_steps(steps)?;
    let mut current = initial.clone();
    let mut records = Vec::with_capacity(steps);
    for step in 0..steps {
        let progress = progress_at(step, steps);
        current = op.apply(&current, progress);
        records.push(TrajectoryRecord::capture(step, progress, step as f64, &current));
    }
    Ok(records)
}

// ═══════════════════════════════════════════════════════════════════════════════
// LAG DYNAMICS
// ═══════════════════════════════════════════════════════════════════════════════

/// Move `current` toward `target` by `rate` of the remaining gap
#[inline]
pub fn lag_toward(current: f64, target: f64, rate: f64) -> f64 {
    current + rate * (target - current)
}

/// Per-attribute response rates, each in (0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LagRates {
    pub integration: f64,
    pub temporal_depth: f64,
    pub binding: f64,
    pub entropy: f64,
    pub coherence: f64,
}

impl LagRates {
    pub fn uniform(rate: f64) -> Self {
        Self {
            integration: rate,
            temporal_depth: rate,
            binding: rate,
            entropy: rate,
            coherence: rate,
        }
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

    pub fn validate(&self) -> ConduitResult<()> {
        for axis in Axis::ALL {
            let rate = self.get(axis);
            if !(rate > 0.0 && rate <= 1.0) {
                return Err(ConduitError::InvalidArgument(format!(
                    "lag rate for {} must be in (0, 1], got {}",
                    axis, rate
                )));
            }
        }
        Ok(())
    }
}

impl Default for LagRates {
    /// Psilocybin-calibrated rates: entropy fast, coherence very slow
    fn default() -> Self {
        Self {
            integration: 0.12,
            temporal_depth: 0.25,
            binding: 0.20,
            entropy: 0.40,
            coherence: 0.08,
        }
    }
}

/// Target value of one attribute as a function of elapsed time
pub type TargetFn = Box<dyn Fn(f64) -> f64 + Send + Sync>;

/// A time-stepped lag simulation
pub struct LagSimulation {
    initial: StateVector,
    steps: usize,
    timestep: f64,
    rates: LagRates,
    targets: [TargetFn; 5],
}

impl LagSimulation {
    /// Every target starts out constant at the initial value
    pub fn new(initial: StateVector, steps: usize, timestep: f64, rates: LagRates) -> ConduitResult<Self> {
        require_steps(steps)?;
        if !(timestep > 0.0 && timestep.is_finite()) {
            return Err(ConduitError::InvalidArgument(format!(
                "timestep must be positive, got {}",
                timestep
            )));
        }
        rates.validate()?;

        let v = initial.to_array();
        let targets: [TargetFn; 5] = [
            Box::new(move |_| v[0]),
            Box::new(move |_| v[1]),
            Box::new(move |_| v[2]),
            Box::new(move |_| v[3]),
            Box::new(move |_| v[4]),
        ];

        Ok(Self {
            initial,
            steps,
            timestep,
            rates,
            targets,
        })
    }

    /// Replace the target function for one attribute
    pub fn target<F>(mut self, axis: Axis, f: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        self.targets[axis.index()] = Box::new(f);
        self
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn timestep(&self) -> f64 {
        self.timestep
    }

    /// Run from the initial state. Repeated calls give identical, independent runs.
    pub fn run(&self) -> Vec<TrajectoryRecord> {
        let mut current = self.initial.to_array();
        let total = (self.steps.saturating_sub(1)) as f64 * self.timestep;
        let mut records = Vec::with_capacity(self.steps);

        for step in 0..self.steps {
            let t = step as f64 * self.timestep;
            for axis in Axis::ALL {
                let i = axis.index();
                let target = (self.targets[i])(t);
                current[i] = lag_toward(current[i], target, self.rates.get(axis));
            }

            let [phi, tau, rho, h, kappa] = current;
            let state = StateVector::clamped(phi, tau, rho, h, kappa);
            current = state.to_array();

            let progress = if total > 0.0 { t / total } else { 0.0 };
            records.push(TrajectoryRecord::capture(step, progress, t, &state));
        }

        records
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PSILOCYBIN PRESET
// ═══════════════════════════════════════════════════════════════════════════════

/// Waking baseline the drug trajectory starts from
pub const PSILOCYBIN_BASELINE: [f64; 5] = [0.80, 0.75, 0.65, 0.50, 0.65];

/// Targets at full effect
pub const PSILOCYBIN_PEAK: [f64; 5] = [0.85, 0.80, 0.55, 0.70, 0.90];

/// Dose-effect level in [0, 1] at `t` minutes after ingestion
pub fn psilocybin_effect(t_min: f64) -> f64 {
    if t_min < 20.0 {
        0.0
    } else if t_min < 60.0 {
        (t_min - 20.0) / 40.0
    } else if t_min < 120.0 {
        1.0
    } else {
        (1.0 - (t_min - 120.0) / 180.0).max(0.0)
    }
}

fn toward_peak(axis: Axis, effect: f64) -> f64 {
    let i = axis.index();
    PSILOCYBIN_BASELINE[i] + effect * (PSILOCYBIN_PEAK[i] - PSILOCYBIN_BASELINE[i])
}

/// Six hours at five-minute steps (73 records).
///
/// Integration crashes during onset (20–50 min), partially recovers (50–90)
/// and then hyper-integrates; binding dips through onset and mid-trip.
pub fn psilocybin_trajectory(rates: LagRates) -> ConduitResult<LagSimulation> {
    let [phi0, tau0, rho0, h0, k0] = PSILOCYBIN_BASELINE;
    let initial = StateVector::new(phi0, tau0, rho0, h0, k0)?.with_name("Psilocybin");
    let timestep = 5.0;
    let steps = (6.0 * 60.0 / timestep) as usize + 1;

    Ok(LagSimulation::new(initial, steps, timestep, rates)?
        .target(Axis::Entropy, |t| toward_peak(Axis::Entropy, psilocybin_effect(t)))
        .target(Axis::Coherence, |t| {
            toward_peak(Axis::Coherence, psilocybin_effect(t))
        })
        .target(Axis::TemporalDepth, |t| {
            toward_peak(Axis::TemporalDepth, psilocybin_effect(t))
        })
        .target(Axis::Integration, move |t| {
            let effect = psilocybin_effect(t);
            if t > 20.0 && t < 50.0 {
                phi0 - 0.30 * (effect * 2.0).min(1.0)
            } else if (50.0..90.0).contains(&t) {
                phi0 - 0.15 * effect
            } else {
                toward_peak(Axis::Integration, effect)
            }
        })
        .target(Axis::Binding, move |t| {
            let effect = psilocybin_effect(t);
            if t > 20.0 && t < 60.0 {
                rho0 - 0.15 * (effect * 2.0).min(1.0)
            } else if (60.0..180.0).contains(&t) {
                rho0 - 0.10 * effect
            } else {
                rho0
            }
        }))
}

// ═══════════════════════════════════════════════════════════════════════════════
// ANALYSIS
// ═══════════════════════════════════════════════════════════════════════════════

/// Phenomenological summary of a drug trajectory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryAnalysis {
    pub baseline_density: f64,
    pub min_density: f64,
    pub min_density_time: f64,
    pub max_density: f64,
    pub max_density_time: f64,
    pub final_density: f64,
    pub onset_min_density: Option<f64>,
    /// Onset minimum more than 10% below baseline
    pub anxiety_dip: bool,
    pub afterglow_density: Option<f64>,
    /// Post-trip mean more than 2% above baseline
    pub afterglow: bool,
}

/// Onset window, minutes
pub const ONSET_WINDOW: (f64, f64) = (20.0, 60.0);
/// Afterglow starts here, minutes
pub const AFTERGLOW_FROM: f64 = 300.0;

pub fn analyze_trajectory(records: &[TrajectoryRecord]) -> Option<TrajectoryAnalysis> {
    let first = records.first()?;
    let last = records.last()?;
    let baseline = first.density;

    // First occurrence wins on ties
    let mut min = first;
    let mut max = first;
    for r in records {
        if r.density < min.density {
            min = r;
        }
        if r.density > max.density {
            max = r;
        }
    }

    let onset_min_density = records
        .iter()
        .filter(|r| r.elapsed >= ONSET_WINDOW.0 && r.elapsed <= ONSET_WINDOW.1)
        .map(|r| r.density)
        .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |m| m.min(d))));

    let tail: Vec<f64> = records
        .iter()
        .filter(|r| r.elapsed >= AFTERGLOW_FROM)
        .map(|r| r.density)
        .collect();
    let afterglow_density = if tail.is_empty() {
        None
    } else {
        Some(tail.iter().sum::<f64>() / tail.len() as f64)
    };

    Some(TrajectoryAnalysis {
        baseline_density: baseline,
        min_density: min.density,
        min_density_time: min.elapsed,
        max_density: max.density,
        max_density_time: max.elapsed,
        final_density: last.density,
        onset_min_density,
        anxiety_dip: onset_min_density.is_some_and(|d| d < baseline * 0.9),
        afterglow_density,
        afterglow: afterglow_density.is_some_and(|d| d > baseline * 1.02),
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::{self, Operator};

    fn wake() -> StateVector {
        StateVector::new(0.80, 0.50, 0.555, 0.50, 0.50).unwrap()
    }

    #[test]
    fn test_sweep_length_and_progress() {
        let records = simulate_trajectory(&wake(), &Operator::AnesthesiaGradient, 10).unwrap();
        assert_eq!(records.len(), 10);
        assert_eq!(records[0].progress, 0.0);
        assert_eq!(records[9].progress, 1.0);
        assert!((records[0].density - wake().density()).abs() < 1e-12);
        assert_eq!(records[9].density, 0.0);
    }

    #[test]
    fn test_sweep_single_step() {
        let records = simulate_trajectory(&wake(), &Operator::FlowStateInduction, 1).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].progress, 0.0);
    }

    #[test]
    fn test_zero_steps_rejected() {
        assert!(simulate_trajectory(&wake(), &Operator::PanicInduction, 0).is_err());
        assert!(simulate_compounding(&wake(), &Operator::PanicInduction, 0).is_err());
    }

    #[test]
    fn test_sweep_accepts_plain_function() {
        let records = simulate_trajectory(&wake(), &operators::inject_entropy, 5).unwrap();
        assert!((records[4].entropy - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_compounding_goes_further_than_sweep() {
        let sweep = simulate_trajectory(&wake(), &Operator::DementiaProgression, 5).unwrap();
        let compound = simulate_compounding(&wake(), &Operator::DementiaProgression, 5).unwrap();
        assert!(compound[3].temporal_depth < sweep[3].temporal_depth);
    }

    #[test]
    fn test_lag_toward_moves_by_fraction() {
        assert!((lag_toward(0.5, 1.0, 0.4) - 0.7).abs() < 1e-12);
        assert_eq!(lag_toward(0.5, 1.0, 1.0), 1.0);
    }

    #[test]
    fn test_lag_rates_validation() {
        assert!(LagRates::default().validate().is_ok());
        assert!(LagRates::uniform(0.0).validate().is_err());
        assert!(LagRates::uniform(1.5).validate().is_err());
        assert!(LagRates::uniform(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_lag_slow_axis_trails_fast_axis() {
        let start = StateVector::new(0.5, 0.5, 0.5, 0.2, 0.2).unwrap();
        let rates = LagRates {
            entropy: 0.5,
            coherence: 0.1,
            ..LagRates::uniform(0.2)
        };
        let sim = LagSimulation::new(start, 6, 1.0, rates)
            .unwrap()
            .target(Axis::Entropy, |_| 0.9)
            .target(Axis::Coherence, |_| 0.9);
        let records = sim.run();

        assert_eq!(records.len(), 6);
        let last = records.last().unwrap();
        assert!(last.entropy > last.coherence);
        assert!((last.integration - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_lag_runs_are_independent() {
        let sim = psilocybin_trajectory(LagRates::default()).unwrap();
        assert_eq!(sim.run(), sim.run());
    }

    #[test]
    fn test_lag_clamps_wild_targets() {
        let sim = LagSimulation::new(wake(), 3, 1.0, LagRates::uniform(1.0))
            .unwrap()
            .target(Axis::Binding, |_| 4.0)
            .target(Axis::Entropy, |_| -3.0);
        for r in sim.run() {
            assert_eq!(r.binding, 1.0);
            assert_eq!(r.entropy, 0.0);
        }
    }

    #[test]
    fn test_psilocybin_effect_curve() {
        assert_eq!(psilocybin_effect(0.0), 0.0);
        assert_eq!(psilocybin_effect(40.0), 0.5);
        assert_eq!(psilocybin_effect(90.0), 1.0);
        assert!((psilocybin_effect(210.0) - 0.5).abs() < 1e-12);
        assert_eq!(psilocybin_effect(330.0), 0.0);
    }

    #[test]
    fn test_psilocybin_arc() {
        let records = psilocybin_trajectory(LagRates::default()).unwrap().run();
        assert_eq!(records.len(), 73);
        assert_eq!(records[72].elapsed, 360.0);

        let analysis = analyze_trajectory(&records).unwrap();
        assert!((analysis.baseline_density - 0.2410).abs() < 1e-4);
        assert!(analysis.anxiety_dip);
        assert!(analysis.afterglow);
        assert_eq!(analysis.min_density_time, 55.0);
        assert_eq!(analysis.max_density_time, 205.0);
    }

    #[test]
    fn test_analyze_empty() {
        assert!(analyze_trajectory(&[]).is_none());
    }

    #[test]
    fn test_record_back_to_state() {
        let records = simulate_trajectory(&wake(), &Operator::PanicInduction, 3).unwrap();
        let state = records[2].to_state().unwrap();
        assert_eq!(state.name(), Some("Panic(severity=1.00)"));
        assert_eq!(state.density(), records[2].density);
    }
}
