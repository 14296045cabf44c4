//! ═══════════════════════════════════════════════════════════════════════════════
//! EXPERIMENTS — Validation Suite Over the Calibrated States
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Each experiment checks one qualitative claim against the grounded states
//! and records PASS/FAIL with the numbers it looked at. A suite collects them,
//! prints a summary and serialises to JSON.
//! ═══════════════════════════════════════════════════════════════════════════════

use crate::density::density_ratio;
use crate::encoder::Encoder;
use crate::error::ConduitResult;
use crate::state::{self, StateVector};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, warn};

/// Framework revision the suite validates
pub const FRAMEWORK_VERSION: &str = "v9.2";
/// ρ threshold separating conscious from unconscious states (Casarotto 2016)
pub const PCI_THRESHOLD: f64 = 0.31;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExperimentStatus {
    Pass,
    Fail,
}

impl ExperimentStatus {
    fn from_check(passed: bool) -> Self {
        if passed {
            ExperimentStatus::Pass
        } else {
            ExperimentStatus::Fail
        }
    }

    fn icon(&self) -> &'static str {
        match self {
            ExperimentStatus::Pass => "✓",
            ExperimentStatus::Fail => "✗",
        }
    }
}

impl fmt::Display for ExperimentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExperimentStatus::Pass => "PASS",
            ExperimentStatus::Fail => "FAIL",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentResult {
    pub name: String,
    pub status: ExperimentStatus,
    pub description: String,
    pub values: BTreeMap<String, Value>,
    pub criterion: String,
    #[serde(default)]
    pub notes: String,
}

impl ExperimentResult {
    fn new(name: &str, passed: bool, description: &str, criterion: &str) -> Self {
        Self {
            name: name.to_string(),
            status: ExperimentStatus::from_check(passed),
            description: description.to_string(),
            values: BTreeMap::new(),
            criterion: criterion.to_string(),
            notes: String::new(),
        }
    }

    fn value(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    fn note(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn passed(&self) -> bool {
        self.status == ExperimentStatus::Pass
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentSuite {
    pub name: String,
    /// RFC 3339
    pub date: String,
    pub framework_version: String,
    pub results: Vec<ExperimentResult>,
}

impl ExperimentSuite {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            date: chrono::Utc::now().to_rfc3339(),
            framework_version: FRAMEWORK_VERSION.to_string(),
            results: Vec::new(),
        }
    }

    pub fn add_result(&mut self, result: ExperimentResult) {
        match result.status {
            ExperimentStatus::Pass => info!(experiment = %result.name, "PASS"),
            ExperimentStatus::Fail => warn!(experiment = %result.name, criterion = %result.criterion, "FAIL"),
        }
        self.results.push(result);
    }

    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.status == ExperimentStatus::Pass).count()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.status == ExperimentStatus::Fail).count()
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    /// Human-readable report
    pub fn summary(&self) -> String {
        let rule = "═".repeat(60);
        let mut lines = vec![
            rule.clone(),
            format!("EXPERIMENT SUITE: {}", self.name),
            format!("Date: {}", self.date),
            format!("Framework: {}", self.framework_version),
            rule.clone(),
            String::new(),
        ];

        for result in &self.results {
            lines.push(format!("{} {}: {}", result.status.icon(), result.name, result.status));
            lines.push(format!("   {}", result.description));
            lines.push(format!("   Criterion: {}", result.criterion));
            for (key, value) in &result.values {
                match value.as_f64() {
                    Some(x) if value.is_f64() => lines.push(format!("   {}: {:.4}", key, x)),
                    _ => lines.push(format!("   {}: {}", key, value)),
                }
            }
            if !result.notes.is_empty() {
                lines.push(format!("   Note: {}", result.notes));
            }
            lines.push(String::new());
        }

        lines.push("─".repeat(60));
        lines.push(format!("SUMMARY: {}/{} tests passed", self.passed(), self.total()));
        if self.failed() > 0 {
            lines.push(format!("         {} tests FAILED", self.failed()));
        }
        lines.push(rule);
        lines.join("\n")
    }

    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "date": self.date,
            "framework_version": self.framework_version,
            "summary": {
                "passed": self.passed(),
                "failed": self.failed(),
                "total": self.total(),
            },
            "results": self.results,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXPERIMENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Dissociative vs sedative anesthesia at equal unresponsiveness
pub fn ketamine_propofol_split(encoder: &Encoder) -> ConduitResult<ExperimentResult> {
    let ket = encoder.from_calibration("ketamine_anesthesia")?;
    let prop = encoder.from_calibration("propofol_anesthesia")?;
    let ratio = density_ratio(ket.density(), prop.density());

    Ok(ExperimentResult::new(
        "Ketamine/Propofol Split",
        ratio > 10.0,
        "Dissociative vs sedative anesthesia at equivalent unresponsiveness",
        "D(ketamine) / D(propofol) > 10×",
    )
    .value("ketamine_D", ket.density())
    .value("propofol_D", prop.density())
    .value("ratio", ratio)
    .value("ketamine_rho", ket.binding())
    .value("propofol_rho", prop.binding()))
}

pub fn wakefulness_baseline(encoder: &Encoder) -> ConduitResult<ExperimentResult> {
    let d = encoder.from_calibration("wakefulness")?.density();
    Ok(ExperimentResult::new(
        "Wakefulness Baseline",
        (0.10..=0.15).contains(&d),
        "Baseline wakefulness density should be moderate",
        "0.10 ≤ D ≤ 0.15",
    )
    .value("D", d))
}

/// Hyper-conscious panic outranks dissociated ketamine
pub fn panic_vs_ketamine(encoder: &Encoder) -> ConduitResult<ExperimentResult> {
    let panic = encoder.from_calibration("panic_attack")?;
    let ket = encoder.from_calibration("ketamine_anesthesia")?;

    Ok(ExperimentResult::new(
        "Panic vs Ketamine Ordering",
        panic.density() > ket.density(),
        "Panic (hyper-conscious) should have higher D than ketamine (dissociated)",
        "D(panic) > D(ketamine)",
    )
    .value("panic_D", panic.density())
    .value("ketamine_D", ket.density())
    .value("panic_rho", panic.binding())
    .value("panic_kappa", panic.coherence())
    .note("High binding but unstructured entropy"))
}

pub fn flow_elevation(encoder: &Encoder) -> ConduitResult<ExperimentResult> {
    let flow = encoder.from_calibration("flow_state")?.density();
    let wake = encoder.from_calibration("wakefulness")?.density();

    Ok(ExperimentResult::new(
        "Flow State Elevation",
        flow > wake,
        "Flow state should exceed baseline wakefulness",
        "D(flow) > D(wakefulness)",
    )
    .value("flow_D", flow)
    .value("wakefulness_D", wake))
}

/// Binding splits conscious from unconscious states at PCI* = 0.31
pub fn pci_threshold(encoder: &Encoder) -> ConduitResult<ExperimentResult> {
    let above = [
        "wakefulness",
        "ketamine_anesthesia",
        "REM_sleep",
        "locked_in_syndrome",
        "flow_state",
    ];
    let below = ["propofol_anesthesia", "xenon_anesthesia", "NREM_sleep_N3"];

    let mut above_ok = 0;
    for key in above {
        if encoder.from_calibration(key)?.binding() >= PCI_THRESHOLD {
            above_ok += 1;
        }
    }
    let mut below_ok = 0;
    for key in below {
        if encoder.from_calibration(key)?.binding() < PCI_THRESHOLD {
            below_ok += 1;
        }
    }

    Ok(ExperimentResult::new(
        "PCI* Threshold Classification",
        above_ok == above.len() && below_ok == below.len(),
        "States should be correctly classified by PCI* = 0.31 threshold",
        "All conscious states ρ ≥ 0.31, all unconscious states ρ < 0.31",
    )
    .value("above_threshold_correct", format!("{}/{}", above_ok, above.len()))
    .value("below_threshold_correct", format!("{}/{}", below_ok, below.len()))
    .value("PCI_threshold", PCI_THRESHOLD))
}

/// High κ rescues a fixed high-entropy structure
pub fn coherence_rescue() -> ConduitResult<ExperimentResult> {
    let (h, low_k, high_k) = (0.75, 0.20, 0.85);
    let low = StateVector::new(0.60, 0.50, 0.50, h, low_k)?.density();
    let high = StateVector::new(0.60, 0.50, 0.50, h, high_k)?.density();
    let factor = density_ratio(high, low);

    Ok(ExperimentResult::new(
        "Coherence Gate Rescue",
        factor > 1.5,
        "High coherence should rescue high-entropy states",
        "D(high κ) / D(low κ) > 1.5 at fixed high H",
    )
    .value("D_low_kappa", low)
    .value("D_high_kappa", high)
    .value("rescue_factor", factor)
    .value("H", h))
}

pub fn zero_floor() -> ConduitResult<ExperimentResult> {
    let cases = [
        StateVector::new(0.0, 0.5, 0.5, 0.5, 0.5)?,
        StateVector::new(0.5, 0.0, 0.5, 0.5, 0.5)?,
        StateVector::new(0.5, 0.5, 0.0, 0.5, 0.5)?,
    ];
    let all_zero = cases.iter().all(|s| s.density() == 0.0);

    Ok(ExperimentResult::new(
        "Zero Floor Constraint",
        all_zero,
        "Zero in any structural dimension (φ, τ, ρ) should give D=0",
        "D=0 when any of φ, τ, ρ = 0",
    )
    .value("all_zero", all_zero))
}

/// Anesthetic densities follow the PCI ordering
pub fn anesthetic_hierarchy(encoder: &Encoder) -> ConduitResult<ExperimentResult> {
    let order = [
        "xenon_anesthesia",
        "propofol_anesthesia",
        "midazolam_anesthesia",
        "ketamine_anesthesia",
    ];
    let densities = order
        .iter()
        .map(|key| Ok((*key, encoder.from_calibration(key)?.density())))
        .collect::<ConduitResult<Vec<_>>>()?;
    let ordered = densities.windows(2).all(|w| w[0].1 < w[1].1);

    let mut result = ExperimentResult::new(
        "Anesthetic Hierarchy",
        ordered,
        "Anesthetic D should follow PCI ordering",
        "D(xenon) < D(propofol) < D(midazolam) < D(ketamine)",
    )
    .note("Based on Sarasso 2015 PCI measurements");
    for (key, d) in densities {
        result = result.value(key, d);
    }
    Ok(result)
}

/// The core validation suite
pub fn validation_suite(encoder: &Encoder) -> ConduitResult<ExperimentSuite> {
    let mut suite = ExperimentSuite::new("Core Validation Suite");
    info!(framework = FRAMEWORK_VERSION, "running validation suite");

    suite.add_result(ketamine_propofol_split(encoder)?);
    suite.add_result(wakefulness_baseline(encoder)?);
    suite.add_result(panic_vs_ketamine(encoder)?);
    suite.add_result(flow_elevation(encoder)?);
    suite.add_result(pci_threshold(encoder)?);
    suite.add_result(coherence_rescue()?);
    suite.add_result(zero_floor()?);
    suite.add_result(anesthetic_hierarchy(encoder)?);

    info!(passed = suite.passed(), total = suite.total(), "validation suite finished");
    Ok(suite)
}

// ═══════════════════════════════════════════════════════════════════════════════
// GRADIENTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct GradientAnalysis {
    pub start: String,
    pub end: String,
    pub steps: usize,
    pub densities: Vec<f64>,
    /// D(start) / D(end): how many times denser the start state is
    pub density_ratio: f64,
}

/// Linear path between two calibrated states
pub fn gradient_between(
    encoder: &Encoder,
    start: &str,
    end: &str,
    steps: usize,
) -> ConduitResult<GradientAnalysis> {
    let a = encoder.from_calibration(start)?;
    let b = encoder.from_calibration(end)?;
    let path = state::path_between(&a, &b, steps)?;
    let densities: Vec<f64> = path.iter().map(StateVector::density).collect();

    Ok(GradientAnalysis {
        start: start.to_string(),
        end: end.to_string(),
        steps,
        density_ratio: density_ratio(a.density(), b.density()),
        densities,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suite_passes_with_standard_calibration() {
        let suite = validation_suite(&Encoder::standard()).unwrap();
        assert_eq!(suite.total(), 8);
        assert!(suite.all_passed(), "{}", suite.summary());
    }

    #[test]
    fn test_suite_needs_calibration() {
        assert!(validation_suite(&Encoder::standalone()).is_err());
    }

    #[test]
    fn test_ratio_value_recorded() {
        let r = ketamine_propofol_split(&Encoder::standard()).unwrap();
        let ratio = r.values["ratio"].as_f64().unwrap();
        assert!(ratio > 10.0 && ratio < 20.0, "ratio {ratio}");
    }

    #[test]
    fn test_summary_and_json() {
        let suite = validation_suite(&Encoder::standard()).unwrap();
        let text = suite.summary();
        assert!(text.contains("SUMMARY: 8/8 tests passed"));
        assert!(!text.contains("FAILED"));

        let doc = suite.to_json();
        assert_eq!(doc["summary"]["total"], 8);
        assert_eq!(doc["results"][0]["status"], "PASS");
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(serde_json::to_value(ExperimentStatus::Pass).unwrap(), "PASS");
        assert_eq!(serde_json::to_value(ExperimentStatus::Fail).unwrap(), "FAIL");
        assert!(serde_json::from_str::<ExperimentStatus>("\"WARNING\"").is_err());
        assert_eq!(ExperimentStatus::from_check(false).to_string(), "FAIL");
    }

    #[test]
    fn test_failed_result_counts() {
        let mut suite = ExperimentSuite::new("t");
        suite.add_result(ExperimentResult::new("a", false, "", ""));
        suite.add_result(ExperimentResult::new("b", true, "", ""));
        assert_eq!(suite.failed(), 1);
        assert!(!suite.all_passed());
        assert!(suite.summary().contains("1 tests FAILED"));
    }

    #[test]
    fn test_gradient_wake_to_propofol() {
        let g = gradient_between(&Encoder::standard(), "wakefulness", "propofol_anesthesia", 5).unwrap();
        assert_eq!(g.densities.len(), 6);
        assert!(g.densities[0] > g.densities[5]);
        let expected = g.densities[0] / g.densities[5];
        assert!((g.density_ratio - expected).abs() < 1e-6 * expected);
        assert!(g.density_ratio > 50.0);
    }
}
