//! ═══════════════════════════════════════════════════════════════════════════════
//! CONDUIT — Command Line Entry Point
//! ═══════════════════════════════════════════════════════════════════════════════
//! Single binary, subcommand dispatch. Every command is a short synchronous run
//! that prints a table and optionally writes its result as JSON.
//! ═══════════════════════════════════════════════════════════════════════════════

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

use conduit::analysis;
use conduit::calibration::{self, StandardCalibration};
use conduit::catalog::Catalog;
use conduit::experiments;
use conduit::export::{self, DensityRecord};
use conduit::operators::{self, Operator, Perturbation};
use conduit::trajectory::{self, TrajectoryRecord};
use conduit::{Axis, ConduitConfig, Encoder, StateVector};

const RULE: &str = "═══════════════════════════════════════════════════════════════════════════════";

#[derive(Parser)]
#[command(name = "conduit")]
#[command(version)]
#[command(about = "Perspectival density engine", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (default: <config dir>/conduit/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Run without the calibration provider
    #[arg(long, global = true)]
    standalone: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where a command's input state comes from
#[derive(Args, Debug, Clone)]
struct StateArgs {
    /// Calibrated state key (see `conduit states`)
    #[arg(long, default_value = "wakefulness")]
    state: String,

    /// Raw vector instead of a calibrated state
    #[arg(long, num_args = 5, value_names = ["PHI", "TAU", "RHO", "H", "KAPPA"])]
    vector: Option<Vec<f64>>,
}

#[derive(Args, Debug, Clone, Default)]
struct OutArgs {
    /// Write the result as JSON to this path
    #[arg(long)]
    out: Option<PathBuf>,

    /// Write the result into the configured output directory
    #[arg(long)]
    save: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute density and its decomposition for a raw vector
    Density {
        integration: f64,
        temporal_depth: f64,
        binding: f64,
        entropy: f64,
        coherence: f64,

        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        out: OutArgs,
    },

    /// List the calibrated reference states
    States {
        /// Include per-axis sources and confidence
        #[arg(long)]
        detail: bool,

        #[command(flatten)]
        out: OutArgs,
    },

    /// Rank calibrated states by density
    Compare {
        /// State keys; all states when omitted
        keys: Vec<String>,

        #[command(flatten)]
        out: OutArgs,
    },

    /// Apply one operator to a state
    Apply {
        /// Operator name, or split_brain / locked_in_syndrome
        operator: String,

        /// Magnitude or progress
        #[arg(default_value = "0.5", allow_hyphen_values = true)]
        amount: f64,

        #[command(flatten)]
        input: StateArgs,

        #[command(flatten)]
        out: OutArgs,
    },

    /// Sweep an operator from progress 0 to 1
    Trajectory {
        operator: String,

        #[command(flatten)]
        input: StateArgs,

        /// Record count (default from config)
        #[arg(short, long)]
        steps: Option<usize>,

        /// Feed each step's output into the next
        #[arg(long)]
        compounding: bool,

        #[command(flatten)]
        out: OutArgs,
    },

    /// Six-hour psilocybin lag simulation
    Psilocybin {
        #[command(flatten)]
        out: OutArgs,
    },

    /// Nearest reference states
    Neighbors {
        #[command(flatten)]
        input: StateArgs,

        /// How many (default from config)
        #[arg(short)]
        k: Option<usize>,

        /// Write the catalog snapshot here after seeding
        #[arg(long)]
        save_catalog: Option<PathBuf>,

        #[command(flatten)]
        out: OutArgs,
    },

    /// Structural checks on the formula
    Analyze {
        #[command(flatten)]
        input: StateArgs,

        /// Grid resolution for the degeneracy search
        #[arg(long, default_value = "20")]
        resolution: usize,

        /// Density level for isocline sampling
        #[arg(long, default_value = "0.05")]
        isocline: f64,

        #[arg(long, default_value = "42")]
        seed: u64,

        #[command(flatten)]
        out: OutArgs,
    },

    /// Run the validation suite over the calibrated states
    Validate {
        #[command(flatten)]
        out: OutArgs,
    },

    /// Show or write the configuration
    Config {
        /// Write the effective config to this path
        #[arg(long)]
        init: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let config = ConduitConfig::load(cli.config.as_deref()).context("loading configuration")?;
    debug!(?config, "configuration loaded");

    let encoder = if cli.standalone || !config.use_calibration {
        info!("running without calibration");
        Encoder::standalone()
    } else {
        Encoder::with_calibration(Arc::new(StandardCalibration))
    };

    let app = App { config, encoder };
    match cli.command {
        Commands::Density {
            integration,
            temporal_depth,
            binding,
            entropy,
            coherence,
            name,
            out,
        } => app.density(
            [integration, temporal_depth, binding, entropy, coherence],
            name,
            &out,
        ),
        Commands::States { detail, out } => app.states(detail, &out),
        Commands::Compare { keys, out } => app.compare(keys, &out),
        Commands::Apply {
            operator,
            amount,
            input,
            out,
        } => app.apply(&operator, amount, &input, &out),
        Commands::Trajectory {
            operator,
            input,
            steps,
            compounding,
            out,
        } => app.trajectory(&operator, &input, steps, compounding, &out),
        Commands::Psilocybin { out } => app.psilocybin(&out),
        Commands::Neighbors {
            input,
            k,
            save_catalog,
            out,
        } => app.neighbors(&input, k, save_catalog.as_deref(), &out),
        Commands::Analyze {
            input,
            resolution,
            isocline,
            seed,
            out,
        } => app.analyze(&input, resolution, isocline, seed, &out),
        Commands::Validate { out } => app.validate(&out),
        Commands::Config { init } => app.show_config(init.as_deref()),
    }
}

struct App {
    config: ConduitConfig,
    encoder: Encoder,
}

fn banner(title: &str) {
    println!("{}", RULE);
    println!("  {}", title);
    println!("{}", RULE);
    println!();
}

impl App {
    fn resolve(&self, input: &StateArgs) -> Result<StateVector> {
        match &input.vector {
            Some(values) => {
                let array: [f64; 5] = values
                    .as_slice()
                    .try_into()
                    .context("--vector takes exactly five values")?;
                Ok(StateVector::from_array(array)?.with_name("input"))
            }
            None => Ok(self.encoder.from_calibration(&input.state)?),
        }
    }

    fn write<T: Serialize + ?Sized>(&self, out: &OutArgs, default_name: &str, value: &T) -> Result<()> {
        let mut targets = Vec::new();
        if let Some(path) = &out.out {
            targets.push(path.clone());
        }
        if out.save {
            targets.push(self.config.output_file(default_name));
        }
        for path in targets {
            export::write_json(&path, value)?;
            info!(path = %path.display(), "result written");
            println!("Wrote {}", path.display());
        }
        Ok(())
    }

    fn density(&self, values: [f64; 5], name: Option<String>, out: &OutArgs) -> Result<()> {
        let mut state = StateVector::from_array(values)?;
        if let Some(name) = name {
            state = state.with_name(name);
        }
        let parts = state.decompose();

        banner("DENSITY");
        println!("{}", state);
        println!();
        println!("Structure φτρ:      {:.6}", parts.structure);
        println!("Entropy penalty:    {:.6}", parts.entropy_penalty);
        println!("Coherence rescue:   {:.6}", parts.coherence_rescue);
        println!("Entropy gate:       {:.6}", parts.entropy_gate);
        println!("Density D:          {:.6}", parts.density);

        self.write(
            out,
            "density.json",
            &json!({ "record": DensityRecord::from(&state), "decomposition": parts }),
        )
    }

    fn states(&self, detail: bool, out: &OutArgs) -> Result<()> {
        let provider = self.encoder.provider()?;
        let states = provider.grounded_states()?;

        banner("CALIBRATED STATES");
        println!(
            "{:<22} {:>5} {:>5} {:>5} {:>5} {:>5} {:>8}  {}",
            "key", "φ", "τ", "ρ", "H", "κ", "D", "confidence"
        );
        for (key, state) in &states {
            println!(
                "{:<22} {:>5.2} {:>5.2} {:>5.2} {:>5.2} {:>5.2} {:>8.4}  {}",
                key,
                state.integration.value,
                state.temporal_depth.value,
                state.binding.value,
                state.entropy.value,
                state.coherence.value,
                state.density(),
                state.overall_confidence()
            );
            if detail {
                for axis in Axis::ALL {
                    let v = state.get(axis);
                    println!(
                        "    {} {:<15} {:.3} [{}] {}",
                        axis.symbol(),
                        axis.as_str(),
                        v.value,
                        v.confidence,
                        v.source
                    );
                }
            }
        }

        self.write(out, "grounded_states.json", &calibration::export_grounded_states(provider)?)
    }

    fn compare(&self, keys: Vec<String>, out: &OutArgs) -> Result<()> {
        let keys = if keys.is_empty() {
            self.encoder
                .calibrated_states()?
                .into_iter()
                .map(|(k, _)| k)
                .collect()
        } else {
            keys
        };
        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let rows = self.encoder.compare(&refs)?;

        banner("DENSITY RANKING");
        let top = rows.first().map(|(_, d)| *d).unwrap_or(0.0);
        for (key, d) in &rows {
            let bar_len = if top > 0.0 { (d / top * 40.0).round() as usize } else { 0 };
            println!("{:<22} {:>8.4}  {}", key, d, "█".repeat(bar_len));
        }

        let records = rows
            .iter()
            .map(|(key, _)| {
                let state = self.encoder.from_calibration(key)?;
                Ok((key.clone(), DensityRecord::from(&state)))
            })
            .collect::<Result<std::collections::BTreeMap<_, _>>>()?;
        self.write(out, "compare.json", &records)
    }

    fn apply(&self, operator: &str, amount: f64, input: &StateArgs, out: &OutArgs) -> Result<()> {
        let before = self.resolve(input)?;
        banner("OPERATOR");
        println!("Before: {}", before);

        let after: Vec<StateVector> = match operator.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "split_brain" => {
                let (left, right) = operators::split_brain(&before);
                vec![left, right]
            }
            "locked_in_syndrome" | "locked_in" => vec![operators::locked_in_syndrome(&before)],
            _ => {
                let op: Operator = operator.parse()?;
                let after = op.apply(&before, amount);
                println!("{}", op.describe(&before, &after));
                vec![after]
            }
        };
        for state in &after {
            println!("After:  {}", state);
        }

        let records: Vec<DensityRecord> = std::iter::once(&before)
            .chain(after.iter())
            .map(DensityRecord::from)
            .collect();
        self.write(out, "apply.json", &records)
    }

    fn trajectory(
        &self,
        operator: &str,
        input: &StateArgs,
        steps: Option<usize>,
        compounding: bool,
        out: &OutArgs,
    ) -> Result<()> {
        let op: Operator = operator.parse()?;
        let initial = self.resolve(input)?;
        let steps = steps.unwrap_or(self.config.trajectory_steps);

        let records = if compounding {
            trajectory::simulate_compounding(&initial, &op, steps)?
        } else {
            trajectory::simulate_trajectory(&initial, &op, steps)?
        };

        banner(&format!("TRAJECTORY: {} ({} steps)", op, steps));
        print_records(&records, "progress");
        self.write(out, &format!("trajectory_{}.json", op.name()), &records)
    }

    fn psilocybin(&self, out: &OutArgs) -> Result<()> {
        let sim = trajectory::psilocybin_trajectory(self.config.lag)?;
        let records = sim.run();

        banner("PSILOCYBIN: 6 h lag simulation");
        let sampled: Vec<TrajectoryRecord> = records
            .iter()
            .filter(|r| (r.elapsed as usize) % 30 == 0)
            .cloned()
            .collect();
        print_records(&sampled, "minutes");

        let analysis = trajectory::analyze_trajectory(&records);
        if let Some(a) = &analysis {
            println!();
            println!("Baseline D:   {:.4}", a.baseline_density);
            println!("Min D:        {:.4} at {:.0} min", a.min_density, a.min_density_time);
            println!("Max D:        {:.4} at {:.0} min", a.max_density, a.max_density_time);
            println!("Final D:      {:.4}", a.final_density);
            println!("Anxiety dip:  {}", if a.anxiety_dip { "yes" } else { "no" });
            println!("Afterglow:    {}", if a.afterglow { "yes" } else { "no" });
        }

        self.write(
            out,
            "psilocybin_trajectory.json",
            &json!({ "records": records, "analysis": analysis }),
        )
    }

    fn catalog(&self) -> Result<Catalog> {
        if let Some(path) = &self.config.catalog_path {
            if path.exists() {
                info!(path = %path.display(), "loading catalog snapshot");
                return Ok(Catalog::load_snapshot(path)?);
            }
        }
        let mut catalog = Catalog::in_memory();
        let seeded = catalog.seed_grounded(self.encoder.provider()?)?;
        info!(seeded, "catalog seeded from calibration");
        Ok(catalog)
    }

    fn neighbors(
        &self,
        input: &StateArgs,
        k: Option<usize>,
        save_catalog: Option<&Path>,
        out: &OutArgs,
    ) -> Result<()> {
        let query = self.resolve(input)?;
        let catalog = self.catalog()?;
        if let Some(path) = save_catalog {
            catalog.save_snapshot(path)?;
            println!("Catalog snapshot: {}", path.display());
        }
        let k = k.unwrap_or(self.config.neighbors);
        if k == 0 {
            bail!("k must be at least 1");
        }

        let hits = catalog.find_neighbors(&query, k);
        banner(&format!("NEAREST {} OF {}", k, catalog.count()));
        println!("Query: {}", query);
        println!();
        for (rank, hit) in hits.iter().enumerate() {
            println!(
                "{:>2}. {:<22} distance {:.4}  D={:.4}",
                rank + 1,
                hit.name,
                hit.distance,
                hit.metadata.density
            );
        }

        self.write(out, "neighbors.json", &json!({ "query": DensityRecord::from(&query), "neighbors": hits }))
    }

    fn analyze(
        &self,
        input: &StateArgs,
        resolution: usize,
        isocline: f64,
        seed: u64,
        out: &OutArgs,
    ) -> Result<()> {
        let zero = analysis::zero_elimination_report();
        let gate = analysis::coherence_gate_cases();

        banner("ZERO ELIMINATION");
        for case in &zero.cases {
            println!("{:<28} D={:.6} {}", case.case, case.density, if case.is_zero { "✓" } else { "✗" });
        }
        println!("Holds: {} ({}/{})", zero.holds, zero.n_passed, zero.n_tests);
        println!();

        banner("COHERENCE GATE (φ=0.6, τ=0.5, ρ=0.5)");
        for case in &gate.cases {
            println!(
                "{:<38} H={:.2} κ={:.2} gate={:.4} D={:.4}",
                case.name, case.entropy, case.coherence, case.terms.entropy_gate, case.terms.density
            );
        }
        println!("Structured chaos beats panic: {}", gate.dmt_resolves);
        println!();

        let base = self.resolve(input)?;
        let partials = analysis::sensitivity(&base, 0.05)?;
        banner("SENSITIVITY");
        println!("Base: {}", base);
        for (axis, value) in &partials {
            println!("  ∂D/∂{:<3} {:+.4}", axis.symbol(), value);
        }
        println!();

        let degeneracies = analysis::find_degeneracies(resolution);
        let samples = analysis::sample_isocline(isocline, 0.005, 20, seed)?;
        let spread = analysis::max_degeneracy(&samples);
        banner("DEGENERACY");
        println!("Grid pairs with |ΔD| < 0.001: {}", degeneracies.len());
        println!("Isocline D≈{:.3}: {} samples", isocline, samples.len());
        if let Some((i, j, d)) = spread {
            println!("  farthest pair {:.3} apart:", d);
            println!("    {}", samples[i]);
            println!("    {}", samples[j]);
        }

        let sensitivity: std::collections::BTreeMap<&str, f64> =
            partials.iter().map(|(a, v)| (a.as_str(), *v)).collect();
        self.write(
            out,
            "analysis.json",
            &json!({
                "zero_elimination": zero,
                "coherence_gate": gate,
                "sensitivity": sensitivity,
                "degeneracies": degeneracies,
                "isocline": {
                    "target": isocline,
                    "samples": samples.iter().map(DensityRecord::from).collect::<Vec<_>>(),
                    "max_distance": spread.map(|(_, _, d)| d),
                },
            }),
        )
    }

    fn validate(&self, out: &OutArgs) -> Result<()> {
        let suite = experiments::validation_suite(&self.encoder)?;
        println!("{}", suite.summary());
        self.write(out, "validation_results.json", &suite.to_json())?;
        if !suite.all_passed() {
            bail!("{} of {} experiments failed", suite.failed(), suite.total());
        }
        Ok(())
    }

    fn show_config(&self, init: Option<&Path>) -> Result<()> {
        banner("CONFIGURATION");
        println!("{}", serde_json::to_string_pretty(&self.config)?);
        println!();
        println!("Default file: {}", ConduitConfig::config_path().display());
        if let Some(path) = init {
            self.config.save(path)?;
            println!("Wrote {}", path.display());
        }
        Ok(())
    }
}

fn print_records(records: &[TrajectoryRecord], time_label: &str) {
    println!(
        "{:>8}  {:>5} {:>5} {:>5} {:>5} {:>5}  {:>8}",
        time_label, "φ", "τ", "ρ", "H", "κ", "D"
    );
    for r in records {
        let time = if time_label == "progress" {
            format!("{:.2}", r.progress)
        } else {
            format!("{:.0}", r.elapsed)
        };
        println!(
            "{:>8}  {:>5.2} {:>5.2} {:>5.2} {:>5.2} {:>5.2}  {:>8.4}",
            time, r.integration, r.temporal_depth, r.binding, r.entropy, r.coherence, r.density
        );
    }
}
