//! ═══════════════════════════════════════════════════════════════════════════════
//! CONFIG — Run Settings
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Precedence, lowest first: defaults, JSON file, environment, CLI flags.
//! The library never reads config on its own; the binary loads it and passes
//! values down.
//! ═══════════════════════════════════════════════════════════════════════════════

use crate::error::{ConduitError, ConduitResult};
use crate::trajectory::LagRates;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_OUTPUT_DIR: &str = "CONDUIT_OUTPUT_DIR";
pub const ENV_CATALOG: &str = "CONDUIT_CATALOG";
pub const ENV_NEIGHBORS: &str = "CONDUIT_NEIGHBORS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConduitConfig {
    /// Where CLI runs write result files
    pub output_dir: PathBuf,

    /// Catalog snapshot to load instead of seeding from calibration
    pub catalog_path: Option<PathBuf>,

    /// Default k for neighbour queries
    pub neighbors: usize,

    /// Default record count for operator sweeps
    pub trajectory_steps: usize,

    /// Inject the standard calibration provider into the encoder
    pub use_calibration: bool,

    /// Response rates for lag simulations
    pub lag: LagRates,
}

impl Default for ConduitConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("research_output"),
            catalog_path: None,
            neighbors: 3,
            trajectory_steps: 10,
            use_calibration: true,
            lag: LagRates::default(),
        }
    }
}

impl ConduitConfig {
    /// Defaults, then `path` (or the default file if it exists), then environment
    pub fn load(path: Option<&Path>) -> ConduitResult<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default_path = Self::config_path();
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ConduitResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConduitError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&contents)
            .map_err(|e| ConduitError::Config(format!("invalid {}: {}", path.display(), e)))
    }

    /// Overlay environment values; `lookup` stands in for `std::env::var`
    pub fn apply_env<F>(&mut self, lookup: F) -> ConduitResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_OUTPUT_DIR) {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup(ENV_CATALOG) {
            self.catalog_path = Some(PathBuf::from(path));
        }
        if let Some(k) = lookup(ENV_NEIGHBORS) {
            self.neighbors = k.trim().parse().map_err(|_| {
                ConduitError::Config(format!("{} must be a positive integer, got '{}'", ENV_NEIGHBORS, k))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> ConduitResult<()> {
        if self.neighbors == 0 {
            return Err(ConduitError::Config("neighbors must be at least 1".to_string()));
        }
        if self.trajectory_steps == 0 {
            return Err(ConduitError::Config(
                "trajectory_steps must be at least 1".to_string(),
            ));
        }
        self.lag
            .validate()
            .map_err(|e| ConduitError::Config(e.to_string()))
    }

    /// Default config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("conduit")
            .join("config.json")
    }

    /// Save to `path`, creating parent directories
    pub fn save(&self, path: &Path) -> ConduitResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// `output_dir/file_name`
    pub fn output_file(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }
}
