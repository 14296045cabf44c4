//! ═══════════════════════════════════════════════════════════════════════════════
//! CONDUIT — Perspectival Density Engine
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! ```text
//! D = φ × τ × ρ × clamp[(1 − √H) + (H × κ)]
//! ```
//!
//! Five bounded invariants, one scalar. Operators move states around the space,
//! trajectories record the motion, the catalog says which known state a point
//! sits nearest to.
//! ═══════════════════════════════════════════════════════════════════════════════

#![allow(clippy::too_many_arguments)] // five-axis constructors
#![allow(clippy::needless_range_loop)] // indexed loops over [f64; 5]

// ═══════════════════════════════════════════════════════════════════════════════
// CORE — state space and the formula
// ═══════════════════════════════════════════════════════════════════════════════

pub mod density;
pub mod error;
pub mod state;

// ═══════════════════════════════════════════════════════════════════════════════
// DYNAMICS — operators and trajectories
// ═══════════════════════════════════════════════════════════════════════════════

pub mod operators;
pub mod trajectory;

// ═══════════════════════════════════════════════════════════════════════════════
// REFERENCE — calibration, encoder, catalog
// ═══════════════════════════════════════════════════════════════════════════════

pub mod calibration;
pub mod catalog;
pub mod encoder;

// ═══════════════════════════════════════════════════════════════════════════════
// RESEARCH — analysis, validation suite, result files, settings
// ═══════════════════════════════════════════════════════════════════════════════

pub mod analysis;
pub mod config;
pub mod experiments;
pub mod export;

pub use calibration::{CalibrationProvider, Confidence, GroundedState, StandardCalibration};
pub use catalog::{Catalog, CatalogEntry, InMemoryIndex, Neighbor, NeighborIndex};
pub use config::ConduitConfig;
pub use density::{density_ratio, DensityDecomposition};
pub use encoder::Encoder;
pub use error::{ConduitError, ConduitResult};
pub use operators::{Operator, Perturbation};
pub use state::{Axis, StateVector};
pub use trajectory::{LagRates, LagSimulation, TrajectoryRecord};
