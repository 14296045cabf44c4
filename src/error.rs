//! ═══════════════════════════════════════════════════════════════════════════════
//! ERROR — Unified Error Type for Conduit
//! ═══════════════════════════════════════════════════════════════════════════════
//! Centralized error handling. No scattered .unwrap() or .expect() calls.
//!
//! Domain violations and lookup misses go straight back to the caller.
//! Nothing here is retried or recovered automatically.
//! ═══════════════════════════════════════════════════════════════════════════════

use thiserror::Error;

/// The unified error type for the Conduit crate
#[derive(Debug, Error)]
pub enum ConduitError {
    /// An attribute or measurement fell outside its closed interval
    #[error("{field} must be in range [0.0, 1.0], got {value}")]
    Domain { field: String, value: f64 },

    /// A named entry does not exist
    #[error("{kind} '{name}' not found. Available: {}", .available.join(", "))]
    NotFound {
        kind: &'static str,
        name: String,
        available: Vec<String>,
    },

    /// A calibration-backed call on an encoder built without a provider
    #[error("calibration provider not available (encoder is running standalone)")]
    CalibrationUnavailable,

    /// Structurally invalid call arguments
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error (result files, snapshots)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConduitError {
    pub fn domain(field: impl Into<String>, value: f64) -> Self {
        ConduitError::Domain {
            field: field.into(),
            value,
        }
    }

    pub fn not_found<S: AsRef<str>>(
        kind: &'static str,
        name: impl Into<String>,
        available: impl IntoIterator<Item = S>,
    ) -> Self {
        ConduitError::NotFound {
            kind,
            name: name.into(),
            available: available
                .into_iter()
                .map(|s| s.as_ref().to_string())
                .collect(),
        }
    }

    /// True for errors a caller can fix by choosing different input
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ConduitError::NotFound { .. } | ConduitError::InvalidArgument(_)
        )
    }
}

/// Type alias for Result with ConduitError
pub type ConduitResult<T> = Result<T, ConduitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_display() {
        let err = ConduitError::domain("entropy", 1.5);
        assert_eq!(
            err.to_string(),
            "entropy must be in range [0.0, 1.0], got 1.5"
        );
    }

    #[test]
    fn test_not_found_lists_alternatives() {
        let err = ConduitError::not_found("state", "coma", ["wakefulness", "flow_state"]);
        let msg = err.to_string();
        assert!(msg.contains("'coma'"));
        assert!(msg.contains("wakefulness, flow_state"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: ConduitError = io_err.into();
        assert!(matches!(err, ConduitError::Io(_)));
        assert!(!err.is_recoverable());
    }
}
