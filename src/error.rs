//! Error types for canline.
//!
//! Every fallible operation returns `Result<T, SimError>`. Three families exist:
//! configuration errors (fatal at setup, reported before any event runs),
//! invariant violations (scheduler defects that stop the run immediately), and
//! I/O or encoding errors from the outer surfaces.
//!
//! Rejections of tomatoes and an event queue that drains while jars are still
//! parked at the sterilization barrier are simulated outcomes, not errors.

use thiserror::Error;

use crate::engine::process::ProcessId;

/// Result type alias for canline operations.
pub type SimResult<T> = Result<T, SimError>;

/// Unified error type for all canline operations.
#[derive(Debug, Error)]
pub enum SimError {
    // ===== Configuration Errors =====
    /// Invalid configuration parameter.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// A store request can never be satisfied.
    #[error("Configuration error: store '{store}' asked for {requested} units but holds only {capacity}")]
    ExceedsCapacity {
        /// Store name.
        store: String,
        /// Units requested.
        requested: u32,
        /// Declared capacity.
        capacity: u32,
    },

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    // ===== Invariant Violations =====
    /// Scheduler or resource invariant broken.
    #[error("Invariant violated: {message}")]
    Invariant {
        /// Description of the violated invariant.
        message: String,
    },

    /// A process handle was used outside of a running process.
    #[error("Invariant violated: no process is running")]
    NoCurrentProcess,

    /// An event or activation targeted a process that no longer exists.
    #[error("Invariant violated: unknown process {0}")]
    UnknownProcess(ProcessId),

    // ===== I/O Errors =====
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding error.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimError {
    /// Create a configuration error with a message.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invariant violation.
    #[must_use]
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant {
            message: message.into(),
        }
    }

    /// Check if this error reports a setup problem rather than a scheduler defect.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::Config { .. }
                | Self::ExceedsCapacity { .. }
                | Self::YamlParse(_)
                | Self::Validation(_)
        )
    }

    /// Check if this error is an invariant violation (a defect, never recoverable).
    #[must_use]
    pub const fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::Invariant { .. } | Self::NoCurrentProcess | Self::UnknownProcess(_)
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_config() {
        let err = SimError::config("batch size must be positive");
        assert!(err.is_config_error());
        assert!(!err.is_invariant_violation());
        let msg = err.to_string();
        assert!(msg.contains("Configuration error"));
        assert!(msg.contains("batch size"));
    }

    #[test]
    fn test_error_exceeds_capacity_display() {
        let err = SimError::ExceedsCapacity {
            store: "labelApplicator".to_string(),
            requested: 3,
            capacity: 2,
        };
        assert!(err.is_config_error());
        let msg = err.to_string();
        assert!(msg.contains("labelApplicator"));
        assert!(msg.contains("3 units"));
        assert!(msg.contains("only 2"));
    }

    #[test]
    fn test_error_invariant() {
        let err = SimError::invariant("release by non-owner");
        assert!(err.is_invariant_violation());
        assert!(!err.is_config_error());
        assert!(err.to_string().contains("release by non-owner"));
    }

    #[test]
    fn test_error_no_current_process() {
        let err = SimError::NoCurrentProcess;
        assert!(err.is_invariant_violation());
        assert!(err.to_string().contains("no process is running"));
    }

    #[test]
    fn test_error_unknown_process() {
        let err = SimError::UnknownProcess(ProcessId::new(7));
        assert!(err.is_invariant_violation());
        assert!(err.to_string().contains("#7"));
    }

    #[test]
    fn test_error_yaml_from() {
        let parse: Result<u32, _> = serde_yaml::from_str("not: [a number");
        let err: SimError = parse.unwrap_err().into();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("YAML"));
    }

    #[test]
    fn test_error_io() {
        let err: SimError = std::io::Error::other("disk gone").into();
        assert!(!err.is_config_error());
        assert!(!err.is_invariant_violation());
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_error_debug() {
        let err = SimError::config("test");
        let debug = format!("{err:?}");
        assert!(debug.contains("Config"));
    }
}
