//! Error types for the stackplan planner.
//!
//! This module provides the error hierarchy for every stage of a planning
//! run: descriptor loading and validation, intent ordering, and plan
//! execution against a provisioning backend.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the stackplan planner.
#[derive(Debug, Error)]
pub enum StackPlanError {
    /// Descriptor and settings errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Planning errors.
    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),

    /// Provisioning backend errors.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Descriptor and settings errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The descriptor file was not found.
    #[error("Descriptor file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The descriptor file could not be read or parsed.
    #[error("Failed to parse descriptor: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Descriptor validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Entry that failed validation (e.g. `tables[2].primaryKeyAttribute`).
        field: Option<String>,
    },

    /// A required setting is missing.
    #[error("Missing required setting: {name}")]
    MissingSetting {
        /// Name of the setting or environment variable.
        name: String,
    },

    /// A setting is present but unusable.
    #[error("Invalid setting {name}: {reason}")]
    InvalidSetting {
        /// Name of the setting.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Planning errors.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The intent graph contains a cycle.
    #[error("Circular dependency detected between intents: {}", stuck.join(", "))]
    CycleDetected {
        /// Intents that could not be placed.
        stuck: Vec<String>,
    },

    /// Two intents share an id.
    #[error("Duplicate intent id: {id}")]
    DuplicateIntent {
        /// The repeated id.
        id: String,
    },

    /// An intent depends on an id that is not part of the plan.
    #[error("Intent '{intent}' depends on unknown intent '{dependency}'")]
    UnknownDependency {
        /// The intent declaring the edge.
        intent: String,
        /// The missing dependency.
        dependency: String,
    },
}

/// Provisioning backend errors.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend refused or failed an operation.
    #[error("Backend rejected {operation} for '{resource}': {message}")]
    Rejected {
        /// Backend operation name.
        operation: String,
        /// Intent id the operation was issued for.
        resource: String,
        /// Backend-provided reason.
        message: String,
    },

    /// A dependency's handle was not available when an intent needed it.
    #[error("No handle for '{dependency}' required by '{intent}'")]
    MissingHandle {
        /// Intent being executed.
        intent: String,
        /// Dependency whose handle is missing.
        dependency: String,
    },
}

/// Result type alias for stackplan operations.
pub type Result<T> = std::result::Result<T, StackPlanError>;

impl StackPlanError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error came from descriptor validation.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Config(ConfigError::ValidationError { .. }))
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a validation error without a specific field.
    #[must_use]
    pub fn validation_general(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: None,
        }
    }
}

impl BackendError {
    /// Creates a rejection error.
    #[must_use]
    pub fn rejected(
        operation: impl Into<String>,
        resource: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Rejected {
            operation: operation.into(),
            resource: resource.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_error_lists_stuck_intents() {
        let err = PlanError::CycleDetected {
            stuck: vec![String::from("a"), String::from("b")],
        };
        assert_eq!(
            err.to_string(),
            "Circular dependency detected between intents: a, b"
        );
    }

    #[test]
    fn test_is_validation() {
        let err = StackPlanError::from(ConfigError::validation("bad", "tables[0].name"));
        assert!(err.is_validation());

        let err = StackPlanError::from(ConfigError::FileNotFound {
            path: PathBuf::from("deploy.json"),
        });
        assert!(!err.is_validation());
    }
}
