//! Error types for the formation deployment tool.
//!
//! This module provides the error hierarchy for all operations in the
//! deployment lifecycle: template resolution, control-plane calls, and
//! stack reconciliation.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the formation deployment tool.
#[derive(Debug, Error)]
pub enum FormationError {
    /// Template resolution errors.
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Control-plane API errors.
    #[error("Control plane error: {0}")]
    ControlPlane(#[from] ControlPlaneError),

    /// Deployment errors.
    #[error("Deployment error: {0}")]
    Deploy(#[from] DeployError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Template resolution errors.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The template file was not found.
    #[error("Template file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The template could not be read or serialized.
    #[error("Failed to read template: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
    },

    /// A remote template could not be fetched.
    #[error("Failed to fetch template from {url}: {message}")]
    FetchFailed {
        /// URL of the remote template.
        url: String,
        /// Description of the fetch failure.
        message: String,
    },
}

/// Control-plane API errors, classified by how the engine reacts to them.
#[derive(Debug, Error)]
pub enum ControlPlaneError {
    /// The target stack does not exist.
    ///
    /// Terminal success for a delete operation; informs the
    /// create-vs-update probe otherwise.
    #[error("Stack does not exist: {name}")]
    StackMissing {
        /// Name of the missing stack.
        name: String,
    },

    /// The API rejected the call due to rate limiting. Transient; the
    /// poll loop skips the tick and retries on the next one.
    #[error("Control plane rate limited: {message}")]
    Throttled {
        /// Error message from the API.
        message: String,
    },

    /// An update was issued but the template and parameters match the
    /// deployed stack. Swallowed by the update path, never surfaced.
    #[error("No changes to deploy for stack: {name}")]
    NoChanges {
        /// Name of the unchanged stack.
        name: String,
    },

    /// Any other service or transport failure. Propagated immediately.
    #[error("Control plane request failed: {message}")]
    Service {
        /// Description of the failure.
        message: String,
    },
}

/// Deployment errors.
#[derive(Debug, Error)]
pub enum DeployError {
    /// A stack operation reached a terminal failure state.
    #[error("Stack {action} failed for '{name}': {reason}")]
    OperationFailed {
        /// Name of the stack.
        name: String,
        /// The operation that failed (create, update, delete).
        action: String,
        /// Reason reported by the control plane.
        reason: String,
    },

    /// A requested stack output does not exist.
    #[error("Stack '{name}' has no output named '{key}'")]
    OutputMissing {
        /// Name of the stack.
        name: String,
        /// The missing output key.
        key: String,
    },

    /// A caller-supplied parameter or tag could not be parsed.
    #[error("Invalid KEY=VALUE pair: {value}")]
    InvalidPair {
        /// The malformed input.
        value: String,
    },

    /// The cleanup name pattern is not a valid regular expression.
    #[error("Invalid cleanup pattern '{pattern}': {message}")]
    InvalidPattern {
        /// The rejected pattern.
        pattern: String,
        /// Description of the regex error.
        message: String,
    },
}

/// Result type alias for formation operations.
pub type Result<T> = std::result::Result<T, FormationError>;

impl FormationError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error means the target stack does not exist.
    #[must_use]
    pub const fn is_stack_missing(&self) -> bool {
        matches!(
            self,
            Self::ControlPlane(ControlPlaneError::StackMissing { .. })
        )
    }

    /// Returns true if this error is a transient rate-limit rejection.
    #[must_use]
    pub const fn is_throttled(&self) -> bool {
        matches!(self, Self::ControlPlane(ControlPlaneError::Throttled { .. }))
    }

    /// Returns true if this error means an update had nothing to change.
    #[must_use]
    pub const fn is_no_changes(&self) -> bool {
        matches!(self, Self::ControlPlane(ControlPlaneError::NoChanges { .. }))
    }
}

impl ControlPlaneError {
    /// Creates a missing-stack error for the given stack name.
    #[must_use]
    pub fn stack_missing(name: impl Into<String>) -> Self {
        Self::StackMissing { name: name.into() }
    }

    /// Creates a service error with the given message.
    #[must_use]
    pub fn service(message: impl Into<String>) -> Self {
        Self::Service {
            message: message.into(),
        }
    }
}

impl TemplateError {
    /// Creates a parse error with the given message.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_helpers() {
        let missing: FormationError = ControlPlaneError::stack_missing("demo").into();
        assert!(missing.is_stack_missing());
        assert!(!missing.is_throttled());

        let throttled: FormationError = ControlPlaneError::Throttled {
            message: String::from("Rate exceeded"),
        }
        .into();
        assert!(throttled.is_throttled());
        assert!(!throttled.is_no_changes());

        let no_changes: FormationError = ControlPlaneError::NoChanges {
            name: String::from("demo"),
        }
        .into();
        assert!(no_changes.is_no_changes());
        assert!(!no_changes.is_stack_missing());
    }

    #[test]
    fn test_error_display_carries_context() {
        let err: FormationError = DeployError::OperationFailed {
            name: String::from("demo"),
            action: String::from("update"),
            reason: String::from("resource limit exceeded"),
        }
        .into();
        let text = err.to_string();
        assert!(text.contains("demo"));
        assert!(text.contains("resource limit exceeded"));
    }
}
