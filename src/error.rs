//! Error types for the context guard.

use crate::context::ContextId;
use crate::handler::Violation;
use thiserror::Error;

/// Errors surfaced by the guard and its ambient layers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    #[error("Cross-context access in `{operation}`: object belongs to {expected}, called from {actual}")]
    CrossContextAccess {
        operation: String,
        expected: ContextId,
        actual: ContextId,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Logging error: {0}")]
    LoggingError(String),
}

impl From<Violation> for GuardError {
    fn from(violation: Violation) -> Self {
        GuardError::CrossContextAccess {
            operation: violation.operation,
            expected: violation.expected,
            actual: violation.actual,
        }
    }
}

impl From<config::ConfigError> for GuardError {
    fn from(err: config::ConfigError) -> Self {
        GuardError::ConfigError(err.to_string())
    }
}
