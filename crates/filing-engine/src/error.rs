//! Error types for engine operations
//!
//! This module defines the errors raised by the stores of the access core.
//! Resolution itself never fails: a missing member, override or rule maps to
//! a well-formed "no access" answer instead of an error.

use thiserror::Error;
use uuid::Uuid;

use crate::config::ConfigError;
use filing_events::EventBusError;

/// Engine error types.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Referenced entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity that was looked up
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Operation blocked by existing data (e.g. a referenced business role)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Operation would break a structural invariant (e.g. a tree cycle)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Invalid engine configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Event bus failure
    #[error("Event bus error: {0}")]
    Events(#[from] EventBusError),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Shorthand for a `NotFound` on a uuid-keyed entity.
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        EngineError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Check if this is a `NotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound { .. })
    }

    /// Check if this error should be logged at error level.
    ///
    /// Not-found, conflict and invalid-operation errors are caller mistakes
    /// and are expected.
    pub fn is_server_error(&self) -> bool {
        matches!(self, EngineError::Config(_) | EngineError::Events(_))
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            EngineError::NotFound { .. } => 404,
            EngineError::Conflict(_) => 409,
            EngineError::InvalidOperation(_) => 422,
            EngineError::Config(_) | EngineError::Events(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            EngineError::NotFound { .. } => "NOT_FOUND",
            EngineError::Conflict(_) => "CONFLICT",
            EngineError::InvalidOperation(_) => "INVALID_OPERATION",
            EngineError::Config(_) => "CONFIG_ERROR",
            EngineError::Events(_) => "EVENT_BUS_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let id = Uuid::now_v7();
        let err = EngineError::not_found("org unit", id);
        assert_eq!(err.to_string(), format!("org unit not found: {}", id));
        assert!(err.is_not_found());
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert!(!err.is_server_error());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(EngineError::Conflict("x".into()).status_code(), 409);
        assert_eq!(EngineError::InvalidOperation("x".into()).status_code(), 422);
        assert!(EngineError::Events(EventBusError::ChannelClosed).is_server_error());
    }
}
