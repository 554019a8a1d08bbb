//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
///
/// Every bounded context reports failures through this enum so the HTTP
/// layer can map them onto status codes in one place.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A referenced entity does not exist (or has been deleted).
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity that was looked up (`"place"`, `"booking"`, ...).
        entity: &'static str,
        /// The identifier that was looked up.
        id: Uuid,
    },

    /// Malformed or missing input.
    #[error("invalid {field}: {message}")]
    Validation {
        /// The offending input field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// The caller lacks the rights for the requested action.
    #[error("not authorized: {0}")]
    Authorization(String),

    /// A booking status change the state machine does not permit.
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: String,
        /// Requested status.
        to: String,
    },

    /// Optimistic concurrency conflict.
    #[error("concurrency conflict on aggregate {aggregate_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The aggregate that had the conflict.
        aggregate_id: Uuid,
        /// The expected version.
        expected: i64,
        /// The actual version found.
        actual: i64,
    },

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Shorthand for a validation failure on `field`.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}
