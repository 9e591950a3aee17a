//! Domain error model.

use thiserror::Error;

use crate::id::AggregateId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, dispatch). Infrastructure concerns belong elsewhere.
///
/// The enum is `Clone` so pipeline assembly failures can be cached once and
/// replayed to every later caller of the same aggregate type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input to an operation).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated after an event was applied.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// A non-creational event targeted a different aggregate instance.
    #[error(
        "identity mismatch for {aggregate_type}: event targets {event_id}, aggregate id is {aggregate_id}"
    )]
    IdentityMismatch {
        aggregate_type: &'static str,
        event_id: AggregateId,
        /// Formatted current id, or "unset" for a not-yet-created aggregate.
        aggregate_id: String,
    },

    /// No handler in the assembled chain applied the event.
    #[error("no handler for event '{event_type}' on aggregate '{aggregate_type}'")]
    UnhandledEvent {
        aggregate_type: &'static str,
        event_type: &'static str,
    },

    /// A registered handler factory failed during pipeline assembly.
    #[error("failed to construct handler '{handler}': {reason}")]
    HandlerConstruction { handler: &'static str, reason: String },

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A conflict occurred (e.g. stale version / double registration).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn identity_mismatch(
        aggregate_type: &'static str,
        event_id: AggregateId,
        current: Option<AggregateId>,
    ) -> Self {
        Self::IdentityMismatch {
            aggregate_type,
            event_id,
            aggregate_id: current
                .map(|id| id.to_string())
                .unwrap_or_else(|| "unset".to_string()),
        }
    }

    pub fn unhandled(aggregate_type: &'static str, event_type: &'static str) -> Self {
        Self::UnhandledEvent {
            aggregate_type,
            event_type,
        }
    }

    pub fn handler_construction(handler: &'static str, reason: impl Into<String>) -> Self {
        Self::HandlerConstruction {
            handler,
            reason: reason.into(),
        }
    }
}
