//! Aggregate state contract for event-sourced domain models.

use crate::error::{DomainError, DomainResult};
use crate::event::DomainEvent;
use crate::id::AggregateId;

/// State owned by one event-sourced aggregate type.
///
/// This is intentionally small so domain modules only describe *what* their
/// state looks like; all mutation flows through the pipeline kernel's
/// `apply`, which dispatches to the handlers registered for the type.
pub trait AggregateState: core::fmt::Debug + Send + 'static {
    /// Closed event set for this aggregate type.
    type Event: DomainEvent;

    /// Stable aggregate type name, used in errors and logs.
    fn aggregate_type() -> &'static str;

    /// Current identity.
    ///
    /// `None` until a creational event has established it.
    fn id(&self) -> Option<AggregateId>;
}

/// Optimistic concurrency expectation for an aggregate.
///
/// The kernel itself performs no storage; this is the check a persistence
/// collaborator runs against the aggregate's version before committing a
/// unit of work.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking (useful for idempotent operations, migrations, etc.).
    Any,
    /// Require the aggregate to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}
