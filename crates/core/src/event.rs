//! Domain event contract.

use chrono::{DateTime, Utc};

use crate::id::AggregateId;

/// Identity-matching policy of a domain event.
///
/// The kernel (never individual handlers) checks this discriminant before
/// dispatch: a `NonCreational` event must target the aggregate's current id,
/// while a `Creational` event is exempt because it is the event that
/// establishes the identity in the first place.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EventKind {
    Creational,
    NonCreational,
}

impl EventKind {
    pub fn is_creational(self) -> bool {
        matches!(self, EventKind::Creational)
    }
}

/// A domain event: an immutable record of something that happened to an
/// aggregate.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **versioned** (schema evolution via `schema_version`)
/// - consumed exactly once by `apply`, then retained read-only in the
///   aggregate's change log
pub trait DomainEvent: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Identifier of the aggregate this event targets (or establishes).
    fn aggregate_id(&self) -> AggregateId;

    /// Identity-matching policy for this event.
    fn kind(&self) -> EventKind;

    /// Stable event name/type identifier (e.g. "catalog.item_added").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn schema_version(&self) -> u32 {
        1
    }

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
