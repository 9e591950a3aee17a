//! Handler descriptors: one unit of logic bound to one aggregate type.

use eventide_core::{AggregateState, DomainResult};

/// Attempts to apply one event to an aggregate's state.
///
/// The attempt function mutates the state **iff** it returns `true`; a
/// `false` return means "not mine" and the chain moves on to the next
/// descriptor. Handlers only pattern-match on the event variants they know
/// how to process - identity and kind checking happen in the kernel before
/// any handler runs.
pub struct EventHandler<S: AggregateState> {
    name: &'static str,
    attempt: Box<dyn Fn(&mut S, &S::Event) -> bool + Send + Sync>,
}

impl<S: AggregateState> EventHandler<S> {
    pub fn new<F>(name: &'static str, attempt: F) -> Self
    where
        F: Fn(&mut S, &S::Event) -> bool + Send + Sync + 'static,
    {
        Self {
            name,
            attempt: Box::new(attempt),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn attempt(&self, state: &mut S, event: &S::Event) -> bool {
        (self.attempt)(state, event)
    }
}

impl<S: AggregateState> core::fmt::Debug for EventHandler<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventHandler").field("name", &self.name).finish()
    }
}

/// Asserts one business-consistency condition against an aggregate's state.
///
/// Invariant handlers never mutate; they either pass or fail the whole
/// `apply` call with a domain error (typically
/// [`DomainError::InvariantViolation`](eventide_core::DomainError)).
pub struct InvariantHandler<S: AggregateState> {
    name: &'static str,
    assert: Box<dyn Fn(&S) -> DomainResult<()> + Send + Sync>,
}

impl<S: AggregateState> InvariantHandler<S> {
    pub fn new<F>(name: &'static str, assert: F) -> Self
    where
        F: Fn(&S) -> DomainResult<()> + Send + Sync + 'static,
    {
        Self {
            name,
            assert: Box::new(assert),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn assert(&self, state: &S) -> DomainResult<()> {
        (self.assert)(state)
    }
}

impl<S: AggregateState> core::fmt::Debug for InvariantHandler<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InvariantHandler")
            .field("name", &self.name)
            .finish()
    }
}
