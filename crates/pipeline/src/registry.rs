//! Explicit handler registration, one set per aggregate type.
//!
//! Discovery is the host's job: at startup it lists the handlers for each
//! aggregate type and hands the set to
//! [`Pipelines::register`](crate::Pipelines::register). There is no
//! runtime scanning and no
//! default-constructible-type requirement - handlers are plain closures, or
//! fallible factories when construction needs capabilities that can be
//! absent.

use eventide_core::AggregateState;

use crate::handler::{EventHandler, InvariantHandler};

/// A factory runs at most once, during assembly of the type's chain.
pub(crate) type EventFactory<S> =
    Box<dyn FnOnce() -> Result<EventHandler<S>, String> + Send>;
pub(crate) type InvariantFactory<S> =
    Box<dyn FnOnce() -> Result<InvariantHandler<S>, String> + Send>;

/// The unordered-in, ordered-out collection of handler constructors for one
/// aggregate type.
///
/// Registration order is chain order; no other ordering guarantee is
/// provided. Callers that rely on which of several overlapping handlers
/// wins must order the set themselves.
pub struct HandlerSet<S: AggregateState> {
    pub(crate) events: Vec<(&'static str, EventFactory<S>)>,
    pub(crate) invariants: Vec<(&'static str, InvariantFactory<S>)>,
}

impl<S: AggregateState> HandlerSet<S> {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            invariants: Vec::new(),
        }
    }

    /// Add an event handler from a plain attempt closure.
    pub fn event<F>(mut self, name: &'static str, attempt: F) -> Self
    where
        F: Fn(&mut S, &S::Event) -> bool + Send + Sync + 'static,
    {
        self.events
            .push((name, Box::new(move || Ok(EventHandler::new(name, attempt)))));
        self
    }

    /// Add an event handler through a fallible constructor.
    ///
    /// A factory failure surfaces at assembly time as
    /// `HandlerConstruction`, naming this handler.
    pub fn try_event<F>(mut self, name: &'static str, factory: F) -> Self
    where
        F: FnOnce() -> Result<EventHandler<S>, String> + Send + 'static,
    {
        self.events.push((name, Box::new(factory)));
        self
    }

    /// Add an invariant handler from a plain assertion closure.
    pub fn invariant<F>(mut self, name: &'static str, assert: F) -> Self
    where
        F: Fn(&S) -> eventide_core::DomainResult<()> + Send + Sync + 'static,
    {
        self.invariants.push((
            name,
            Box::new(move || Ok(InvariantHandler::new(name, assert))),
        ));
        self
    }

    /// Add an invariant handler through a fallible constructor.
    pub fn try_invariant<F>(mut self, name: &'static str, factory: F) -> Self
    where
        F: FnOnce() -> Result<InvariantHandler<S>, String> + Send + 'static,
    {
        self.invariants.push((name, Box::new(factory)));
        self
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn invariant_count(&self) -> usize {
        self.invariants.len()
    }
}

impl<S: AggregateState> Default for HandlerSet<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: AggregateState> core::fmt::Debug for HandlerSet<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HandlerSet")
            .field("aggregate", &S::aggregate_type())
            .field("events", &self.events.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .field(
                "invariants",
                &self.invariants.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .finish()
    }
}
