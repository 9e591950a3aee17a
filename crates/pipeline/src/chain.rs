//! Handler chains: an assembled, immutable ordered sequence of descriptors.
//!
//! One generic shape, two dispatch policies:
//!
//! - event chains are **first-match-wins**: handlers are mutually exclusive
//!   per event variant, so dispatch stops at the first descriptor that
//!   reports it applied the event;
//! - invariant chains are **all-must-pass**: every descriptor runs
//!   unconditionally, in order, and the first failure aborts the remainder.
//!
//! Chains are plain ordered sequences, not linked nodes; assembly order is
//! the registration order and the only ordering guarantee.

use tracing::trace;

use eventide_core::{AggregateState, DomainError, DomainResult};

use crate::handler::{EventHandler, InvariantHandler};

/// An assembled pipeline of handlers for one aggregate type.
#[derive(Debug)]
pub struct Chain<H> {
    links: Vec<H>,
}

impl<H> Chain<H> {
    pub(crate) fn new(links: Vec<H>) -> Self {
        Self { links }
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// An empty chain is valid: event dispatch then fails with
    /// `UnhandledEvent`, invariant checking trivially passes.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl<S: AggregateState> Chain<EventHandler<S>> {
    /// Walk the chain until one handler applies the event.
    ///
    /// Exactly one handler may mutate `state`, and only on success; if the
    /// chain is exhausted the state is untouched and the dispatch fails.
    pub fn dispatch(&self, state: &mut S, event: &S::Event) -> DomainResult<()> {
        use eventide_core::DomainEvent;

        for handler in &self.links {
            if handler.attempt(state, event) {
                trace!(
                    aggregate = S::aggregate_type(),
                    handler = handler.name(),
                    event = event.event_type(),
                    "event applied"
                );
                return Ok(());
            }
        }

        Err(DomainError::unhandled(
            S::aggregate_type(),
            event.event_type(),
        ))
    }
}

impl<S: AggregateState> Chain<InvariantHandler<S>> {
    /// Run every invariant assertion in chain order.
    ///
    /// AND-composition: each handler enforces one independent rule, so all
    /// of them run on every apply. A failing assertion propagates unmodified
    /// and the remaining handlers are skipped.
    pub fn check(&self, state: &S) -> DomainResult<()> {
        for handler in &self.links {
            handler.assert(state)?;
        }
        Ok(())
    }
}
