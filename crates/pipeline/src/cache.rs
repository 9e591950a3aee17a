//! Pipeline cache: chains are assembled at most once per aggregate type.
//!
//! `Pipelines` is an explicitly constructed, injectable object rather than
//! a process-wide singleton, so tests build fresh instances and hosts
//! decide the lifetime (typically one instance for the whole process).
//! Assembly runs under the registry mutex: concurrent first-time callers
//! for the same type serialize, and exactly one of them builds the chain.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use eventide_core::{AggregateState, DomainError, DomainResult};

use crate::chain::Chain;
use crate::handler::{EventHandler, InvariantHandler};
use crate::registry::{EventFactory, HandlerSet, InvariantFactory};

/// A populated cache entry: either the assembled chain or the assembly
/// failure, replayed to every later caller until re-registration.
enum Slot {
    Built(Arc<dyn Any + Send + Sync>),
    Failed(DomainError),
}

/// Handler factories waiting for the first resolution of their type.
///
/// Each kind is taken independently; assembling the event chain leaves the
/// invariant factories in place for their own first resolution.
struct Pending<S: AggregateState> {
    events: Option<Vec<(&'static str, EventFactory<S>)>>,
    invariants: Option<Vec<(&'static str, InvariantFactory<S>)>>,
}

#[derive(Default)]
struct Inner {
    pending: HashMap<TypeId, Box<dyn Any + Send>>,
    events: HashMap<TypeId, Slot>,
    invariants: HashMap<TypeId, Slot>,
}

impl Inner {
    fn take_pending_events<S: AggregateState>(
        &mut self,
    ) -> Vec<(&'static str, EventFactory<S>)> {
        self.take_pending::<S, _>(|p| p.events.take())
    }

    fn take_pending_invariants<S: AggregateState>(
        &mut self,
    ) -> Vec<(&'static str, InvariantFactory<S>)> {
        self.take_pending::<S, _>(|p| p.invariants.take())
    }

    fn take_pending<S: AggregateState, T>(
        &mut self,
        take: impl FnOnce(&mut Pending<S>) -> Option<Vec<T>>,
    ) -> Vec<T> {
        let key = TypeId::of::<S>();
        let Some(entry) = self.pending.get_mut(&key) else {
            return Vec::new();
        };
        let pending = entry
            .downcast_mut::<Pending<S>>()
            .expect("pending entry keyed by TypeId");
        let taken = take(pending).unwrap_or_default();
        if pending.events.is_none() && pending.invariants.is_none() {
            self.pending.remove(&key);
        }
        taken
    }
}

/// Process-wide (by convention) cache of assembled handler chains, keyed by
/// aggregate type, one cache per handler kind.
///
/// Resolution is lazy: the first `event_chain::<S>()` /
/// `invariant_chain::<S>()` call assembles that kind's chain from the
/// registered factories and memoizes the result for the life of this
/// instance. Later `register` calls for an already-assembled type fail with
/// `Conflict`; re-registering before first assembly replaces the pending
/// set, which is also the retry path after a construction failure.
#[derive(Default)]
pub struct Pipelines {
    inner: Mutex<Inner>,
}

impl Pipelines {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> DomainResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| DomainError::conflict("pipeline registry lock poisoned"))
    }

    /// Install the handler set for aggregate type `S`.
    pub fn register<S: AggregateState>(&self, set: HandlerSet<S>) -> DomainResult<()> {
        let mut inner = self.lock()?;
        let key = TypeId::of::<S>();

        let already_built = |slots: &HashMap<TypeId, Slot>| {
            matches!(slots.get(&key), Some(Slot::Built(_)))
        };
        if already_built(&inner.events) || already_built(&inner.invariants) {
            return Err(DomainError::conflict(format!(
                "handlers for '{}' are already assembled",
                S::aggregate_type()
            )));
        }

        // A cached construction failure is cleared by re-registration.
        inner.events.remove(&key);
        inner.invariants.remove(&key);

        debug!(
            aggregate = S::aggregate_type(),
            events = set.event_count(),
            invariants = set.invariant_count(),
            "registered handler set"
        );

        let pending = Pending::<S> {
            events: Some(set.events),
            invariants: Some(set.invariants),
        };
        if inner.pending.insert(key, Box::new(pending)).is_some() {
            warn!(
                aggregate = S::aggregate_type(),
                "replaced a pending handler set that was never resolved"
            );
        }
        Ok(())
    }

    /// The event-dispatch chain for `S`, assembling it on first request.
    pub fn event_chain<S: AggregateState>(
        &self,
    ) -> DomainResult<Arc<Chain<EventHandler<S>>>> {
        let mut inner = self.lock()?;
        let key = TypeId::of::<S>();

        if let Some(slot) = inner.events.get(&key) {
            return resolve_slot(slot);
        }

        let factories = inner.take_pending_events::<S>();
        let outcome = assemble(factories);
        finish_assembly::<S, _>(&mut inner.events, key, outcome, "event")
    }

    /// The invariant-check chain for `S`, assembling it on first request.
    pub fn invariant_chain<S: AggregateState>(
        &self,
    ) -> DomainResult<Arc<Chain<InvariantHandler<S>>>> {
        let mut inner = self.lock()?;
        let key = TypeId::of::<S>();

        if let Some(slot) = inner.invariants.get(&key) {
            return resolve_slot(slot);
        }

        let factories = inner.take_pending_invariants::<S>();
        let outcome = assemble(factories);
        finish_assembly::<S, _>(&mut inner.invariants, key, outcome, "invariant")
    }
}

impl core::fmt::Debug for Pipelines {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Pipelines").finish_non_exhaustive()
    }
}

/// Link the constructed handlers in registration order.
///
/// Zero factories is a valid, empty chain. The first factory failure aborts
/// assembly; the chain stays unusable until the host re-registers.
fn assemble<H>(
    factories: Vec<(&'static str, Box<dyn FnOnce() -> Result<H, String> + Send>)>,
) -> DomainResult<Chain<H>> {
    let mut links = Vec::with_capacity(factories.len());
    for (name, factory) in factories {
        let handler =
            factory().map_err(|reason| DomainError::handler_construction(name, reason))?;
        links.push(handler);
    }
    Ok(Chain::new(links))
}

fn resolve_slot<C: Any + Send + Sync>(slot: &Slot) -> DomainResult<Arc<C>> {
    match slot {
        Slot::Built(chain) => Ok(chain
            .clone()
            .downcast::<C>()
            .expect("slot keyed by TypeId")),
        Slot::Failed(err) => Err(err.clone()),
    }
}

fn finish_assembly<S: AggregateState, C: Any + Send + Sync>(
    slots: &mut HashMap<TypeId, Slot>,
    key: TypeId,
    outcome: DomainResult<C>,
    kind: &'static str,
) -> DomainResult<Arc<C>> {
    match outcome {
        Ok(chain) => {
            let chain = Arc::new(chain);
            debug!(
                aggregate = S::aggregate_type(),
                kind, "assembled pipeline"
            );
            slots.insert(key, Slot::Built(chain.clone()));
            Ok(chain)
        }
        Err(err) => {
            warn!(
                aggregate = S::aggregate_type(),
                kind,
                error = %err,
                "pipeline assembly failed"
            );
            slots.insert(key, Slot::Failed(err.clone()));
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use eventide_core::{AggregateId, DomainEvent, EventKind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct Ticket {
        id: Option<AggregateId>,
        holds: u32,
    }

    #[derive(Debug, Clone)]
    enum TicketEvent {
        Issued {
            ticket_id: AggregateId,
            occurred_at: DateTime<Utc>,
        },
        Held {
            ticket_id: AggregateId,
            occurred_at: DateTime<Utc>,
        },
    }

    impl DomainEvent for TicketEvent {
        fn aggregate_id(&self) -> AggregateId {
            match self {
                TicketEvent::Issued { ticket_id, .. } => *ticket_id,
                TicketEvent::Held { ticket_id, .. } => *ticket_id,
            }
        }

        fn kind(&self) -> EventKind {
            match self {
                TicketEvent::Issued { .. } => EventKind::Creational,
                TicketEvent::Held { .. } => EventKind::NonCreational,
            }
        }

        fn event_type(&self) -> &'static str {
            match self {
                TicketEvent::Issued { .. } => "ticket.issued",
                TicketEvent::Held { .. } => "ticket.held",
            }
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            match self {
                TicketEvent::Issued { occurred_at, .. } => *occurred_at,
                TicketEvent::Held { occurred_at, .. } => *occurred_at,
            }
        }
    }

    impl AggregateState for Ticket {
        type Event = TicketEvent;

        fn aggregate_type() -> &'static str {
            "ticket"
        }

        fn id(&self) -> Option<AggregateId> {
            self.id
        }
    }

    fn ticket_handlers() -> HandlerSet<Ticket> {
        HandlerSet::new()
            .event("ticket.issued", |state: &mut Ticket, event| {
                if let TicketEvent::Issued { ticket_id, .. } = event {
                    state.id = Some(*ticket_id);
                    true
                } else {
                    false
                }
            })
            .event("ticket.held", |state: &mut Ticket, event| {
                if let TicketEvent::Held { .. } = event {
                    state.holds += 1;
                    true
                } else {
                    false
                }
            })
            .invariant("ticket.hold_limit", |state: &Ticket| {
                if state.holds > 3 {
                    Err(DomainError::invariant("too many holds"))
                } else {
                    Ok(())
                }
            })
    }

    #[test]
    fn concurrent_first_callers_assemble_exactly_once() {
        static BUILDS: AtomicUsize = AtomicUsize::new(0);

        let pipelines = Arc::new(Pipelines::new());
        let set = HandlerSet::<Ticket>::new().try_event("ticket.counted", || {
            BUILDS.fetch_add(1, Ordering::SeqCst);
            Ok(EventHandler::new("ticket.counted", |_, _| true))
        });
        pipelines.register(set).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pipelines = pipelines.clone();
                std::thread::spawn(move || pipelines.event_chain::<Ticket>().unwrap())
            })
            .collect();
        let chains: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        assert_eq!(BUILDS.load(Ordering::SeqCst), 1);
        for chain in &chains[1..] {
            assert!(Arc::ptr_eq(&chains[0], chain));
        }
    }

    #[test]
    fn unregistered_type_resolves_to_empty_chains() {
        let pipelines = Pipelines::new();

        let events = pipelines.event_chain::<Ticket>().unwrap();
        let invariants = pipelines.invariant_chain::<Ticket>().unwrap();

        assert!(events.is_empty());
        assert!(invariants.is_empty());
        invariants.check(&Ticket::default()).unwrap();
    }

    #[test]
    fn kinds_assemble_independently() {
        let pipelines = Pipelines::new();
        pipelines.register(ticket_handlers()).unwrap();

        let events = pipelines.event_chain::<Ticket>().unwrap();
        assert_eq!(events.len(), 2);

        // The invariant factories were not consumed by the event assembly.
        let invariants = pipelines.invariant_chain::<Ticket>().unwrap();
        assert_eq!(invariants.len(), 1);
    }

    #[test]
    fn resolution_returns_the_same_chain_every_time() {
        let pipelines = Pipelines::new();
        pipelines.register(ticket_handlers()).unwrap();

        let first = pipelines.event_chain::<Ticket>().unwrap();
        let second = pipelines.event_chain::<Ticket>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn construction_failure_is_cached_until_reregistration() {
        static ATTEMPTS: AtomicUsize = AtomicUsize::new(0);

        let pipelines = Pipelines::new();
        let set = HandlerSet::<Ticket>::new().try_event("ticket.broken", || {
            ATTEMPTS.fetch_add(1, Ordering::SeqCst);
            Err("missing capability".to_string())
        });
        pipelines.register(set).unwrap();

        let err = pipelines.event_chain::<Ticket>().unwrap_err();
        assert_eq!(
            err,
            DomainError::handler_construction("ticket.broken", "missing capability")
        );

        // Replayed from the cache, the factory does not run again.
        let err_again = pipelines.event_chain::<Ticket>().unwrap_err();
        assert_eq!(err, err_again);
        assert_eq!(ATTEMPTS.load(Ordering::SeqCst), 1);

        // Corrected registration makes the type usable again.
        pipelines.register(ticket_handlers()).unwrap();
        let chain = pipelines.event_chain::<Ticket>().unwrap();
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn register_after_assembly_conflicts() {
        let pipelines = Pipelines::new();
        pipelines.register(ticket_handlers()).unwrap();
        pipelines.event_chain::<Ticket>().unwrap();

        let err = pipelines.register(ticket_handlers()).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }
}
