//! The aggregate kernel: identity, version, and change tracking around a
//! domain state, with all mutation funneled through the handler pipelines.

use eventide_core::{AggregateId, AggregateState, DomainError, DomainEvent, DomainResult};

use crate::cache::Pipelines;

/// An event-sourced aggregate instance.
///
/// Owns the three pieces of kernel state the domain never touches directly:
///
/// - `version`: monotonically increasing, +1 per successfully applied
///   event, never reset;
/// - `changes`: the events applied since the last
///   [`reset_changes`](Self::reset_changes), in order - what a persistence
///   collaborator appends/publishes after a unit of work;
/// - `state`: the domain's own `S`, mutated only by dispatched handlers.
///
/// Single-writer per instance: `apply` takes `&mut self` and the kernel
/// performs no internal locking, so sharing one instance across threads is
/// a caller error. The [`Pipelines`] cache is the shared resource and is
/// safe to use from any number of aggregates concurrently.
#[derive(Debug)]
pub struct Sourced<S: AggregateState> {
    state: S,
    version: u64,
    changes: Vec<S::Event>,
}

impl<S: AggregateState> Sourced<S> {
    /// A fresh instance at version 0 with an empty change log.
    pub fn new(state: S) -> Self {
        Self {
            state,
            version: 0,
            changes: Vec::new(),
        }
    }

    /// Rebuild an aggregate from its stored history.
    ///
    /// Replays every event through [`apply`](Self::apply) (so handlers and
    /// invariants run exactly as they did originally), then clears the
    /// change log: replayed history is not pending work.
    pub fn rehydrate(
        state: S,
        history: impl IntoIterator<Item = S::Event>,
        pipelines: &Pipelines,
    ) -> DomainResult<Self> {
        let mut sourced = Self::new(state);
        for event in history {
            sourced.apply(event, pipelines)?;
        }
        sourced.reset_changes();
        Ok(sourced)
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn id(&self) -> Option<AggregateId> {
        self.state.id()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Events applied since the last [`reset_changes`](Self::reset_changes).
    pub fn changes(&self) -> &[S::Event] {
        &self.changes
    }

    /// Clear the change log without touching the version.
    ///
    /// Called after persisting/publishing a unit of work.
    pub fn reset_changes(&mut self) {
        self.changes.clear();
    }

    /// Overwrite the version counter.
    ///
    /// For the persistence collaborator when loading a snapshotted state
    /// whose events are not replayed; pair with
    /// [`reset_changes`](Self::reset_changes).
    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Apply one domain event: the only legitimate state transition.
    ///
    /// 1. Identity gate: a non-creational event must target this
    ///    aggregate's current id; mismatch fails before any handler runs.
    /// 2. First-match dispatch through the cached event chain for `S`.
    /// 3. Full sweep of the cached invariant chain. A failing invariant
    ///    aborts the call, but the mutation from step 2 is **not** rolled
    ///    back - a failed `apply` leaves the instance for discard or
    ///    diagnostics, not reuse.
    /// 4. On success the event is recorded and the version bumped by 1.
    pub fn apply(&mut self, event: S::Event, pipelines: &Pipelines) -> DomainResult<()> {
        if !event.kind().is_creational() {
            let current = self.state.id();
            if current != Some(event.aggregate_id()) {
                return Err(DomainError::identity_mismatch(
                    S::aggregate_type(),
                    event.aggregate_id(),
                    current,
                ));
            }
        }

        pipelines.event_chain::<S>()?.dispatch(&mut self.state, &event)?;
        pipelines.invariant_chain::<S>()?.check(&self.state)?;

        self.changes.push(event);
        self.version += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::HandlerSet;
    use chrono::{DateTime, Utc};
    use eventide_core::EventKind;

    #[derive(Debug, Default)]
    struct Tally {
        id: Option<AggregateId>,
        total: i64,
        entries: Vec<i64>,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum TallyEvent {
        Opened {
            tally_id: AggregateId,
            occurred_at: DateTime<Utc>,
        },
        Recorded {
            tally_id: AggregateId,
            amount: i64,
            occurred_at: DateTime<Utc>,
        },
        Audited {
            tally_id: AggregateId,
            occurred_at: DateTime<Utc>,
        },
    }

    impl DomainEvent for TallyEvent {
        fn aggregate_id(&self) -> AggregateId {
            match self {
                TallyEvent::Opened { tally_id, .. }
                | TallyEvent::Recorded { tally_id, .. }
                | TallyEvent::Audited { tally_id, .. } => *tally_id,
            }
        }

        fn kind(&self) -> EventKind {
            match self {
                TallyEvent::Opened { .. } => EventKind::Creational,
                _ => EventKind::NonCreational,
            }
        }

        fn event_type(&self) -> &'static str {
            match self {
                TallyEvent::Opened { .. } => "tally.opened",
                TallyEvent::Recorded { .. } => "tally.recorded",
                TallyEvent::Audited { .. } => "tally.audited",
            }
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            match self {
                TallyEvent::Opened { occurred_at, .. }
                | TallyEvent::Recorded { occurred_at, .. }
                | TallyEvent::Audited { occurred_at, .. } => *occurred_at,
            }
        }
    }

    impl AggregateState for Tally {
        type Event = TallyEvent;

        fn aggregate_type() -> &'static str {
            "tally"
        }

        fn id(&self) -> Option<AggregateId> {
            self.id
        }
    }

    /// Deliberately no handler for `Audited`.
    fn tally_handlers() -> HandlerSet<Tally> {
        HandlerSet::new()
            .event("tally.opened", |state: &mut Tally, event| {
                if let TallyEvent::Opened { tally_id, .. } = event {
                    state.id = Some(*tally_id);
                    true
                } else {
                    false
                }
            })
            .event("tally.recorded", |state: &mut Tally, event| {
                if let TallyEvent::Recorded { amount, .. } = event {
                    state.total += amount;
                    state.entries.push(*amount);
                    true
                } else {
                    false
                }
            })
            .invariant("tally.non_negative", |state: &Tally| {
                if state.total < 0 {
                    Err(DomainError::invariant("tally total is negative"))
                } else {
                    Ok(())
                }
            })
    }

    fn setup() -> (Pipelines, AggregateId) {
        let pipelines = Pipelines::new();
        pipelines.register(tally_handlers()).unwrap();
        (pipelines, AggregateId::new())
    }

    fn opened(tally_id: AggregateId) -> TallyEvent {
        TallyEvent::Opened {
            tally_id,
            occurred_at: Utc::now(),
        }
    }

    fn recorded(tally_id: AggregateId, amount: i64) -> TallyEvent {
        TallyEvent::Recorded {
            tally_id,
            amount,
            occurred_at: Utc::now(),
        }
    }

    #[test]
    fn creational_event_establishes_identity_without_matching() {
        let (pipelines, tally_id) = setup();
        let mut tally = Sourced::new(Tally::default());
        assert_eq!(tally.id(), None);

        tally.apply(opened(tally_id), &pipelines).unwrap();

        assert_eq!(tally.id(), Some(tally_id));
        assert_eq!(tally.version(), 1);
        assert_eq!(tally.changes().len(), 1);
    }

    #[test]
    fn non_creational_event_must_match_identity() {
        let (pipelines, tally_id) = setup();
        let mut tally = Sourced::new(Tally::default());
        tally.apply(opened(tally_id), &pipelines).unwrap();

        let stranger = AggregateId::new();
        let err = tally.apply(recorded(stranger, 5), &pipelines).unwrap_err();

        assert!(matches!(err, DomainError::IdentityMismatch { .. }));
        assert_eq!(tally.version(), 1);
        assert_eq!(tally.changes().len(), 1);
        assert_eq!(tally.state().total, 0);
    }

    #[test]
    fn non_creational_event_on_unset_identity_is_a_mismatch() {
        let (pipelines, tally_id) = setup();
        let mut tally = Sourced::new(Tally::default());

        let err = tally.apply(recorded(tally_id, 5), &pipelines).unwrap_err();
        assert!(matches!(err, DomainError::IdentityMismatch { .. }));
        assert_eq!(tally.version(), 0);
    }

    #[test]
    fn version_counts_every_successful_apply() {
        let (pipelines, tally_id) = setup();
        let mut tally = Sourced::new(Tally::default());

        tally.apply(opened(tally_id), &pipelines).unwrap();
        for amount in [3, 4, 5] {
            tally.apply(recorded(tally_id, amount), &pipelines).unwrap();
        }

        assert_eq!(tally.version(), 4);
        assert_eq!(tally.state().total, 12);
        assert_eq!(tally.changes().len(), 4);
    }

    #[test]
    fn unhandled_event_fails_without_version_bump() {
        let (pipelines, tally_id) = setup();
        let mut tally = Sourced::new(Tally::default());
        tally.apply(opened(tally_id), &pipelines).unwrap();

        let audited = TallyEvent::Audited {
            tally_id,
            occurred_at: Utc::now(),
        };
        let err = tally.apply(audited, &pipelines).unwrap_err();

        assert_eq!(err, DomainError::unhandled("tally", "tally.audited"));
        assert_eq!(tally.version(), 1);
    }

    #[test]
    fn invariant_failure_aborts_but_does_not_roll_back() {
        let (pipelines, tally_id) = setup();
        let mut tally = Sourced::new(Tally::default());
        tally.apply(opened(tally_id), &pipelines).unwrap();
        tally.apply(recorded(tally_id, 10), &pipelines).unwrap();

        let err = tally.apply(recorded(tally_id, -25), &pipelines).unwrap_err();

        assert_eq!(err, DomainError::invariant("tally total is negative"));
        // Version and change log are untouched by the failed apply...
        assert_eq!(tally.version(), 2);
        assert_eq!(tally.changes().len(), 2);
        // ...but the handler's mutation stands.
        assert_eq!(tally.state().total, -15);
        assert_eq!(tally.state().entries, vec![10, -25]);
    }

    #[test]
    fn reset_changes_is_independent_of_version() {
        let (pipelines, tally_id) = setup();
        let mut tally = Sourced::new(Tally::default());
        tally.apply(opened(tally_id), &pipelines).unwrap();
        tally.apply(recorded(tally_id, 1), &pipelines).unwrap();

        tally.reset_changes();
        assert!(tally.changes().is_empty());
        assert_eq!(tally.version(), 2);

        tally.apply(recorded(tally_id, 2), &pipelines).unwrap();
        assert_eq!(tally.changes().len(), 1);
        assert_eq!(tally.version(), 3);
    }

    #[test]
    fn rehydrate_replays_history_with_a_clean_change_log() {
        let (pipelines, tally_id) = setup();
        let history = vec![
            opened(tally_id),
            recorded(tally_id, 7),
            recorded(tally_id, 2),
        ];

        let tally = Sourced::rehydrate(Tally::default(), history, &pipelines).unwrap();

        assert_eq!(tally.version(), 3);
        assert_eq!(tally.state().total, 9);
        assert!(tally.changes().is_empty());
        assert_eq!(tally.id(), Some(tally_id));
    }

    #[test]
    fn set_version_supports_snapshot_loads() {
        let (_pipelines, tally_id) = setup();
        let mut tally = Sourced::new(Tally {
            id: Some(tally_id),
            total: 40,
            entries: vec![40],
        });

        tally.set_version(17);
        tally.reset_changes();

        assert_eq!(tally.version(), 17);
        assert!(tally.changes().is_empty());
    }

    #[test]
    fn apply_on_unregistered_type_fails_with_unhandled_event() {
        let pipelines = Pipelines::new();
        let mut tally = Sourced::new(Tally::default());

        let err = tally
            .apply(opened(AggregateId::new()), &pipelines)
            .unwrap_err();
        assert!(matches!(err, DomainError::UnhandledEvent { .. }));
        assert_eq!(tally.version(), 0);
    }
}
