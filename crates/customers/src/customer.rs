use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use eventide_core::{
    AggregateId, AggregateState, DomainError, DomainEvent, DomainResult, EventKind, ValueObject,
};
use eventide_pipeline::{HandlerSet, Pipelines, Sourced};

/// Customer identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub AggregateId);

impl CustomerId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Contact information for a customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactCard {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
}

impl ValueObject for ContactCard {}

/// Mutable state of one customer aggregate.
#[derive(Debug, Default)]
pub struct CustomerState {
    id: Option<CustomerId>,
    name: String,
    contact: ContactCard,
}

impl CustomerState {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contact(&self) -> &ContactCard {
        &self.contact
    }
}

impl AggregateState for CustomerState {
    type Event = CustomerEvent;

    fn aggregate_type() -> &'static str {
        "customer"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id.map(|id| id.0)
    }
}

/// Event: CustomerRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRegistered {
    pub customer_id: CustomerId,
    pub name: String,
    pub contact: ContactCard,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CustomerRenamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRenamed {
    pub customer_id: CustomerId,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CustomerRelocated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRelocated {
    pub customer_id: CustomerId,
    pub city: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerEvent {
    Registered(CustomerRegistered),
    Renamed(CustomerRenamed),
    Relocated(CustomerRelocated),
}

impl DomainEvent for CustomerEvent {
    fn aggregate_id(&self) -> AggregateId {
        match self {
            CustomerEvent::Registered(e) => e.customer_id.0,
            CustomerEvent::Renamed(e) => e.customer_id.0,
            CustomerEvent::Relocated(e) => e.customer_id.0,
        }
    }

    fn kind(&self) -> EventKind {
        match self {
            CustomerEvent::Registered(_) => EventKind::Creational,
            CustomerEvent::Renamed(_) | CustomerEvent::Relocated(_) => EventKind::NonCreational,
        }
    }

    fn event_type(&self) -> &'static str {
        match self {
            CustomerEvent::Registered(_) => "customer.registered",
            CustomerEvent::Renamed(_) => "customer.renamed",
            CustomerEvent::Relocated(_) => "customer.relocated",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CustomerEvent::Registered(e) => e.occurred_at,
            CustomerEvent::Renamed(e) => e.occurred_at,
            CustomerEvent::Relocated(e) => e.occurred_at,
        }
    }
}

/// Aggregate root: Customer.
#[derive(Debug)]
pub struct Customer {
    sourced: Sourced<CustomerState>,
}

impl Customer {
    /// Handler set for this aggregate type; registered once at startup.
    pub fn handlers() -> HandlerSet<CustomerState> {
        HandlerSet::new()
            .event("customer.registered", |state: &mut CustomerState, event| {
                if let CustomerEvent::Registered(e) = event {
                    state.id = Some(e.customer_id);
                    state.name = e.name.clone();
                    state.contact = e.contact.clone();
                    true
                } else {
                    false
                }
            })
            .event("customer.renamed", |state: &mut CustomerState, event| {
                if let CustomerEvent::Renamed(e) = event {
                    state.name = e.name.clone();
                    true
                } else {
                    false
                }
            })
            .event("customer.relocated", |state: &mut CustomerState, event| {
                if let CustomerEvent::Relocated(e) = event {
                    state.contact.city = Some(e.city.clone());
                    true
                } else {
                    false
                }
            })
            .invariant("customer.name_present", |state: &CustomerState| {
                if state.name.trim().is_empty() {
                    Err(DomainError::invariant("customer name must not be blank"))
                } else {
                    Ok(())
                }
            })
            .invariant("customer.email_shape", |state: &CustomerState| {
                match &state.contact.email {
                    Some(email) if !email.contains('@') => Err(DomainError::invariant(
                        format!("email '{email}' is not an address"),
                    )),
                    _ => Ok(()),
                }
            })
    }

    /// Register a new customer by applying the creational event.
    pub fn register(
        pipelines: &Pipelines,
        customer_id: CustomerId,
        name: impl Into<String>,
        contact: ContactCard,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let mut sourced = Sourced::new(CustomerState::default());
        sourced.apply(
            CustomerEvent::Registered(CustomerRegistered {
                customer_id,
                name: name.into(),
                contact,
                occurred_at,
            }),
            pipelines,
        )?;
        Ok(Self { sourced })
    }

    /// Rebuild a customer from its stored event history.
    pub fn rehydrate(
        history: impl IntoIterator<Item = CustomerEvent>,
        pipelines: &Pipelines,
    ) -> DomainResult<Self> {
        let sourced = Sourced::rehydrate(CustomerState::default(), history, pipelines)?;
        Ok(Self { sourced })
    }

    pub fn rename(
        &mut self,
        pipelines: &Pipelines,
        name: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let customer_id = self.require_id()?;
        self.apply(
            CustomerEvent::Renamed(CustomerRenamed {
                customer_id,
                name: name.into(),
                occurred_at,
            }),
            pipelines,
        )
    }

    pub fn relocate(
        &mut self,
        pipelines: &Pipelines,
        city: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let customer_id = self.require_id()?;
        self.apply(
            CustomerEvent::Relocated(CustomerRelocated {
                customer_id,
                city: city.into(),
                occurred_at,
            }),
            pipelines,
        )
    }

    /// Apply a raw event (factory/persistence hook).
    pub fn apply(&mut self, event: CustomerEvent, pipelines: &Pipelines) -> DomainResult<()> {
        self.sourced.apply(event, pipelines)
    }

    pub fn state(&self) -> &CustomerState {
        self.sourced.state()
    }

    pub fn id_typed(&self) -> Option<CustomerId> {
        self.sourced.state().id
    }

    pub fn name(&self) -> &str {
        self.sourced.state().name()
    }

    pub fn version(&self) -> u64 {
        self.sourced.version()
    }

    pub fn changes(&self) -> &[CustomerEvent] {
        self.sourced.changes()
    }

    pub fn reset_changes(&mut self) {
        self.sourced.reset_changes()
    }

    fn require_id(&self) -> DomainResult<CustomerId> {
        self.sourced
            .state()
            .id
            .ok_or_else(|| DomainError::validation("customer is not registered yet"))
    }
}
