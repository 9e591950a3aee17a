use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use eventide_core::{
    AggregateId, AggregateState, DomainError, DomainEvent, DomainResult, Entity, EventKind,
};
use eventide_pipeline::{HandlerSet, Pipelines, Sourced};

/// Catalog identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogId(pub AggregateId);

impl CatalogId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for CatalogId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Identifier of a listed item within a catalog.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub AggregateId);

impl ItemId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Species of a listed pet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Dog,
    Cat,
    Rabbit,
    Other,
}

/// A pet listed in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub item_id: ItemId,
    pub name: String,
    pub species: Species,
}

impl Entity for CatalogItem {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.item_id
    }
}

/// Mutable state of one catalog aggregate.
///
/// Only the handlers registered via [`Catalog::handlers`] mutate this;
/// everything else goes through the kernel's `apply`.
#[derive(Debug, Default)]
pub struct CatalogState {
    id: Option<CatalogId>,
    name: String,
    items: Vec<CatalogItem>,
}

impl CatalogState {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn item(&self, item_id: ItemId) -> Option<&CatalogItem> {
        self.items.iter().find(|i| i.item_id == item_id)
    }
}

impl AggregateState for CatalogState {
    type Event = CatalogEvent;

    fn aggregate_type() -> &'static str {
        "catalog"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id.map(|id| id.0)
    }
}

/// Event: CatalogCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogCreated {
    pub catalog_id: CatalogId,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAdded {
    pub catalog_id: CatalogId,
    pub item_id: ItemId,
    pub name: String,
    pub species: Species,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRemoved {
    pub catalog_id: CatalogId,
    pub item_id: ItemId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatalogEvent {
    Created(CatalogCreated),
    ItemAdded(ItemAdded),
    ItemRemoved(ItemRemoved),
}

impl DomainEvent for CatalogEvent {
    fn aggregate_id(&self) -> AggregateId {
        match self {
            CatalogEvent::Created(e) => e.catalog_id.0,
            CatalogEvent::ItemAdded(e) => e.catalog_id.0,
            CatalogEvent::ItemRemoved(e) => e.catalog_id.0,
        }
    }

    fn kind(&self) -> EventKind {
        match self {
            CatalogEvent::Created(_) => EventKind::Creational,
            CatalogEvent::ItemAdded(_) | CatalogEvent::ItemRemoved(_) => {
                EventKind::NonCreational
            }
        }
    }

    fn event_type(&self) -> &'static str {
        match self {
            CatalogEvent::Created(_) => "catalog.created",
            CatalogEvent::ItemAdded(_) => "catalog.item_added",
            CatalogEvent::ItemRemoved(_) => "catalog.item_removed",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CatalogEvent::Created(e) => e.occurred_at,
            CatalogEvent::ItemAdded(e) => e.occurred_at,
            CatalogEvent::ItemRemoved(e) => e.occurred_at,
        }
    }
}

/// Aggregate root: Catalog.
#[derive(Debug)]
pub struct Catalog {
    sourced: Sourced<CatalogState>,
}

impl Catalog {
    /// Handler set for this aggregate type; the host registers it once at
    /// startup via `Pipelines::register`.
    pub fn handlers() -> HandlerSet<CatalogState> {
        HandlerSet::new()
            .event("catalog.created", |state: &mut CatalogState, event| {
                if let CatalogEvent::Created(e) = event {
                    state.id = Some(e.catalog_id);
                    state.name = e.name.clone();
                    state.items.clear();
                    true
                } else {
                    false
                }
            })
            .event("catalog.item_added", |state: &mut CatalogState, event| {
                if let CatalogEvent::ItemAdded(e) = event {
                    state.items.push(CatalogItem {
                        item_id: e.item_id,
                        name: e.name.clone(),
                        species: e.species,
                    });
                    true
                } else {
                    false
                }
            })
            .event("catalog.item_removed", |state: &mut CatalogState, event| {
                if let CatalogEvent::ItemRemoved(e) = event {
                    state.items.retain(|i| i.item_id != e.item_id);
                    true
                } else {
                    false
                }
            })
            .invariant("catalog.name_present", |state: &CatalogState| {
                if state.name.trim().is_empty() {
                    Err(DomainError::invariant("catalog name must not be blank"))
                } else {
                    Ok(())
                }
            })
            .invariant("catalog.item_names_present", |state: &CatalogState| {
                match state.items.iter().find(|i| i.name.trim().is_empty()) {
                    Some(item) => Err(DomainError::invariant(format!(
                        "listed item {} has a blank name",
                        item.item_id
                    ))),
                    None => Ok(()),
                }
            })
    }

    /// Create a new catalog by applying the creational event.
    pub fn create(
        pipelines: &Pipelines,
        catalog_id: CatalogId,
        name: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let mut sourced = Sourced::new(CatalogState::default());
        sourced.apply(
            CatalogEvent::Created(CatalogCreated {
                catalog_id,
                name: name.into(),
                occurred_at,
            }),
            pipelines,
        )?;
        Ok(Self { sourced })
    }

    /// Rebuild a catalog from its stored event history.
    pub fn rehydrate(
        history: impl IntoIterator<Item = CatalogEvent>,
        pipelines: &Pipelines,
    ) -> DomainResult<Self> {
        let sourced = Sourced::rehydrate(CatalogState::default(), history, pipelines)?;
        Ok(Self { sourced })
    }

    /// List a pet in the catalog.
    pub fn add_item(
        &mut self,
        pipelines: &Pipelines,
        item_id: ItemId,
        name: impl Into<String>,
        species: Species,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let catalog_id = self.require_id()?;
        if self.state().item(item_id).is_some() {
            return Err(DomainError::validation(format!(
                "item {item_id} is already listed"
            )));
        }

        self.apply(
            CatalogEvent::ItemAdded(ItemAdded {
                catalog_id,
                item_id,
                name: name.into(),
                species,
                occurred_at,
            }),
            pipelines,
        )
    }

    /// Delist a pet.
    pub fn remove_item(
        &mut self,
        pipelines: &Pipelines,
        item_id: ItemId,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let catalog_id = self.require_id()?;
        if self.state().item(item_id).is_none() {
            return Err(DomainError::validation(format!(
                "item {item_id} is not listed"
            )));
        }

        self.apply(
            CatalogEvent::ItemRemoved(ItemRemoved {
                catalog_id,
                item_id,
                occurred_at,
            }),
            pipelines,
        )
    }

    /// Apply a raw event.
    ///
    /// Domain operations above are the normal entry points; this is the
    /// hook a factory or persistence collaborator uses directly.
    pub fn apply(&mut self, event: CatalogEvent, pipelines: &Pipelines) -> DomainResult<()> {
        self.sourced.apply(event, pipelines)
    }

    pub fn state(&self) -> &CatalogState {
        self.sourced.state()
    }

    pub fn id_typed(&self) -> Option<CatalogId> {
        self.sourced.state().id
    }

    pub fn name(&self) -> &str {
        self.sourced.state().name()
    }

    pub fn items(&self) -> &[CatalogItem] {
        self.sourced.state().items()
    }

    pub fn version(&self) -> u64 {
        self.sourced.version()
    }

    pub fn changes(&self) -> &[CatalogEvent] {
        self.sourced.changes()
    }

    pub fn reset_changes(&mut self) {
        self.sourced.reset_changes()
    }

    pub fn set_version(&mut self, version: u64) {
        self.sourced.set_version(version)
    }

    fn require_id(&self) -> DomainResult<CatalogId> {
        self.sourced
            .state()
            .id
            .ok_or_else(|| DomainError::validation("catalog is not created yet"))
    }
}
