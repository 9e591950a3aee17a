//! Pet catalog domain module (event-sourced).
//!
//! Sample consumer of the pipeline kernel: a shelter's catalog of listed
//! pets, implemented purely as deterministic domain logic (no IO, no HTTP,
//! no storage).

pub mod catalog;


pub use catalog::{
    Catalog, CatalogCreated, CatalogEvent, CatalogId, CatalogItem, CatalogState, ItemAdded,
    ItemId, ItemRemoved, Species,
};
