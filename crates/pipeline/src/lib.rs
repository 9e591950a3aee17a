//! `eventide-pipeline` — the event-sourcing kernel.
//!
//! This crate owns the mechanics of applying domain events to aggregates:
//!
//! - handler descriptors ([`EventHandler`], [`InvariantHandler`]) bound to
//!   one aggregate type each
//! - the generic handler [`Chain`], instantiated twice: first-match event
//!   dispatch and all-must-pass invariant checking
//! - [`HandlerSet`], the explicit per-aggregate-type registration builder
//! - [`Pipelines`], the injectable pipeline cache that assembles each chain
//!   at most once per aggregate type per instance
//! - [`Sourced`], the aggregate kernel: identity gating, dispatch,
//!   invariant sweep, change log and version tracking
//!
//! No IO, no async, no storage assumptions; persistence and publication are
//! external collaborators that read `id`/`version`/`changes` after a unit
//! of work.

pub mod cache;
pub mod chain;
pub mod handler;
pub mod registry;
pub mod sourced;

pub use cache::Pipelines;
pub use chain::Chain;
pub use handler::{EventHandler, InvariantHandler};
pub use registry::HandlerSet;
pub use sourced::Sourced;
