//! Customers domain module (event-sourced).
//!
//! Second sample consumer of the pipeline kernel: adopters registered with
//! the shelter, implemented purely as deterministic domain logic (no IO, no
//! HTTP, no storage).

pub mod customer;

pub use customer::{
    ContactCard, Customer, CustomerEvent, CustomerId, CustomerRegistered, CustomerRelocated,
    CustomerRenamed, CustomerState,
};
