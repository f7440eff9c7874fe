//! Store traits consumed by the core services.
//!
//! Providers are interfaces, not implementations: the services depend on
//! these traits and the runtime injects concrete stores (Redis, Postgres)
//! or in-memory doubles. This keeps the reservation logic testable and
//! avoids hidden global clients.

pub mod hold_store;
pub mod inventory;

pub use hold_store::{HoldStore, HoldTxn, HoldWrite};
pub use inventory::{InventoryStore, PurchaseRequest, TicketSelector};
