//! In-memory store doubles for tests.
//!
//! These are not stubs: the hold store double enforces the same
//! compare-and-swap and TTL semantics as Redis, so concurrency tests
//! exercise the real retry paths of the services.

pub mod hold_store;
pub mod inventory;

pub use hold_store::InMemoryHoldStore;
pub use inventory::InMemoryInventoryStore;
