//! Boxoffice: a ticket inventory reservation core.
//!
//! Sells a finite, perishable resource (ticket inventory) to many
//! concurrent buyers without overselling, while letting abandoned
//! in-progress purchases return inventory automatically.
//!
//! # Architecture
//!
//! ```text
//! buyer ──► HoldService ──► Hold Store (Redis: TTL + WATCH/MULTI)
//!   │            │
//!   │            └── availability = qty_total - qty_sold - hold_counter
//!   │
//!   └──► BookingService ──► Inventory Store (Postgres: one transaction,
//!                            row-locked qty_sold increment + booking row)
//! ```
//!
//! The hold is a soft, TTL-bounded reservation maintained with optimistic
//! concurrency: the hold counter and the cart document are watched, read,
//! validated, and written atomically, retrying the narrow window on
//! contention. Finalization is independent of hold state; it re-validates
//! everything inside one durable transaction.
//!
//! Stores are injected through the traits in [`providers`], with Redis and
//! Postgres implementations in [`stores`] and in-memory doubles in
//! [`mocks`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod error;
pub mod mocks;
pub mod providers;
pub mod server;
pub mod services;
pub mod stores;
pub mod types;

pub use config::Config;
pub use error::{CoreError, Result};
pub use services::{BookingService, HoldService};
