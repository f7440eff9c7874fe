//! Application state shared across HTTP handlers.

use crate::services::{BookingService, HoldService};
use crate::stores::{PostgresInventoryStore, RedisHoldStore};
use std::sync::Arc;

/// The hold service as wired in production.
pub type AppHoldService = HoldService<RedisHoldStore, PostgresInventoryStore>;

/// The booking service as wired in production.
pub type AppBookingService = BookingService<PostgresInventoryStore>;

/// Application state shared across all HTTP handlers.
///
/// Stores are constructed once at startup and injected here; handlers
/// clone the state cheaply per request.
#[derive(Clone)]
pub struct AppState {
    /// Hold service over Redis and Postgres.
    pub holds: Arc<AppHoldService>,
    /// Booking service over Postgres.
    pub bookings: Arc<AppBookingService>,
}

impl AppState {
    /// Create the application state.
    #[must_use]
    pub fn new(holds: AppHoldService, bookings: AppBookingService) -> Self {
        Self {
            holds: Arc::new(holds),
            bookings: Arc::new(bookings),
        }
    }
}
