//! In-memory inventory store running the same transactional checks as
//! Postgres, plus failure injection for atomicity tests.

use crate::error::{CoreError, Result};
use crate::providers::inventory::{
    InventoryStore, PurchaseRequest, TicketSelector, select_sku, validate_event_bookable,
    validate_purchase,
};
use crate::types::{
    Booking, BookingId, BookingStatus, EventId, EventRecord, EventSummary, TicketId, TicketSku,
    TicketStatus,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Inner {
    events: HashMap<EventId, EventRecord>,
    tickets: HashMap<TicketId, TicketSku>,
    bookings: Vec<Booking>,
    /// When set, the next finalize fails after validation but before any
    /// write, simulating a commit failure.
    fail_next_finalize: bool,
}

/// In-memory implementation of [`InventoryStore`].
#[derive(Clone, Default)]
pub struct InMemoryInventoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryInventoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an event.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[allow(clippy::unwrap_used)]
    pub fn insert_event(&self, event: EventRecord) {
        self.inner.lock().unwrap().events.insert(event.id, event);
    }

    /// Seed a ticket SKU.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[allow(clippy::unwrap_used)]
    pub fn insert_ticket(&self, sku: TicketSku) {
        self.inner.lock().unwrap().tickets.insert(sku.id, sku);
    }

    /// Make the next finalize fail between validation and commit.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[allow(clippy::unwrap_used)]
    pub fn fail_next_finalize(&self) {
        self.inner.lock().unwrap().fail_next_finalize = true;
    }

    /// Current state of a seeded ticket, for assertions.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn ticket(&self, id: TicketId) -> Option<TicketSku> {
        self.inner.lock().unwrap().tickets.get(&id).cloned()
    }

    /// Bookings recorded so far, for assertions.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn bookings(&self) -> Vec<Booking> {
        self.inner.lock().unwrap().bookings.clone()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| CoreError::store("inventory store lock poisoned"))
    }
}

impl InventoryStore for InMemoryInventoryStore {
    async fn find_event(&self, id: EventId) -> Result<Option<EventRecord>> {
        Ok(self.lock()?.events.get(&id).cloned())
    }

    async fn find_ticket(&self, id: TicketId) -> Result<Option<TicketSku>> {
        Ok(self.lock()?.tickets.get(&id).cloned())
    }

    async fn finalize_purchase(&self, request: &PurchaseRequest) -> Result<Booking> {
        // One lock for the whole read-validate-apply sequence stands in
        // for the row lock the durable store takes.
        let mut inner = self.lock()?;

        let event = inner
            .events
            .get(&request.event_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound {
                resource: "Event",
                id: request.event_id.to_string(),
            })?;
        validate_event_bookable(&event)?;

        let event_tickets: Vec<TicketSku> = inner
            .tickets
            .values()
            .filter(|t| t.event_id == request.event_id)
            .cloned()
            .collect();
        let sku = match select_sku(&event_tickets, &request.selector) {
            Some(sku) => sku.clone(),
            None => match &request.selector {
                TicketSelector::Id(ticket_id) => {
                    return Err(CoreError::NotFound {
                        resource: "Ticket",
                        id: ticket_id.to_string(),
                    });
                }
                _ => return Err(CoreError::InsufficientInventory { available: 0 }),
            },
        };

        validate_purchase(&sku, request.quantity, request.now)?;

        if inner.fail_next_finalize {
            inner.fail_next_finalize = false;
            return Err(CoreError::store("simulated commit failure"));
        }

        if let Some(stored) = inner.tickets.get_mut(&sku.id) {
            stored.qty_sold += request.quantity;
        }
        let booking = Booking {
            id: BookingId::new(),
            event_id: event.id,
            ticket_id: sku.id,
            user_id: request.user_id,
            quantity: request.quantity,
            total_amount: sku.price.times(request.quantity),
            currency: sku.currency.clone(),
            status: BookingStatus::Confirmed,
            created_at: request.now,
        };
        inner.bookings.push(booking.clone());
        Ok(booking)
    }

    async fn event_summary(&self, event_id: EventId) -> Result<EventSummary> {
        let inner = self.lock()?;
        let mut summary = EventSummary {
            event_id,
            min_price: None,
            qty_total: 0,
            qty_sold: 0,
        };
        for sku in inner.tickets.values().filter(|t| t.event_id == event_id) {
            summary.qty_total += sku.qty_total;
            summary.qty_sold += sku.qty_sold;
            if sku.status == TicketStatus::Active {
                summary.min_price = Some(match summary.min_price {
                    Some(current) => current.min(sku.price),
                    None => sku.price,
                });
            }
        }
        Ok(summary)
    }
}
