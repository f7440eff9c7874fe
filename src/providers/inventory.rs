//! Durable inventory store trait and the purchase checks shared by its
//! implementations.
//!
//! The five finalize preconditions run inside one transaction owned by the
//! store implementation; the checks themselves are pure functions here so
//! the Postgres store and the in-memory double cannot drift apart.

use crate::error::{CoreError, Result};
use crate::types::{
    Booking, EventId, EventRecord, EventStatus, EventSummary, TicketId, TicketSku, TicketStatus,
    UserId,
};
use chrono::{DateTime, Utc};
use std::future::Future;

/// How the booking service locates the SKU to sell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TicketSelector {
    /// Explicit ticket id.
    Id(TicketId),
    /// Match by display name among active SKUs.
    Name(String),
    /// The cheapest active SKU with remaining capacity.
    CheapestActive,
}

/// Inputs to the finalize transaction.
#[derive(Clone, Debug)]
pub struct PurchaseRequest {
    /// Event being booked.
    pub event_id: EventId,
    /// Authenticated buyer.
    pub user_id: UserId,
    /// How to locate the SKU.
    pub selector: TicketSelector,
    /// Quantity to sell.
    pub quantity: u32,
    /// Clock input, injected so the sales-window check is deterministic.
    pub now: DateTime<Utc>,
}

/// Durable, transactional store of events, ticket SKUs, and bookings.
pub trait InventoryStore: Send + Sync {
    /// Look up an event by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    fn find_event(&self, id: EventId) -> impl Future<Output = Result<Option<EventRecord>>> + Send;

    /// Look up a ticket SKU by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    fn find_ticket(&self, id: TicketId) -> impl Future<Output = Result<Option<TicketSku>>> + Send;

    /// Run the finalize transaction: validate the five purchase
    /// preconditions, increment `qty_sold`, and insert a confirmed booking,
    /// all-or-nothing.
    ///
    /// # Errors
    ///
    /// Returns the precondition violation unchanged, or a store error; in
    /// either case no partial effect remains.
    fn finalize_purchase(
        &self,
        request: &PurchaseRequest,
    ) -> impl Future<Output = Result<Booking>> + Send;

    /// Recompute the aggregate availability summary for an event. Not
    /// required to be transactionally consistent with a preceding
    /// finalize.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    fn event_summary(&self, event_id: EventId)
    -> impl Future<Output = Result<EventSummary>> + Send;
}

/// Check that an event can accept bookings at all.
///
/// # Errors
///
/// `InvalidState` when the event is not published.
pub fn validate_event_bookable(event: &EventRecord) -> Result<()> {
    if event.status != EventStatus::Published {
        return Err(CoreError::InvalidState {
            message: format!(
                "event {} is {} and cannot accept bookings",
                event.id,
                event.status.as_str()
            ),
        });
    }
    Ok(())
}

/// The sales-window, per-order-limit, and capacity checks, in that order.
///
/// Pure: called by every store implementation inside its transaction, after
/// the SKU row has been locked.
///
/// # Errors
///
/// `InvalidState` for an inactive SKU, `SalesWindowClosed`,
/// `LimitExceeded`, or `InsufficientInventory`; exactly one of them, the
/// first that fails.
pub fn validate_purchase(sku: &TicketSku, quantity: u32, now: DateTime<Utc>) -> Result<()> {
    if sku.status != TicketStatus::Active {
        return Err(CoreError::InvalidState {
            message: format!("ticket {} is {}", sku.id, sku.status.as_str()),
        });
    }
    if !sku.within_sales_window(now) {
        return Err(CoreError::SalesWindowClosed);
    }
    if quantity > sku.per_order_limit {
        return Err(CoreError::LimitExceeded {
            limit: sku.per_order_limit,
        });
    }
    if quantity > sku.unsold() {
        return Err(CoreError::InsufficientInventory {
            available: sku.unsold(),
        });
    }
    Ok(())
}

/// Resolve a selector against an event's SKUs the way every store must:
/// explicit id first, then name among active SKUs, then the cheapest
/// active SKU with remaining capacity.
#[must_use]
pub fn select_sku<'a>(tickets: &'a [TicketSku], selector: &TicketSelector) -> Option<&'a TicketSku> {
    match selector {
        TicketSelector::Id(id) => tickets.iter().find(|t| t.id == *id),
        TicketSelector::Name(name) => tickets
            .iter()
            .filter(|t| t.status == TicketStatus::Active)
            .find(|t| t.name == *name),
        TicketSelector::CheapestActive => tickets
            .iter()
            .filter(|t| t.status == TicketStatus::Active && t.unsold() > 0)
            .min_by_key(|t| t.price),
    }
}
