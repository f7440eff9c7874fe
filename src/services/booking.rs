//! Booking service: durable, transactional finalization of a purchase.
//!
//! The hold is advisory: a booking may succeed with no hold in place, since
//! checkout can outlive the hold's TTL. All five preconditions and the
//! `qty_sold` increment run inside a single transaction owned by the
//! inventory store; this service validates inputs, delegates, and reads the
//! post-commit availability summary.

use crate::error::{CoreError, Result};
use crate::providers::inventory::{InventoryStore, PurchaseRequest, TicketSelector};
use crate::types::{Booking, EventId, EventSummary, UserId};
use chrono::Utc;

/// The result of a successful finalize: the booking record plus the
/// recomputed (non-transactional) availability summary for the event.
#[derive(Clone, Debug)]
pub struct FinalizeOutcome {
    /// The confirmed booking.
    pub booking: Booking,
    /// Aggregate availability after the sale.
    pub summary: EventSummary,
}

/// Finalizes purchases against the durable inventory store.
pub struct BookingService<I> {
    inventory: I,
}

impl<I> BookingService<I>
where
    I: InventoryStore,
{
    /// Create a booking service over an inventory store.
    pub const fn new(inventory: I) -> Self {
        Self { inventory }
    }

    /// Convert a purchase intent into a committed sale.
    ///
    /// Write conflicts inside the durable store are serialized by its row
    /// locking, not retried here; only business-rule violations surface.
    ///
    /// # Errors
    ///
    /// - `Validation` for a non-positive quantity
    /// - `NotFound` / `InvalidState` for a missing or unpublished event
    /// - `NotFound` / `InsufficientInventory` when no SKU matches the
    ///   selector
    /// - `SalesWindowClosed`, `LimitExceeded`, `InsufficientInventory` from
    ///   the transactional checks
    pub async fn finalize(
        &self,
        event_id: EventId,
        user_id: UserId,
        selector: TicketSelector,
        quantity: u32,
    ) -> Result<FinalizeOutcome> {
        if quantity == 0 {
            return Err(CoreError::validation("quantity must be a positive integer"));
        }

        let request = PurchaseRequest {
            event_id,
            user_id,
            selector,
            quantity,
            now: Utc::now(),
        };
        let booking = self.inventory.finalize_purchase(&request).await?;

        tracing::info!(
            booking_id = %booking.id,
            event_id = %event_id,
            ticket_id = %booking.ticket_id,
            quantity,
            total_amount = booking.total_amount.minor(),
            "finalized booking"
        );

        // Recomputed for the caller's response; deliberately outside the
        // finalize transaction.
        let summary = self.inventory.event_summary(event_id).await?;

        Ok(FinalizeOutcome { booking, summary })
    }
}
