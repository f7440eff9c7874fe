//! Booking finalization endpoint.
//!
//! `POST /api/events/:event_id/bookings` converts a purchase intent into a
//! committed sale. The hold is advisory: no cart is required here.

use crate::api::error::ApiError;
use crate::providers::inventory::TicketSelector;
use crate::server::state::AppState;
use crate::types::{EventId, TicketId, UserId};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to finalize a purchase.
#[derive(Debug, Deserialize)]
pub struct FinalizeRequest {
    /// Authenticated buyer.
    pub user_id: Uuid,
    /// Explicit SKU, when the buyer picked one.
    pub ticket_id: Option<Uuid>,
    /// SKU name fallback when no id is given.
    pub ticket_name: Option<String>,
    /// Quantity to purchase.
    pub quantity: u32,
}

/// Response after a successful finalize.
#[derive(Debug, Serialize)]
pub struct FinalizeResponse {
    /// Confirmed booking id.
    pub booking_id: Uuid,
    /// Ticket that was sold.
    pub ticket_id: Uuid,
    /// Quantity sold.
    pub quantity: u32,
    /// Total charged, in minor units.
    pub total_amount: u64,
    /// Currency of the total.
    pub currency: String,
    /// Booking status.
    pub status: String,
    /// Cheapest active SKU price after the sale, in minor units.
    pub min_price: Option<u64>,
    /// Capacity across the event's SKUs.
    pub qty_total: u32,
    /// Committed sales across the event's SKUs.
    pub qty_sold: u32,
}

/// Finalize a purchase for an event.
pub async fn finalize(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(request): Json<FinalizeRequest>,
) -> Result<(StatusCode, Json<FinalizeResponse>), ApiError> {
    let selector = match (request.ticket_id, request.ticket_name) {
        (Some(id), _) => TicketSelector::Id(TicketId::from_uuid(id)),
        (None, Some(name)) => TicketSelector::Name(name),
        (None, None) => TicketSelector::CheapestActive,
    };

    let outcome = state
        .bookings
        .finalize(
            EventId::from_uuid(event_id),
            UserId::from_uuid(request.user_id),
            selector,
            request.quantity,
        )
        .await?;

    let booking = outcome.booking;
    let summary = outcome.summary;
    Ok((
        StatusCode::CREATED,
        Json(FinalizeResponse {
            booking_id: *booking.id.as_uuid(),
            ticket_id: *booking.ticket_id.as_uuid(),
            quantity: booking.quantity,
            total_amount: booking.total_amount.minor(),
            currency: booking.currency,
            status: booking.status.as_str().to_string(),
            min_price: summary.min_price.map(|p| p.minor()),
            qty_total: summary.qty_total,
            qty_sold: summary.qty_sold,
        }),
    ))
}
