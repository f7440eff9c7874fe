//! Hold (cart) endpoints.
//!
//! - `POST /api/holds`: reserve quantity into a (possibly new) cart
//! - `GET /api/holds/:cart_id`: read a cart with its remaining TTL
//! - `POST /api/holds/:cart_id/release`: release part or all of a line
//! - `DELETE /api/holds/:cart_id`: clear the cart entirely

use crate::api::error::ApiError;
use crate::server::state::AppState;
use crate::types::{Cart, CartId, HeldCart, TicketId, UserId};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to reserve inventory into a cart.
#[derive(Debug, Deserialize)]
pub struct ReserveRequest {
    /// Buyer making the reservation.
    pub user_id: Uuid,
    /// Ticket SKU to hold.
    pub ticket_id: Uuid,
    /// Quantity to hold.
    pub quantity: u32,
    /// Existing cart to add to, if any.
    pub cart_id: Option<Uuid>,
}

/// A cart line in responses.
#[derive(Debug, Serialize)]
pub struct CartItemResponse {
    /// Held ticket.
    pub ticket_id: Uuid,
    /// Ticket name at hold time.
    pub name: String,
    /// Unit price in minor units.
    pub unit_price: u64,
    /// Currency code.
    pub currency: String,
    /// Held quantity.
    pub quantity: u32,
}

/// A cart in responses.
#[derive(Debug, Serialize)]
pub struct CartResponse {
    /// Cart identifier.
    pub cart_id: Uuid,
    /// Owning buyer.
    pub user_id: Uuid,
    /// The single event this cart spans.
    pub event_id: Uuid,
    /// Cart currency.
    pub currency: String,
    /// Line items.
    pub items: Vec<CartItemResponse>,
    /// Seconds until the hold lapses, when known.
    pub expires_in: Option<u64>,
}

impl CartResponse {
    fn from_cart(cart: Cart, expires_in: Option<u64>) -> Self {
        let mut items: Vec<CartItemResponse> = cart
            .items
            .into_values()
            .map(|item| CartItemResponse {
                ticket_id: *item.ticket_id.as_uuid(),
                name: item.name,
                unit_price: item.unit_price.minor(),
                currency: item.currency,
                quantity: item.quantity,
            })
            .collect();
        items.sort_by(|a, b| a.ticket_id.cmp(&b.ticket_id));
        Self {
            cart_id: *cart.id.as_uuid(),
            user_id: *cart.user_id.as_uuid(),
            event_id: *cart.event_id.as_uuid(),
            currency: cart.currency,
            items,
            expires_in,
        }
    }

    fn from_held(held: HeldCart) -> Self {
        let expires_in = held.expires_in;
        Self::from_cart(held.cart, Some(expires_in))
    }
}

/// Reserve inventory into a cart.
pub async fn reserve(
    State(state): State<AppState>,
    Json(request): Json<ReserveRequest>,
) -> Result<(StatusCode, Json<CartResponse>), ApiError> {
    let held = state
        .holds
        .reserve(
            UserId::from_uuid(request.user_id),
            TicketId::from_uuid(request.ticket_id),
            request.quantity,
            request.cart_id.map(CartId::from_uuid),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(CartResponse::from_held(held))))
}

/// Read a cart with its remaining TTL.
pub async fn get_cart(
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
) -> Result<Json<CartResponse>, ApiError> {
    let held = state
        .holds
        .get(CartId::from_uuid(cart_id))
        .await?
        .ok_or(crate::error::CoreError::NotFound {
            resource: "Cart",
            id: cart_id.to_string(),
        })?;
    Ok(Json(CartResponse::from_held(held)))
}

/// Request to release held quantity.
#[derive(Debug, Deserialize)]
pub struct ReleaseRequest {
    /// Line item to release from.
    pub ticket_id: Uuid,
    /// Quantity to release; the whole line when omitted.
    pub quantity: Option<u32>,
}

/// Response after a release: the remaining cart, if any.
#[derive(Debug, Serialize)]
pub struct ReleaseResponse {
    /// Remaining cart, `None` when the cart was emptied or absent.
    pub cart: Option<CartResponse>,
}

/// Release part or all of a line item's hold.
pub async fn release(
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
    Json(request): Json<ReleaseRequest>,
) -> Result<Json<ReleaseResponse>, ApiError> {
    let cart = state
        .holds
        .release(
            CartId::from_uuid(cart_id),
            TicketId::from_uuid(request.ticket_id),
            request.quantity,
        )
        .await?;
    Ok(Json(ReleaseResponse {
        cart: cart.map(|c| CartResponse::from_cart(c, None)),
    }))
}

/// Clear a cart, releasing every hold it contributed.
pub async fn clear(
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.holds.clear(CartId::from_uuid(cart_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
