//! Hold service: soft, TTL-bounded inventory reservations.
//!
//! Reservation must never let the sum of concurrently granted quantities
//! exceed `qty_total - qty_sold` for a ticket. The hold counter and the
//! cart document are two separate keys that must move together, so every
//! mutation runs a watch / read / validate / atomic-apply cycle against the
//! hold store and retries the narrow read-to-apply window when a watched
//! key changed underneath it. Insufficient inventory is terminal and is
//! never retried; an exhausted retry budget surfaces as `Conflict`.

use crate::error::{CoreError, Result};
use crate::providers::hold_store::{HoldStore, HoldTxn, HoldWrite};
use crate::providers::inventory::InventoryStore;
use crate::types::{Cart, CartId, HeldCart, TicketId, TicketSku, TicketStatus, UserId};
use chrono::{Duration, Utc};

/// Attempt budget for the optimistic read-validate-apply loop. The window
/// is a single store round trip, so no backoff is used between attempts.
const MAX_ATTEMPTS: u32 = 3;

/// Orchestrates reserve, get, release, and clear against the hold store.
///
/// Owns the hold counter and cart keys exclusively; the inventory store is
/// consulted read-only for SKU eligibility and the sold/total numbers.
pub struct HoldService<H, I> {
    holds: H,
    inventory: I,
    hold_ttl: Duration,
}

impl<H, I> HoldService<H, I>
where
    H: HoldStore,
    I: InventoryStore,
{
    /// Create a hold service with the given hold duration in seconds.
    pub fn new(holds: H, inventory: I, hold_ttl_seconds: u64) -> Self {
        Self {
            holds,
            inventory,
            hold_ttl: Duration::seconds(i64::try_from(hold_ttl_seconds).unwrap_or(600)),
        }
    }

    /// Seconds until a freshly written hold lapses.
    fn ttl_seconds(&self) -> u64 {
        u64::try_from(self.hold_ttl.num_seconds()).unwrap_or(0)
    }

    /// Reserve `quantity` units of a ticket into a cart, creating the cart
    /// when `cart_id` is absent.
    ///
    /// # Errors
    ///
    /// - `Validation` for a non-positive quantity or a merged line that
    ///   would exceed the per-order limit (checked before any store write)
    /// - `NotFound` / `InvalidState` for a missing or inactive ticket
    /// - `Forbidden` when the cart belongs to another user
    /// - `Conflict` when the cart references a different event, or when the
    ///   retry budget is exhausted by contention
    /// - `InsufficientInventory` when `quantity` exceeds
    ///   `qty_total - qty_sold - held`
    pub async fn reserve(
        &self,
        user_id: UserId,
        ticket_id: TicketId,
        quantity: u32,
        cart_id: Option<CartId>,
    ) -> Result<HeldCart> {
        if quantity == 0 {
            return Err(CoreError::validation("quantity must be a positive integer"));
        }

        let sku = self
            .inventory
            .find_ticket(ticket_id)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                resource: "Ticket",
                id: ticket_id.to_string(),
            })?;
        if sku.status != TicketStatus::Active {
            return Err(CoreError::InvalidState {
                message: format!("ticket {} is {}", sku.id, sku.status.as_str()),
            });
        }

        let cart_id = cart_id.unwrap_or_default();

        for attempt in 1..=MAX_ATTEMPTS {
            let txn = self.holds.watch(&[ticket_id], cart_id).await?;

            let cart = match self.build_reserved_cart(&txn, &sku, user_id, cart_id, quantity) {
                Ok(cart) => cart,
                Err(err) => {
                    txn.abort().await?;
                    return Err(err);
                }
            };

            let held = txn.held(ticket_id);
            let available = sku.unsold().saturating_sub(held);
            if quantity > available {
                txn.abort().await?;
                return Err(CoreError::InsufficientInventory { available });
            }

            let committed = txn
                .commit(HoldWrite {
                    holds: vec![(ticket_id, held.saturating_add(quantity))],
                    cart: Some(cart.clone()),
                    ttl: self.hold_ttl,
                })
                .await?;

            if committed {
                tracing::info!(
                    cart_id = %cart_id,
                    ticket_id = %ticket_id,
                    quantity,
                    held = held + quantity,
                    "reserved inventory hold"
                );
                return Ok(HeldCart {
                    cart,
                    expires_in: self.ttl_seconds(),
                });
            }

            tracing::debug!(
                cart_id = %cart_id,
                ticket_id = %ticket_id,
                attempt,
                "hold keys changed during reserve, retrying"
            );
        }

        Err(CoreError::Conflict)
    }

    /// Validate ownership, the single-event constraint, and the merged
    /// per-order limit, then produce the updated cart. No store mutation
    /// happens here.
    fn build_reserved_cart(
        &self,
        txn: &H::Txn,
        sku: &TicketSku,
        user_id: UserId,
        cart_id: CartId,
        quantity: u32,
    ) -> Result<Cart> {
        let mut cart = match txn.cart() {
            Some(existing) => {
                if existing.user_id != user_id {
                    return Err(CoreError::Forbidden {
                        message: "cart belongs to another user".to_string(),
                    });
                }
                if existing.event_id != sku.event_id {
                    return Err(CoreError::Conflict);
                }
                existing.clone()
            }
            None => Cart::new(cart_id, user_id, sku.event_id, sku.currency.clone()),
        };

        let merged = cart.quantity_of(sku.id).saturating_add(quantity);
        if merged > sku.per_order_limit {
            return Err(CoreError::validation(format!(
                "quantity {merged} exceeds the per-order limit of {}",
                sku.per_order_limit
            )));
        }

        cart.merge_item(sku, quantity, Utc::now() + self.hold_ttl);
        Ok(cart)
    }

    /// Read a cart, annotated with its remaining TTL in seconds. Falls
    /// back to the configured hold duration when the store cannot report a
    /// remaining TTL.
    ///
    /// # Errors
    ///
    /// Returns an error only on store failure; an absent cart is `Ok(None)`.
    pub async fn get(&self, cart_id: CartId) -> Result<Option<HeldCart>> {
        let Some(cart) = self.holds.cart(cart_id).await? else {
            return Ok(None);
        };
        let expires_in = self
            .holds
            .cart_ttl(cart_id)
            .await?
            .and_then(|ttl| u64::try_from(ttl.num_seconds()).ok())
            .unwrap_or_else(|| self.ttl_seconds());
        Ok(Some(HeldCart { cart, expires_in }))
    }

    /// Release `quantity` units of a line item (the whole line when
    /// `None`), returning the updated cart, or `None` once the cart is
    /// empty or was already absent.
    ///
    /// Idempotent: releasing an absent cart returns `None`, and releasing
    /// an absent line item returns the cart unchanged. The hold counter is
    /// floored at zero and its key deleted rather than persisted at zero.
    ///
    /// # Errors
    ///
    /// `Conflict` when the retry budget is exhausted, or a store error.
    pub async fn release(
        &self,
        cart_id: CartId,
        ticket_id: TicketId,
        quantity: Option<u32>,
    ) -> Result<Option<Cart>> {
        for attempt in 1..=MAX_ATTEMPTS {
            let txn = self.holds.watch(&[ticket_id], cart_id).await?;

            let Some(mut cart) = txn.cart().cloned() else {
                txn.abort().await?;
                return Ok(None);
            };

            let removed = cart.remove_quantity(ticket_id, quantity);
            if removed == 0 {
                txn.abort().await?;
                return Ok(Some(cart));
            }

            let held = txn.held(ticket_id).saturating_sub(removed);
            let cart_write = if cart.is_empty() {
                None
            } else {
                Some(cart.clone())
            };

            let committed = txn
                .commit(HoldWrite {
                    holds: vec![(ticket_id, held)],
                    cart: cart_write,
                    ttl: self.hold_ttl,
                })
                .await?;

            if committed {
                tracing::info!(
                    cart_id = %cart_id,
                    ticket_id = %ticket_id,
                    released = removed,
                    held,
                    "released inventory hold"
                );
                return Ok(if cart.is_empty() { None } else { Some(cart) });
            }

            tracing::debug!(
                cart_id = %cart_id,
                ticket_id = %ticket_id,
                attempt,
                "hold keys changed during release, retrying"
            );
        }

        Err(CoreError::Conflict)
    }

    /// Release every line item's hold contribution and delete the cart
    /// key. A no-op for an absent cart.
    ///
    /// # Errors
    ///
    /// `Conflict` when the retry budget is exhausted, or a store error.
    pub async fn clear(&self, cart_id: CartId) -> Result<()> {
        for attempt in 1..=MAX_ATTEMPTS {
            let Some(snapshot) = self.holds.cart(cart_id).await? else {
                return Ok(());
            };
            let ticket_ids: Vec<TicketId> = snapshot.items.keys().copied().collect();

            let txn = self.holds.watch(&ticket_ids, cart_id).await?;

            let Some(cart) = txn.cart() else {
                // Expired between the read and the watch.
                txn.abort().await?;
                return Ok(());
            };

            // The line-item set moved underneath us; re-read so every
            // touched counter is watched.
            if cart.items.keys().any(|id| !ticket_ids.contains(id)) {
                txn.abort().await?;
                continue;
            }

            let holds: Vec<(TicketId, u32)> = cart
                .items
                .values()
                .map(|item| (item.ticket_id, txn.held(item.ticket_id).saturating_sub(item.quantity)))
                .collect();

            let committed = txn
                .commit(HoldWrite {
                    holds,
                    cart: None,
                    ttl: self.hold_ttl,
                })
                .await?;

            if committed {
                tracing::info!(cart_id = %cart_id, "cleared cart and released all holds");
                return Ok(());
            }

            tracing::debug!(cart_id = %cart_id, attempt, "hold keys changed during clear, retrying");
        }

        Err(CoreError::Conflict)
    }
}
