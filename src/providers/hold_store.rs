//! Ephemeral hold store trait.
//!
//! The hold store owns two kinds of TTL-bound keys: per-ticket hold
//! counters and serialized cart documents. Because a reservation must move
//! both keys together, mutations go through a watch / validate / atomic
//! apply cycle: [`HoldStore::watch`] snapshots the keys and begins watching
//! them, and [`HoldTxn::commit`] applies the whole write only if none of
//! the watched keys changed in between.

use crate::error::Result;
use crate::types::{Cart, CartId, TicketId};
use chrono::Duration;
use std::future::Future;

/// The complete write a hold transaction applies atomically.
///
/// A counter of zero deletes the hold key rather than persisting it, so a
/// zero counter is indistinguishable from an absent one. A `cart` of `None`
/// deletes the cart key.
#[derive(Clone, Debug)]
pub struct HoldWrite {
    /// New counter value per ticket. Zero means delete.
    pub holds: Vec<(TicketId, u32)>,
    /// New cart document, or `None` to delete the cart key.
    pub cart: Option<Cart>,
    /// TTL applied to every surviving key.
    pub ttl: Duration,
}

/// An in-flight optimistic transaction over watched hold keys.
///
/// Dropping a transaction without calling [`commit`](Self::commit) or
/// [`abort`](Self::abort) leaves no server-side state beyond a stale watch
/// on a connection that is discarded with it.
pub trait HoldTxn: Send + Sized {
    /// Counter value observed for a watched ticket, zero if absent.
    fn held(&self, ticket_id: TicketId) -> u32;

    /// Cart document observed at watch time, if present.
    fn cart(&self) -> Option<&Cart>;

    /// Atomically apply the write.
    ///
    /// Returns `Ok(false)` when a watched key changed since the snapshot
    /// and the whole write was rejected; the caller re-reads and retries.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable or the cart cannot be
    /// serialized.
    fn commit(self, write: HoldWrite) -> impl Future<Output = Result<bool>> + Send;

    /// Release the watch without writing.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    fn abort(self) -> impl Future<Output = Result<()>> + Send;
}

/// Ephemeral key-value store with TTL and compare-and-swap semantics.
pub trait HoldStore: Send + Sync {
    /// The transaction handle produced by [`watch`](Self::watch).
    type Txn: HoldTxn;

    /// Begin watching the hold counters for `ticket_ids` and the cart key
    /// for `cart_id`, and snapshot their current values.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable or a stored cart
    /// cannot be decoded.
    fn watch(
        &self,
        ticket_ids: &[TicketId],
        cart_id: CartId,
    ) -> impl Future<Output = Result<Self::Txn>> + Send;

    /// Read a cart document outside any transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable or the cart cannot be
    /// decoded.
    fn cart(&self, cart_id: CartId) -> impl Future<Output = Result<Option<Cart>>> + Send;

    /// Remaining TTL on a cart key, `None` when absent or unreported.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    fn cart_ttl(&self, cart_id: CartId) -> impl Future<Output = Result<Option<Duration>>> + Send;

    /// Current hold counter for a ticket, zero if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    fn held(&self, ticket_id: TicketId) -> impl Future<Output = Result<u32>> + Send;
}
