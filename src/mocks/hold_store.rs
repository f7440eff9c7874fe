//! In-memory hold store with compare-and-swap and TTL semantics.

use crate::error::{CoreError, Result};
use crate::providers::hold_store::{HoldStore, HoldTxn, HoldWrite};
use crate::types::{Cart, CartId, TicketId};
use chrono::Duration;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// A value with a lapse instant, pruned lazily on access.
#[derive(Clone, Debug)]
struct Expiring<T> {
    value: T,
    expires_at: Instant,
}

#[derive(Default)]
struct Inner {
    holds: HashMap<TicketId, Expiring<u32>>,
    carts: HashMap<CartId, Expiring<Cart>>,
    /// Version per watchable key; bumped on every committed write so a
    /// stale snapshot is rejected exactly like a Redis `WATCH`.
    versions: HashMap<String, u64>,
    /// Commits to reject regardless of versions, for contention tests.
    forced_conflicts: u32,
}

impl Inner {
    fn prune(&mut self) {
        let now = Instant::now();
        self.holds.retain(|_, entry| entry.expires_at > now);
        self.carts.retain(|_, entry| entry.expires_at > now);
    }

    fn version(&self, key: &str) -> u64 {
        self.versions.get(key).copied().unwrap_or(0)
    }

    fn bump(&mut self, key: String) {
        *self.versions.entry(key).or_insert(0) += 1;
    }
}

fn hold_key(ticket_id: TicketId) -> String {
    format!("ticket_hold:{ticket_id}")
}

fn cart_key(cart_id: CartId) -> String {
    format!("cart:{cart_id}")
}

/// In-memory implementation of [`HoldStore`].
#[derive(Clone, Default)]
pub struct InMemoryHoldStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryHoldStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `count` commits as if a watched key had changed,
    /// regardless of versions. Lets tests drive the services' retry and
    /// exhaustion paths deterministically.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[allow(clippy::unwrap_used)]
    pub fn fail_next_commits(&self, count: u32) {
        self.inner.lock().unwrap().forced_conflicts = count;
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| CoreError::store("hold store lock poisoned"))
    }
}

impl HoldStore for InMemoryHoldStore {
    type Txn = InMemoryHoldTxn;

    async fn watch(&self, ticket_ids: &[TicketId], cart_id: CartId) -> Result<InMemoryHoldTxn> {
        let mut inner = self.lock()?;
        inner.prune();

        let mut watched = HashMap::new();
        let mut held = HashMap::new();
        for ticket_id in ticket_ids {
            let key = hold_key(*ticket_id);
            watched.insert(key.clone(), inner.version(&key));
            held.insert(
                *ticket_id,
                inner.holds.get(ticket_id).map_or(0, |entry| entry.value),
            );
        }
        let ckey = cart_key(cart_id);
        watched.insert(ckey.clone(), inner.version(&ckey));
        let cart = inner.carts.get(&cart_id).map(|entry| entry.value.clone());

        Ok(InMemoryHoldTxn {
            store: Arc::clone(&self.inner),
            cart_id,
            watched,
            held,
            cart,
        })
    }

    async fn cart(&self, cart_id: CartId) -> Result<Option<Cart>> {
        let mut inner = self.lock()?;
        inner.prune();
        Ok(inner.carts.get(&cart_id).map(|entry| entry.value.clone()))
    }

    async fn cart_ttl(&self, cart_id: CartId) -> Result<Option<Duration>> {
        let mut inner = self.lock()?;
        inner.prune();
        Ok(inner.carts.get(&cart_id).and_then(|entry| {
            Duration::from_std(entry.expires_at.saturating_duration_since(Instant::now())).ok()
        }))
    }

    async fn held(&self, ticket_id: TicketId) -> Result<u32> {
        let mut inner = self.lock()?;
        inner.prune();
        Ok(inner.holds.get(&ticket_id).map_or(0, |entry| entry.value))
    }
}

/// A snapshot of watched keys plus their versions at watch time.
pub struct InMemoryHoldTxn {
    store: Arc<Mutex<Inner>>,
    cart_id: CartId,
    watched: HashMap<String, u64>,
    held: HashMap<TicketId, u32>,
    cart: Option<Cart>,
}

impl HoldTxn for InMemoryHoldTxn {
    fn held(&self, ticket_id: TicketId) -> u32 {
        self.held.get(&ticket_id).copied().unwrap_or(0)
    }

    fn cart(&self) -> Option<&Cart> {
        self.cart.as_ref()
    }

    async fn commit(self, write: HoldWrite) -> Result<bool> {
        let mut inner = self
            .store
            .lock()
            .map_err(|_| CoreError::store("hold store lock poisoned"))?;
        inner.prune();

        if inner.forced_conflicts > 0 {
            inner.forced_conflicts -= 1;
            return Ok(false);
        }

        for (key, seen) in &self.watched {
            if inner.version(key) != *seen {
                return Ok(false);
            }
        }

        let expires_at = Instant::now()
            + write
                .ttl
                .to_std()
                .map_err(|_| CoreError::store("non-positive TTL"))?;

        for (ticket_id, value) in &write.holds {
            if *value == 0 {
                inner.holds.remove(ticket_id);
            } else {
                inner.holds.insert(
                    *ticket_id,
                    Expiring {
                        value: *value,
                        expires_at,
                    },
                );
            }
            inner.bump(hold_key(*ticket_id));
        }
        match write.cart {
            Some(cart) => {
                inner.carts.insert(
                    self.cart_id,
                    Expiring {
                        value: cart,
                        expires_at,
                    },
                );
            }
            None => {
                inner.carts.remove(&self.cart_id);
            }
        }
        inner.bump(cart_key(self.cart_id));

        Ok(true)
    }

    async fn abort(self) -> Result<()> {
        Ok(())
    }
}
