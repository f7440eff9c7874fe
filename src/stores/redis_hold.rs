//! Redis-backed hold store.
//!
//! Key schema:
//! - `ticket_hold:{ticket_id}` → integer string, the quantity currently
//!   held by unexpired carts; TTL = hold duration, refreshed on every
//!   mutation, deleted at zero.
//! - `cart:{cart_id}` → JSON-serialized [`Cart`], same TTL.
//!
//! Optimistic concurrency uses `WATCH` + `MULTI`/`EXEC`: a transaction is
//! opened on a dedicated connection so the watch state cannot leak between
//! concurrent requests, and a nil `EXEC` reply means a watched key changed
//! and the whole write was rejected.

use crate::error::{CoreError, Result};
use crate::providers::hold_store::{HoldStore, HoldTxn, HoldWrite};
use crate::types::{Cart, CartId, TicketId};
use chrono::Duration;
use redis::aio::{ConnectionManager, MultiplexedConnection};
use redis::{AsyncCommands, Client};
use std::collections::HashMap;

/// Redis-backed implementation of [`HoldStore`].
#[derive(Clone)]
pub struct RedisHoldStore {
    /// Client used to open dedicated per-transaction connections.
    client: Client,
    /// Shared connection for plain reads.
    conn_manager: ConnectionManager,
}

impl RedisHoldStore {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the connection fails.
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| CoreError::store(format!("failed to create Redis client: {e}")))?;
        let conn_manager = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| CoreError::store(format!("failed to connect to Redis: {e}")))?;
        Ok(Self {
            client,
            conn_manager,
        })
    }

    fn hold_key(ticket_id: TicketId) -> String {
        format!("ticket_hold:{ticket_id}")
    }

    fn cart_key(cart_id: CartId) -> String {
        format!("cart:{cart_id}")
    }
}

fn store_err(context: &str) -> impl Fn(redis::RedisError) -> CoreError + '_ {
    move |e| CoreError::store(format!("{context}: {e}"))
}

/// Counters are floored at zero on read; a negative or garbled value is
/// treated as zero rather than poisoning availability.
fn parse_counter(raw: Option<i64>) -> u32 {
    raw.map_or(0, |v| u32::try_from(v).unwrap_or(0))
}

fn decode_cart(raw: Option<String>) -> Result<Option<Cart>> {
    match raw {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

impl HoldStore for RedisHoldStore {
    type Txn = RedisHoldTxn;

    async fn watch(&self, ticket_ids: &[TicketId], cart_id: CartId) -> Result<RedisHoldTxn> {
        // A dedicated connection: WATCH state is connection-scoped and must
        // not be shared with concurrent requests.
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(store_err("failed to open transaction connection"))?;

        let cart_key = Self::cart_key(cart_id);
        let hold_keys: Vec<String> = ticket_ids.iter().map(|id| Self::hold_key(*id)).collect();

        let mut watch = redis::cmd("WATCH");
        for key in &hold_keys {
            watch.arg(key);
        }
        watch.arg(&cart_key);
        let _: () = watch
            .query_async(&mut conn)
            .await
            .map_err(store_err("failed to watch hold keys"))?;

        let mut held = HashMap::with_capacity(ticket_ids.len());
        for (ticket_id, key) in ticket_ids.iter().zip(&hold_keys) {
            let raw: Option<i64> = conn
                .get(key)
                .await
                .map_err(store_err("failed to read hold counter"))?;
            held.insert(*ticket_id, parse_counter(raw));
        }

        let raw_cart: Option<String> = conn
            .get(&cart_key)
            .await
            .map_err(store_err("failed to read cart"))?;
        let cart = decode_cart(raw_cart)?;

        Ok(RedisHoldTxn {
            conn,
            cart_key,
            held,
            cart,
        })
    }

    async fn cart(&self, cart_id: CartId) -> Result<Option<Cart>> {
        let mut conn = self.conn_manager.clone();
        let raw: Option<String> = conn
            .get(Self::cart_key(cart_id))
            .await
            .map_err(store_err("failed to read cart"))?;
        decode_cart(raw)
    }

    async fn cart_ttl(&self, cart_id: CartId) -> Result<Option<Duration>> {
        let mut conn = self.conn_manager.clone();
        let ttl_seconds: i64 = conn
            .ttl(Self::cart_key(cart_id))
            .await
            .map_err(store_err("failed to read cart TTL"))?;
        // -2: key absent, -1: key has no expiration.
        match ttl_seconds {
            seconds if seconds > 0 => Ok(Some(Duration::seconds(seconds))),
            _ => Ok(None),
        }
    }

    async fn held(&self, ticket_id: TicketId) -> Result<u32> {
        let mut conn = self.conn_manager.clone();
        let raw: Option<i64> = conn
            .get(Self::hold_key(ticket_id))
            .await
            .map_err(store_err("failed to read hold counter"))?;
        Ok(parse_counter(raw))
    }
}

/// An open `WATCH` over hold keys on a dedicated connection.
pub struct RedisHoldTxn {
    conn: MultiplexedConnection,
    cart_key: String,
    held: HashMap<TicketId, u32>,
    cart: Option<Cart>,
}

impl HoldTxn for RedisHoldTxn {
    fn held(&self, ticket_id: TicketId) -> u32 {
        self.held.get(&ticket_id).copied().unwrap_or(0)
    }

    fn cart(&self) -> Option<&Cart> {
        self.cart.as_ref()
    }

    async fn commit(mut self, write: HoldWrite) -> Result<bool> {
        let ttl_seconds = u64::try_from(write.ttl.num_seconds()).unwrap_or(0).max(1);

        let mut pipe = redis::pipe();
        pipe.atomic();
        for (ticket_id, value) in &write.holds {
            let key = RedisHoldStore::hold_key(*ticket_id);
            if *value == 0 {
                pipe.del(&key);
            } else {
                pipe.set_ex(&key, value.to_string(), ttl_seconds);
            }
        }
        match &write.cart {
            Some(cart) => {
                let raw = serde_json::to_string(cart)?;
                pipe.set_ex(&self.cart_key, raw, ttl_seconds);
            }
            None => {
                pipe.del(&self.cart_key);
            }
        }

        // A nil EXEC reply means a watched key changed and nothing was
        // applied.
        let response: Option<redis::Value> = pipe
            .query_async(&mut self.conn)
            .await
            .map_err(store_err("failed to apply hold transaction"))?;
        Ok(response.is_some())
    }

    async fn abort(mut self) -> Result<()> {
        let _: () = redis::cmd("UNWATCH")
            .query_async(&mut self.conn)
            .await
            .map_err(store_err("failed to release watch"))?;
        Ok(())
    }
}
