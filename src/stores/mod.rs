//! Concrete store implementations: Redis for holds, Postgres for inventory.

pub mod postgres_inventory;
pub mod redis_hold;

pub use postgres_inventory::PostgresInventoryStore;
pub use redis_hold::RedisHoldStore;
