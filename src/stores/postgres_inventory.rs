//! Postgres-backed inventory store.
//!
//! The finalize transaction locks the SKU row with `SELECT ... FOR UPDATE`
//! so two concurrent finalize calls against the same ticket serialize at
//! the store; the service layer never retries those conflicts itself.
//!
//! Queries bind at runtime rather than using the compile-time checked
//! macros, so the crate builds without a `DATABASE_URL` in the
//! environment.

use crate::error::{CoreError, Result};
use crate::providers::inventory::{
    InventoryStore, PurchaseRequest, TicketSelector, validate_event_bookable, validate_purchase,
};
use crate::types::{
    Booking, BookingId, BookingStatus, EventId, EventRecord, EventStatus, EventSummary, Money,
    TicketId, TicketSku, TicketStatus, TicketType, UserId,
};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

/// Postgres implementation of [`InventoryStore`].
#[derive(Clone)]
pub struct PostgresInventoryStore {
    pool: PgPool,
}

impl PostgresInventoryStore {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to Postgres with a bounded pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| CoreError::store(format!("failed to connect to Postgres: {e}")))?;
        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| CoreError::store(format!("migration failed: {e}")))?;
        Ok(())
    }
}

fn db_err(context: &str) -> impl Fn(sqlx::Error) -> CoreError + '_ {
    move |e| CoreError::store(format!("{context}: {e}"))
}

// ============================================================================
// Row mapping
// ============================================================================

#[derive(sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    organizer_id: Uuid,
    name: String,
    status: String,
}

impl EventRow {
    fn into_record(self) -> Result<EventRecord> {
        let status = EventStatus::parse(&self.status)
            .ok_or_else(|| CoreError::store(format!("unknown event status '{}'", self.status)))?;
        Ok(EventRecord {
            id: EventId::from_uuid(self.id),
            organizer_id: UserId::from_uuid(self.organizer_id),
            name: self.name,
            status,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TicketRow {
    id: Uuid,
    event_id: Uuid,
    name: String,
    ticket_type: String,
    price: i64,
    currency: String,
    absorb_fees: bool,
    qty_total: i32,
    qty_sold: i32,
    per_order_limit: i32,
    sales_start: Option<DateTime<Utc>>,
    sales_end: Option<DateTime<Utc>>,
    status: String,
}

const TICKET_COLUMNS: &str = "id, event_id, name, ticket_type, price, currency, absorb_fees, \
     qty_total, qty_sold, per_order_limit, sales_start, sales_end, status";

fn quantity_from_db(value: i32, field: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| CoreError::store(format!("negative {field} in store")))
}

impl TicketRow {
    fn into_sku(self) -> Result<TicketSku> {
        let ticket_type = TicketType::parse(&self.ticket_type).ok_or_else(|| {
            CoreError::store(format!("unknown ticket type '{}'", self.ticket_type))
        })?;
        let status = TicketStatus::parse(&self.status)
            .ok_or_else(|| CoreError::store(format!("unknown ticket status '{}'", self.status)))?;
        let price = u64::try_from(self.price)
            .map_err(|_| CoreError::store("negative price in store".to_string()))?;
        Ok(TicketSku {
            id: TicketId::from_uuid(self.id),
            event_id: EventId::from_uuid(self.event_id),
            name: self.name,
            ticket_type,
            price: Money::from_minor(price),
            currency: self.currency,
            absorb_fees: self.absorb_fees,
            qty_total: quantity_from_db(self.qty_total, "qty_total")?,
            qty_sold: quantity_from_db(self.qty_sold, "qty_sold")?,
            per_order_limit: quantity_from_db(self.per_order_limit, "per_order_limit")?,
            sales_start: self.sales_start,
            sales_end: self.sales_end,
            status,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    min_price: Option<i64>,
    qty_total: Option<i64>,
    qty_sold: Option<i64>,
}

// ============================================================================
// Store implementation
// ============================================================================

impl InventoryStore for PostgresInventoryStore {
    async fn find_event(&self, id: EventId) -> Result<Option<EventRecord>> {
        let row: Option<EventRow> =
            sqlx::query_as("SELECT id, organizer_id, name, status FROM events WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err("failed to load event"))?;
        row.map(EventRow::into_record).transpose()
    }

    async fn find_ticket(&self, id: TicketId) -> Result<Option<TicketSku>> {
        let row: Option<TicketRow> =
            sqlx::query_as(&format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err("failed to load ticket"))?;
        row.map(TicketRow::into_sku).transpose()
    }

    async fn finalize_purchase(&self, request: &PurchaseRequest) -> Result<Booking> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("failed to begin transaction"))?;

        let event_row: Option<EventRow> =
            sqlx::query_as("SELECT id, organizer_id, name, status FROM events WHERE id = $1")
                .bind(request.event_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err("failed to load event"))?;
        let event = event_row
            .ok_or_else(|| CoreError::NotFound {
                resource: "Event",
                id: request.event_id.to_string(),
            })?
            .into_record()?;
        validate_event_bookable(&event)?;

        // Lock the SKU row so concurrent finalize calls serialize here.
        let ticket_row: Option<TicketRow> = match &request.selector {
            TicketSelector::Id(ticket_id) => {
                sqlx::query_as(&format!(
                    "SELECT {TICKET_COLUMNS} FROM tickets \
                     WHERE id = $1 AND event_id = $2 FOR UPDATE"
                ))
                .bind(ticket_id.as_uuid())
                .bind(request.event_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
            }
            TicketSelector::Name(name) => {
                sqlx::query_as(&format!(
                    "SELECT {TICKET_COLUMNS} FROM tickets \
                     WHERE event_id = $1 AND name = $2 AND status = 'active' \
                     ORDER BY price LIMIT 1 FOR UPDATE"
                ))
                .bind(request.event_id.as_uuid())
                .bind(name)
                .fetch_optional(&mut *tx)
                .await
            }
            TicketSelector::CheapestActive => {
                sqlx::query_as(&format!(
                    "SELECT {TICKET_COLUMNS} FROM tickets \
                     WHERE event_id = $1 AND status = 'active' AND qty_sold < qty_total \
                     ORDER BY price LIMIT 1 FOR UPDATE"
                ))
                .bind(request.event_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
            }
        }
        .map_err(db_err("failed to load ticket"))?;

        let sku = match (ticket_row, &request.selector) {
            (Some(row), _) => row.into_sku()?,
            (None, TicketSelector::Id(ticket_id)) => {
                return Err(CoreError::NotFound {
                    resource: "Ticket",
                    id: ticket_id.to_string(),
                });
            }
            (None, _) => {
                return Err(CoreError::InsufficientInventory { available: 0 });
            }
        };

        validate_purchase(&sku, request.quantity, request.now)?;

        let quantity = i32::try_from(request.quantity)
            .map_err(|_| CoreError::validation("quantity out of range"))?;
        sqlx::query("UPDATE tickets SET qty_sold = qty_sold + $2 WHERE id = $1")
            .bind(sku.id.as_uuid())
            .bind(quantity)
            .execute(&mut *tx)
            .await
            .map_err(db_err("failed to increment qty_sold"))?;

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
        let total = i64::try_from(booking.total_amount.minor())
            .map_err(|_| CoreError::validation("total amount out of range"))?;
        sqlx::query(
            "INSERT INTO bookings \
             (id, event_id, ticket_id, user_id, quantity, total_amount, currency, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(booking.id.as_uuid())
        .bind(booking.event_id.as_uuid())
        .bind(booking.ticket_id.as_uuid())
        .bind(booking.user_id.as_uuid())
        .bind(quantity)
        .bind(total)
        .bind(&booking.currency)
        .bind(booking.status.as_str())
        .bind(booking.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err("failed to insert booking"))?;

        tx.commit()
            .await
            .map_err(db_err("failed to commit booking"))?;

        Ok(booking)
    }

    async fn event_summary(&self, event_id: EventId) -> Result<EventSummary> {
        let row: SummaryRow = sqlx::query_as(
            "SELECT MIN(price) FILTER (WHERE status = 'active') AS min_price, \
             COALESCE(SUM(qty_total), 0) AS qty_total, \
             COALESCE(SUM(qty_sold), 0) AS qty_sold \
             FROM tickets WHERE event_id = $1",
        )
        .bind(event_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("failed to compute event summary"))?;

        let min_price = row
            .min_price
            .map(|p| {
                u64::try_from(p)
                    .map(Money::from_minor)
                    .map_err(|_| CoreError::store("negative price in store".to_string()))
            })
            .transpose()?;
        let to_u32 = |value: Option<i64>, field: &str| -> Result<u32> {
            u32::try_from(value.unwrap_or(0))
                .map_err(|_| CoreError::store(format!("{field} out of range")))
        };

        Ok(EventSummary {
            event_id,
            min_price,
            qty_total: to_u32(row.qty_total, "qty_total")?,
            qty_sold: to_u32(row.qty_sold, "qty_sold")?,
        })
    }
}
