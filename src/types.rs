//! Domain types for the ticket inventory reservation core.
//!
//! Value objects, identifiers, and entities shared by the hold and booking
//! services. Availability is always derived, never stored:
//! `available = qty_total - qty_sold - hold_counter`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing `Uuid`.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for an event.
    EventId
);
uuid_id!(
    /// Unique identifier for a ticket SKU.
    TicketId
);
uuid_id!(
    /// Unique identifier for a cart.
    CartId
);
uuid_id!(
    /// Unique identifier for a buyer.
    UserId
);
uuid_id!(
    /// Unique identifier for a booking.
    BookingId
);

// ============================================================================
// Money (minor currency units to avoid floating point)
// ============================================================================

/// An amount in minor currency units (cents).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Creates a `Money` value from minor units.
    #[must_use]
    pub const fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    /// Returns the amount in minor units.
    #[must_use]
    pub const fn minor(&self) -> u64 {
        self.0
    }

    /// Multiplies by a quantity, saturating at `u64::MAX`.
    #[must_use]
    pub const fn times(&self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(quantity as u64))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// Lifecycle enums
// ============================================================================

/// Ticket SKU variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketType {
    /// No charge at checkout.
    Free,
    /// Standard paid admission.
    Paid,
    /// Paid admission tied to seated sections.
    Seat,
}

impl TicketType {
    /// Parse from the stored lowercase representation.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "free" => Some(Self::Free),
            "paid" => Some(Self::Paid),
            "seat" => Some(Self::Seat),
            _ => None,
        }
    }

    /// Stored lowercase representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Paid => "paid",
            Self::Seat => "seat",
        }
    }
}

/// Ticket SKU lifecycle status. Transitions are unordered; only `Active`
/// SKUs are eligible for holds and bookings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    /// Not yet on sale.
    Draft,
    /// On sale.
    Active,
    /// Withdrawn from sale.
    Archived,
}

impl TicketStatus {
    /// Parse from the stored lowercase representation.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "draft" => Some(Self::Draft),
            "active" => Some(Self::Active),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }

    /// Stored lowercase representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Archived => "archived",
        }
    }
}

/// Event lifecycle status. Only `Published` events accept bookings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    /// Being prepared by the organizer.
    Draft,
    /// Publicly visible and bookable.
    Published,
    /// No longer bookable.
    Archived,
}

impl EventStatus {
    /// Parse from the stored lowercase representation.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }

    /// Stored lowercase representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }
}

/// Booking record status. Append-only after creation except for
/// cancellation, which is outside the core.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Durably committed sale.
    Confirmed,
    /// Cancelled after the fact (refund flow, out of core scope).
    Cancelled,
}

impl BookingStatus {
    /// Stored lowercase representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }
}

// ============================================================================
// Inventory entities
// ============================================================================

/// A sellable ticket variant for an event, owned by the inventory store.
///
/// Invariant: `qty_sold <= qty_total`, and `qty_sold` is monotonically
/// non-decreasing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketSku {
    /// Ticket identifier.
    pub id: TicketId,
    /// Parent event.
    pub event_id: EventId,
    /// Display name (e.g. "General Admission").
    pub name: String,
    /// Ticket variant.
    pub ticket_type: TicketType,
    /// Unit price in minor currency units.
    pub price: Money,
    /// 3-letter currency code.
    pub currency: String,
    /// Whether the organizer absorbs platform fees.
    pub absorb_fees: bool,
    /// Total capacity.
    pub qty_total: u32,
    /// Durably committed sales.
    pub qty_sold: u32,
    /// Maximum quantity a single order/cart may accumulate.
    pub per_order_limit: u32,
    /// Sales window open instant, if bounded.
    pub sales_start: Option<DateTime<Utc>>,
    /// Sales window close instant, if bounded.
    pub sales_end: Option<DateTime<Utc>>,
    /// Lifecycle status.
    pub status: TicketStatus,
}

impl TicketSku {
    /// Capacity not yet durably sold. Holds are not accounted for here.
    #[must_use]
    pub const fn unsold(&self) -> u32 {
        self.qty_total.saturating_sub(self.qty_sold)
    }

    /// Whether `now` falls inside the sales window (unbounded sides pass).
    #[must_use]
    pub fn within_sales_window(&self, now: DateTime<Utc>) -> bool {
        if let Some(start) = self.sales_start {
            if now < start {
                return false;
            }
        }
        if let Some(end) = self.sales_end {
            if now > end {
                return false;
            }
        }
        true
    }
}

/// The slice of an event the core needs from the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event identifier.
    pub id: EventId,
    /// Organizer who owns the event.
    pub organizer_id: UserId,
    /// Display name.
    pub name: String,
    /// Lifecycle status.
    pub status: EventStatus,
}

// ============================================================================
// Cart aggregate
// ============================================================================

/// One line of a cart: a held quantity of a single ticket SKU.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Held ticket.
    pub ticket_id: TicketId,
    /// Parent event (denormalized for single-event enforcement).
    pub event_id: EventId,
    /// Ticket display name at hold time.
    pub name: String,
    /// Ticket variant at hold time.
    pub ticket_type: TicketType,
    /// Unit price at hold time.
    pub unit_price: Money,
    /// Currency at hold time.
    pub currency: String,
    /// Per-order limit at hold time.
    pub per_order_limit: u32,
    /// Quantity currently held.
    pub quantity: u32,
    /// Instant at which the hold lapses unless renewed.
    pub expires_at: DateTime<Utc>,
}

/// One buyer's pending selections for a single event, TTL-bound in the
/// hold store. An empty cart is deleted, never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    /// Cart identifier (also the hold-store key).
    pub id: CartId,
    /// Owning buyer.
    pub user_id: UserId,
    /// The single event this cart spans.
    pub event_id: EventId,
    /// Cart currency, taken from the first reserved SKU.
    pub currency: String,
    /// Line items keyed by ticket.
    pub items: HashMap<TicketId, CartItem>,
}

impl Cart {
    /// Creates an empty cart for a buyer and event.
    #[must_use]
    pub fn new(id: CartId, user_id: UserId, event_id: EventId, currency: String) -> Self {
        Self {
            id,
            user_id,
            event_id,
            currency,
            items: HashMap::new(),
        }
    }

    /// Quantity currently held for a ticket, zero if absent.
    #[must_use]
    pub fn quantity_of(&self, ticket_id: TicketId) -> u32 {
        self.items.get(&ticket_id).map_or(0, |item| item.quantity)
    }

    /// Merge a freshly granted quantity into the line for `sku`.
    ///
    /// The caller has already validated the merged total against the
    /// per-order limit and availability.
    pub fn merge_item(&mut self, sku: &TicketSku, quantity: u32, expires_at: DateTime<Utc>) {
        self.items
            .entry(sku.id)
            .and_modify(|item| {
                item.quantity = item.quantity.saturating_add(quantity);
                item.expires_at = expires_at;
            })
            .or_insert_with(|| CartItem {
                ticket_id: sku.id,
                event_id: sku.event_id,
                name: sku.name.clone(),
                ticket_type: sku.ticket_type,
                unit_price: sku.price,
                currency: sku.currency.clone(),
                per_order_limit: sku.per_order_limit,
                quantity,
                expires_at,
            });
    }

    /// Remove up to `quantity` units from the line for `ticket_id`
    /// (the whole line when `None`), deleting the line at zero.
    ///
    /// Returns the quantity actually removed, zero if the line is absent.
    pub fn remove_quantity(&mut self, ticket_id: TicketId, quantity: Option<u32>) -> u32 {
        let Some(item) = self.items.get_mut(&ticket_id) else {
            return 0;
        };
        let removed = quantity.map_or(item.quantity, |q| q.min(item.quantity));
        item.quantity -= removed;
        if item.quantity == 0 {
            self.items.remove(&ticket_id);
        }
        removed
    }

    /// Whether the cart has no remaining line items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A cart annotated with the seconds remaining until its hold lapses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeldCart {
    /// The cart document.
    pub cart: Cart,
    /// Seconds until the hold-store TTL discards the cart.
    pub expires_in: u64,
}

// ============================================================================
// Booking
// ============================================================================

/// A durably committed sale, created only inside a finalize transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Booking identifier.
    pub id: BookingId,
    /// Event the tickets belong to.
    pub event_id: EventId,
    /// Ticket SKU that was sold.
    pub ticket_id: TicketId,
    /// Buyer.
    pub user_id: UserId,
    /// Quantity sold.
    pub quantity: u32,
    /// `unit_price * quantity` at finalize time.
    pub total_amount: Money,
    /// Currency of the total.
    pub currency: String,
    /// Record status.
    pub status: BookingStatus,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
}

/// Aggregate availability across an event's SKUs, recomputed after a
/// finalize for the caller's response. Derived, never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    /// Event identifier.
    pub event_id: EventId,
    /// Cheapest active SKU price, `None` when no SKU is active.
    pub min_price: Option<Money>,
    /// Capacity summed across all SKUs.
    pub qty_total: u32,
    /// Committed sales summed across all SKUs.
    pub qty_sold: u32,
}
