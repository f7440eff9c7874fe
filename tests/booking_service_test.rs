//! Booking finalization against the in-memory inventory store: the five
//! transactional checks, all-or-nothing commit, and SKU selection.

#![allow(clippy::unwrap_used)]

use boxoffice::error::CoreError;
use boxoffice::mocks::InMemoryInventoryStore;
use boxoffice::providers::inventory::TicketSelector;
use boxoffice::services::BookingService;
use boxoffice::types::{
    BookingStatus, EventId, EventRecord, EventStatus, Money, TicketId, TicketSku, TicketStatus,
    TicketType, UserId,
};
use chrono::{Duration, Utc};

fn event(status: EventStatus) -> EventRecord {
    EventRecord {
        id: EventId::new(),
        organizer_id: UserId::new(),
        name: "Summer Festival".to_string(),
        status,
    }
}

fn sku(event_id: EventId, name: &str, price_minor: u64, qty_total: u32) -> TicketSku {
    TicketSku {
        id: TicketId::new(),
        event_id,
        name: name.to_string(),
        ticket_type: TicketType::Paid,
        price: Money::from_minor(price_minor),
        currency: "USD".to_string(),
        absorb_fees: false,
        qty_total,
        qty_sold: 0,
        per_order_limit: 10,
        sales_start: None,
        sales_end: None,
        status: TicketStatus::Active,
    }
}

#[tokio::test]
async fn finalize_commits_sale_and_summary() {
    let inventory = InMemoryInventoryStore::new();
    let event = event(EventStatus::Published);
    let ga = sku(event.id, "General Admission", 2500, 100);
    inventory.insert_event(event.clone());
    inventory.insert_ticket(ga.clone());
    let service = BookingService::new(inventory.clone());
    let buyer = UserId::new();

    let outcome = service
        .finalize(event.id, buyer, TicketSelector::Id(ga.id), 3)
        .await
        .unwrap();

    assert_eq!(outcome.booking.ticket_id, ga.id);
    assert_eq!(outcome.booking.user_id, buyer);
    assert_eq!(outcome.booking.quantity, 3);
    assert_eq!(outcome.booking.total_amount, Money::from_minor(7500));
    assert_eq!(outcome.booking.status, BookingStatus::Confirmed);

    assert_eq!(outcome.summary.qty_total, 100);
    assert_eq!(outcome.summary.qty_sold, 3);
    assert_eq!(outcome.summary.min_price, Some(Money::from_minor(2500)));

    assert_eq!(inventory.ticket(ga.id).unwrap().qty_sold, 3);
    assert_eq!(inventory.bookings().len(), 1);
}

#[tokio::test]
async fn unpublished_event_rejects_bookings() {
    let inventory = InMemoryInventoryStore::new();
    let event = event(EventStatus::Draft);
    let ga = sku(event.id, "GA", 1000, 10);
    inventory.insert_event(event.clone());
    inventory.insert_ticket(ga.clone());
    let service = BookingService::new(inventory.clone());

    let err = service
        .finalize(event.id, UserId::new(), TicketSelector::Id(ga.id), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidState { .. }));
    assert_eq!(inventory.ticket(ga.id).unwrap().qty_sold, 0);
    assert!(inventory.bookings().is_empty());
}

#[tokio::test]
async fn unknown_event_is_not_found() {
    let inventory = InMemoryInventoryStore::new();
    let service = BookingService::new(inventory);

    let err = service
        .finalize(
            EventId::new(),
            UserId::new(),
            TicketSelector::CheapestActive,
            1,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound { resource: "Event", .. }));
}

#[tokio::test]
async fn closed_sales_window_rejects_purchase() {
    let inventory = InMemoryInventoryStore::new();
    let event = event(EventStatus::Published);
    let mut ga = sku(event.id, "GA", 1000, 10);
    ga.sales_end = Some(Utc::now() - Duration::hours(1));
    inventory.insert_event(event.clone());
    inventory.insert_ticket(ga.clone());
    let service = BookingService::new(inventory.clone());

    let err = service
        .finalize(event.id, UserId::new(), TicketSelector::Id(ga.id), 1)
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::SalesWindowClosed);
    assert!(inventory.bookings().is_empty());
}

#[tokio::test]
async fn per_order_limit_bounds_the_purchase() {
    let inventory = InMemoryInventoryStore::new();
    let event = event(EventStatus::Published);
    let mut ga = sku(event.id, "GA", 1000, 100);
    ga.per_order_limit = 4;
    inventory.insert_event(event.clone());
    inventory.insert_ticket(ga.clone());
    let service = BookingService::new(inventory);

    let err = service
        .finalize(event.id, UserId::new(), TicketSelector::Id(ga.id), 5)
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::LimitExceeded { limit: 4 });
}

#[tokio::test]
async fn capacity_is_checked_last_and_exactly() {
    let inventory = InMemoryInventoryStore::new();
    let event = event(EventStatus::Published);
    let mut ga = sku(event.id, "GA", 1000, 10);
    ga.qty_sold = 8;
    inventory.insert_event(event.clone());
    inventory.insert_ticket(ga.clone());
    let service = BookingService::new(inventory.clone());

    let err = service
        .finalize(event.id, UserId::new(), TicketSelector::Id(ga.id), 3)
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::InsufficientInventory { available: 2 });

    // Buying exactly the remainder succeeds and sells the SKU out.
    service
        .finalize(event.id, UserId::new(), TicketSelector::Id(ga.id), 2)
        .await
        .unwrap();
    assert_eq!(inventory.ticket(ga.id).unwrap().unsold(), 0);
}

#[tokio::test]
async fn failed_commit_leaves_no_partial_state() {
    let inventory = InMemoryInventoryStore::new();
    let event = event(EventStatus::Published);
    let ga = sku(event.id, "GA", 1000, 10);
    inventory.insert_event(event.clone());
    inventory.insert_ticket(ga.clone());
    let service = BookingService::new(inventory.clone());

    inventory.fail_next_finalize();
    let err = service
        .finalize(event.id, UserId::new(), TicketSelector::Id(ga.id), 2)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Store { .. }));
    assert_eq!(inventory.ticket(ga.id).unwrap().qty_sold, 0);
    assert!(inventory.bookings().is_empty());

    // The failure injection is one-shot; the retry lands.
    service
        .finalize(event.id, UserId::new(), TicketSelector::Id(ga.id), 2)
        .await
        .unwrap();
    assert_eq!(inventory.ticket(ga.id).unwrap().qty_sold, 2);
}

#[tokio::test]
async fn selector_by_name_matches_active_sku() {
    let inventory = InMemoryInventoryStore::new();
    let event = event(EventStatus::Published);
    let ga = sku(event.id, "General Admission", 2500, 100);
    let vip = sku(event.id, "VIP", 9900, 20);
    inventory.insert_event(event.clone());
    inventory.insert_ticket(ga);
    inventory.insert_ticket(vip.clone());
    let service = BookingService::new(inventory);

    let outcome = service
        .finalize(
            event.id,
            UserId::new(),
            TicketSelector::Name("VIP".to_string()),
            1,
        )
        .await
        .unwrap();
    assert_eq!(outcome.booking.ticket_id, vip.id);
    assert_eq!(outcome.booking.total_amount, Money::from_minor(9900));
}

#[tokio::test]
async fn cheapest_active_skips_sold_out_skus() {
    let inventory = InMemoryInventoryStore::new();
    let event = event(EventStatus::Published);
    let mut early_bird = sku(event.id, "Early Bird", 1500, 10);
    early_bird.qty_sold = 10;
    let ga = sku(event.id, "General Admission", 2500, 100);
    inventory.insert_event(event.clone());
    inventory.insert_ticket(early_bird);
    inventory.insert_ticket(ga.clone());
    let service = BookingService::new(inventory);

    let outcome = service
        .finalize(event.id, UserId::new(), TicketSelector::CheapestActive, 2)
        .await
        .unwrap();
    assert_eq!(outcome.booking.ticket_id, ga.id);
}

#[tokio::test]
async fn missing_sku_maps_by_selector_kind() {
    let inventory = InMemoryInventoryStore::new();
    let event = event(EventStatus::Published);
    inventory.insert_event(event.clone());
    let service = BookingService::new(inventory);

    let err = service
        .finalize(
            event.id,
            UserId::new(),
            TicketSelector::Id(TicketId::new()),
            1,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound { resource: "Ticket", .. }));

    let err = service
        .finalize(event.id, UserId::new(), TicketSelector::CheapestActive, 1)
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::InsufficientInventory { available: 0 });
}

#[tokio::test]
async fn zero_quantity_is_a_validation_error() {
    let inventory = InMemoryInventoryStore::new();
    let service = BookingService::new(inventory);

    let err = service
        .finalize(
            EventId::new(),
            UserId::new(),
            TicketSelector::CheapestActive,
            0,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
}
