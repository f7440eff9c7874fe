//! Hold service behavior against the in-memory stores: no overselling
//! under contention, idempotent release, TTL lapse, and the optimistic
//! retry budget.

#![allow(clippy::unwrap_used, clippy::panic)]

use boxoffice::error::CoreError;
use boxoffice::mocks::{InMemoryHoldStore, InMemoryInventoryStore};
use boxoffice::providers::hold_store::HoldStore;
use boxoffice::services::HoldService;
use boxoffice::types::{
    EventId, EventRecord, EventStatus, Money, TicketId, TicketSku, TicketStatus, TicketType,
    UserId,
};
use std::sync::Arc;

const TTL_SECONDS: u64 = 600;

fn published_event() -> EventRecord {
    EventRecord {
        id: EventId::new(),
        organizer_id: UserId::new(),
        name: "Summer Festival".to_string(),
        status: EventStatus::Published,
    }
}

fn active_sku(event_id: EventId, qty_total: u32, per_order_limit: u32) -> TicketSku {
    TicketSku {
        id: TicketId::new(),
        event_id,
        name: "General Admission".to_string(),
        ticket_type: TicketType::Paid,
        price: Money::from_minor(2500),
        currency: "USD".to_string(),
        absorb_fees: false,
        qty_total,
        qty_sold: 0,
        per_order_limit,
        sales_start: None,
        sales_end: None,
        status: TicketStatus::Active,
    }
}

fn service(
    inventory: &InMemoryInventoryStore,
) -> (
    HoldService<InMemoryHoldStore, InMemoryInventoryStore>,
    InMemoryHoldStore,
) {
    let holds = InMemoryHoldStore::new();
    (
        HoldService::new(holds.clone(), inventory.clone(), TTL_SECONDS),
        holds,
    )
}

#[tokio::test]
async fn sequential_reserves_stop_at_capacity() {
    let inventory = InMemoryInventoryStore::new();
    let event = published_event();
    let sku = active_sku(event.id, 10, 10);
    inventory.insert_event(event);
    inventory.insert_ticket(sku.clone());
    let (service, holds) = service(&inventory);

    let first = service
        .reserve(UserId::new(), sku.id, 4, None)
        .await
        .unwrap();
    assert_eq!(first.cart.quantity_of(sku.id), 4);
    assert_eq!(first.expires_in, TTL_SECONDS);

    service
        .reserve(UserId::new(), sku.id, 4, None)
        .await
        .unwrap();

    let err = service
        .reserve(UserId::new(), sku.id, 3, None)
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::InsufficientInventory { available: 2 });
    assert_eq!(holds.held(sku.id).await.unwrap(), 8);
}

#[tokio::test]
async fn concurrent_reserves_never_exceed_capacity() {
    let inventory = InMemoryInventoryStore::new();
    let event = published_event();
    let sku = active_sku(event.id, 10, 10);
    inventory.insert_event(event);
    inventory.insert_ticket(sku.clone());
    let (service, holds) = service(&inventory);
    let service = Arc::new(service);

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let service = Arc::clone(&service);
        let ticket_id = sku.id;
        tasks.push(tokio::spawn(async move {
            service.reserve(UserId::new(), ticket_id, 2, None).await
        }));
    }

    let mut granted = 0u32;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => granted += 2,
            Err(CoreError::InsufficientInventory { .. } | CoreError::Conflict) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert!(granted <= 10);
    assert_eq!(holds.held(sku.id).await.unwrap(), granted);
}

#[tokio::test]
async fn reserve_merges_into_existing_cart() {
    let inventory = InMemoryInventoryStore::new();
    let event = published_event();
    let sku = active_sku(event.id, 10, 10);
    inventory.insert_event(event);
    inventory.insert_ticket(sku.clone());
    let (service, _) = service(&inventory);
    let user = UserId::new();

    let held = service.reserve(user, sku.id, 2, None).await.unwrap();
    let cart_id = held.cart.id;

    let held = service
        .reserve(user, sku.id, 3, Some(cart_id))
        .await
        .unwrap();
    assert_eq!(held.cart.id, cart_id);
    assert_eq!(held.cart.quantity_of(sku.id), 5);
}

#[tokio::test]
async fn per_order_limit_rejected_before_any_write() {
    let inventory = InMemoryInventoryStore::new();
    let event = published_event();
    let sku = active_sku(event.id, 100, 5);
    inventory.insert_event(event);
    inventory.insert_ticket(sku.clone());
    let (service, holds) = service(&inventory);

    let err = service
        .reserve(UserId::new(), sku.id, 6, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
    assert_eq!(holds.held(sku.id).await.unwrap(), 0);
}

#[tokio::test]
async fn merged_quantity_respects_per_order_limit() {
    let inventory = InMemoryInventoryStore::new();
    let event = published_event();
    let sku = active_sku(event.id, 100, 5);
    inventory.insert_event(event);
    inventory.insert_ticket(sku.clone());
    let (service, holds) = service(&inventory);
    let user = UserId::new();

    let held = service.reserve(user, sku.id, 4, None).await.unwrap();
    let err = service
        .reserve(user, sku.id, 2, Some(held.cart.id))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
    assert_eq!(holds.held(sku.id).await.unwrap(), 4);
}

#[tokio::test]
async fn foreign_cart_is_forbidden() {
    let inventory = InMemoryInventoryStore::new();
    let event = published_event();
    let sku = active_sku(event.id, 10, 10);
    inventory.insert_event(event);
    inventory.insert_ticket(sku.clone());
    let (service, _) = service(&inventory);

    let held = service
        .reserve(UserId::new(), sku.id, 2, None)
        .await
        .unwrap();

    let err = service
        .reserve(UserId::new(), sku.id, 1, Some(held.cart.id))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Forbidden { .. }));
}

#[tokio::test]
async fn cart_spans_a_single_event() {
    let inventory = InMemoryInventoryStore::new();
    let event_a = published_event();
    let event_b = published_event();
    let sku_a = active_sku(event_a.id, 10, 10);
    let sku_b = active_sku(event_b.id, 10, 10);
    inventory.insert_event(event_a);
    inventory.insert_event(event_b);
    inventory.insert_ticket(sku_a.clone());
    inventory.insert_ticket(sku_b.clone());
    let (service, _) = service(&inventory);
    let user = UserId::new();

    let held = service.reserve(user, sku_a.id, 1, None).await.unwrap();
    let err = service
        .reserve(user, sku_b.id, 1, Some(held.cart.id))
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::Conflict);
}

#[tokio::test]
async fn release_restores_availability() {
    let inventory = InMemoryInventoryStore::new();
    let event = published_event();
    let sku = active_sku(event.id, 10, 10);
    inventory.insert_event(event);
    inventory.insert_ticket(sku.clone());
    let (service, holds) = service(&inventory);
    let user = UserId::new();

    let held = service.reserve(user, sku.id, 5, None).await.unwrap();
    let cart_id = held.cart.id;
    assert_eq!(holds.held(sku.id).await.unwrap(), 5);

    let cart = service
        .release(cart_id, sku.id, Some(2))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cart.quantity_of(sku.id), 3);
    assert_eq!(holds.held(sku.id).await.unwrap(), 3);

    // Freed capacity is immediately reservable by someone else.
    service
        .reserve(UserId::new(), sku.id, 7, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn releasing_last_line_deletes_cart() {
    let inventory = InMemoryInventoryStore::new();
    let event = published_event();
    let sku = active_sku(event.id, 10, 10);
    inventory.insert_event(event);
    inventory.insert_ticket(sku.clone());
    let (service, holds) = service(&inventory);

    let held = service
        .reserve(UserId::new(), sku.id, 3, None)
        .await
        .unwrap();
    let cart_id = held.cart.id;

    assert!(service.release(cart_id, sku.id, None).await.unwrap().is_none());
    assert!(service.get(cart_id).await.unwrap().is_none());
    assert_eq!(holds.held(sku.id).await.unwrap(), 0);
}

#[tokio::test]
async fn release_is_idempotent() {
    let inventory = InMemoryInventoryStore::new();
    let event = published_event();
    let sku = active_sku(event.id, 10, 10);
    inventory.insert_event(event);
    inventory.insert_ticket(sku.clone());
    let (service, _) = service(&inventory);

    let held = service
        .reserve(UserId::new(), sku.id, 2, None)
        .await
        .unwrap();
    let cart_id = held.cart.id;

    // Releasing a line the cart does not have leaves it unchanged.
    let other_ticket = TicketId::new();
    let cart = service
        .release(cart_id, other_ticket, Some(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cart.quantity_of(sku.id), 2);

    service.release(cart_id, sku.id, None).await.unwrap();
    // Second full release finds no cart and stays quiet.
    assert!(service.release(cart_id, sku.id, None).await.unwrap().is_none());
}

#[tokio::test]
async fn over_release_clamps_to_held_quantity() {
    let inventory = InMemoryInventoryStore::new();
    let event = published_event();
    let sku = active_sku(event.id, 10, 10);
    inventory.insert_event(event);
    inventory.insert_ticket(sku.clone());
    let (service, holds) = service(&inventory);

    let held = service
        .reserve(UserId::new(), sku.id, 3, None)
        .await
        .unwrap();

    assert!(service
        .release(held.cart.id, sku.id, Some(99))
        .await
        .unwrap()
        .is_none());
    assert_eq!(holds.held(sku.id).await.unwrap(), 0);
}

#[tokio::test]
async fn clear_releases_every_line() {
    let inventory = InMemoryInventoryStore::new();
    let event = published_event();
    let ga = active_sku(event.id, 10, 10);
    let mut vip = active_sku(event.id, 5, 5);
    vip.name = "VIP".to_string();
    vip.price = Money::from_minor(9900);
    inventory.insert_event(event);
    inventory.insert_ticket(ga.clone());
    inventory.insert_ticket(vip.clone());
    let (service, holds) = service(&inventory);
    let user = UserId::new();

    let held = service.reserve(user, ga.id, 4, None).await.unwrap();
    service
        .reserve(user, vip.id, 2, Some(held.cart.id))
        .await
        .unwrap();

    service.clear(held.cart.id).await.unwrap();

    assert!(service.get(held.cart.id).await.unwrap().is_none());
    assert_eq!(holds.held(ga.id).await.unwrap(), 0);
    assert_eq!(holds.held(vip.id).await.unwrap(), 0);
}

#[tokio::test]
async fn clear_of_absent_cart_is_noop() {
    let inventory = InMemoryInventoryStore::new();
    let (service, _) = service(&inventory);
    service.clear(boxoffice::types::CartId::new()).await.unwrap();
}

#[tokio::test]
async fn contended_reserve_retries_and_succeeds() {
    let inventory = InMemoryInventoryStore::new();
    let event = published_event();
    let sku = active_sku(event.id, 10, 10);
    inventory.insert_event(event);
    inventory.insert_ticket(sku.clone());
    let (service, holds) = service(&inventory);

    holds.fail_next_commits(1);
    let held = service
        .reserve(UserId::new(), sku.id, 2, None)
        .await
        .unwrap();
    assert_eq!(held.cart.quantity_of(sku.id), 2);
}

#[tokio::test]
async fn exhausted_retry_budget_is_a_conflict() {
    let inventory = InMemoryInventoryStore::new();
    let event = published_event();
    let sku = active_sku(event.id, 10, 10);
    inventory.insert_event(event);
    inventory.insert_ticket(sku.clone());
    let (service, holds) = service(&inventory);

    holds.fail_next_commits(3);
    let err = service
        .reserve(UserId::new(), sku.id, 2, None)
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::Conflict);
    assert!(err.is_retryable());
    assert_eq!(holds.held(sku.id).await.unwrap(), 0);
}

#[tokio::test]
async fn insufficient_inventory_is_terminal_not_retried() {
    let inventory = InMemoryInventoryStore::new();
    let event = published_event();
    let mut sku = active_sku(event.id, 10, 10);
    sku.qty_sold = 9;
    inventory.insert_event(event);
    inventory.insert_ticket(sku.clone());
    let (service, holds) = service(&inventory);

    // A pending forced conflict would make a retry visible as Conflict;
    // the shortage must surface first and leave the conflict unconsumed.
    holds.fail_next_commits(1);
    let err = service
        .reserve(UserId::new(), sku.id, 2, None)
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::InsufficientInventory { available: 1 });
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn inactive_or_missing_ticket_is_rejected() {
    let inventory = InMemoryInventoryStore::new();
    let event = published_event();
    let mut sku = active_sku(event.id, 10, 10);
    sku.status = TicketStatus::Draft;
    inventory.insert_event(event);
    inventory.insert_ticket(sku.clone());
    let (service, _) = service(&inventory);

    let err = service
        .reserve(UserId::new(), sku.id, 1, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidState { .. }));

    let err = service
        .reserve(UserId::new(), TicketId::new(), 1, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
}

#[tokio::test]
async fn zero_quantity_is_a_validation_error() {
    let inventory = InMemoryInventoryStore::new();
    let (service, _) = service(&inventory);

    let err = service
        .reserve(UserId::new(), TicketId::new(), 0, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
}

#[tokio::test]
async fn expired_hold_returns_inventory() {
    let inventory = InMemoryInventoryStore::new();
    let event = published_event();
    let sku = active_sku(event.id, 10, 10);
    inventory.insert_event(event);
    inventory.insert_ticket(sku.clone());

    let holds = InMemoryHoldStore::new();
    let service = HoldService::new(holds.clone(), inventory.clone(), 1);

    let held = service
        .reserve(UserId::new(), sku.id, 8, None)
        .await
        .unwrap();
    assert!(held.expires_in <= 1);

    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

    assert!(service.get(held.cart.id).await.unwrap().is_none());
    assert_eq!(holds.held(sku.id).await.unwrap(), 0);

    // All capacity is back on sale.
    service
        .reserve(UserId::new(), sku.id, 10, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn get_reports_remaining_ttl() {
    let inventory = InMemoryInventoryStore::new();
    let event = published_event();
    let sku = active_sku(event.id, 10, 10);
    inventory.insert_event(event);
    inventory.insert_ticket(sku.clone());
    let (service, _) = service(&inventory);

    let held = service
        .reserve(UserId::new(), sku.id, 1, None)
        .await
        .unwrap();

    let fetched = service.get(held.cart.id).await.unwrap().unwrap();
    assert_eq!(fetched.cart.quantity_of(sku.id), 1);
    assert!(fetched.expires_in <= TTL_SECONDS);
}
