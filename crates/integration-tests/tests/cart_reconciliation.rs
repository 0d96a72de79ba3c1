//! End-to-end cart tests.
//!
//! The store never edits its mirror locally; after every successful mutation
//! it refetches, so the client lines must equal the server's cart exactly.
//! These tests drive mutation sequences against the in-process backend and
//! compare both sides after each step.

use std::time::Duration;

use pagermart_client::api::types::CartLine;
use pagermart_client::{LoginRole, Severity, Shop};
use pagermart_core::ItemId;
use pagermart_integration_tests::{CUSTOMER_PASSWORD, CUSTOMER_USER, Route, TestBackend};
use rust_decimal::Decimal;

fn as_pairs(lines: &[CartLine]) -> Vec<(i32, u32)> {
    lines
        .iter()
        .map(|line| (line.item_id.as_i32(), line.quantity))
        .collect()
}

async fn login_customer(shop: &Shop) {
    assert!(
        shop.session()
            .login(CUSTOMER_USER, CUSTOMER_PASSWORD, LoginRole::Customer)
            .await
    );
    shop.notifications().dismiss();
}

// =============================================================================
// Mirror fidelity
// =============================================================================

#[tokio::test]
async fn test_add_item_mirrors_server_cart() {
    let backend = TestBackend::spawn().await;
    let shop = backend.shop();
    login_customer(&shop).await;

    assert!(shop.cart().add_item(ItemId::new(1), 2).await);

    assert_eq!(as_pairs(&shop.cart().lines()), vec![(1, 2)]);
    assert_eq!(backend.cart_snapshot(CUSTOMER_USER).await, vec![(1, 2)]);
    let note = shop.notifications().current().expect("add notification");
    assert_eq!(note.severity, Severity::Success);
    assert_eq!(note.message, "Sentinel 40 added to cart!");
}

#[tokio::test]
async fn test_mutation_sequence_converges_to_server_state() {
    let backend = TestBackend::spawn().await;
    let shop = backend.shop();
    login_customer(&shop).await;

    assert!(shop.cart().add_item(ItemId::new(1), 2).await);
    assert!(shop.cart().add_item(ItemId::new(2), 1).await);
    assert_eq!(
        as_pairs(&shop.cart().lines()),
        backend.cart_snapshot(CUSTOMER_USER).await
    );

    assert!(shop.cart().set_quantity(ItemId::new(1), 5).await);
    assert!(shop.cart().refresh().await);
    assert!(shop.cart().remove_item(ItemId::new(2)).await);
    assert_eq!(
        as_pairs(&shop.cart().lines()),
        backend.cart_snapshot(CUSTOMER_USER).await
    );

    assert_eq!(as_pairs(&shop.cart().lines()), vec![(1, 5)]);
    assert_eq!(shop.cart().item_count(), 5);
    assert_eq!(shop.cart().total(), Decimal::new(24995, 2));
}

#[tokio::test]
async fn test_adding_same_item_accumulates_quantity() {
    let backend = TestBackend::spawn().await;
    let shop = backend.shop();
    login_customer(&shop).await;

    assert!(shop.cart().add_item(ItemId::new(3), 1).await);
    assert!(shop.cart().add_item(ItemId::new(3), 2).await);

    assert_eq!(as_pairs(&shop.cart().lines()), vec![(3, 3)]);
    assert_eq!(backend.cart_snapshot(CUSTOMER_USER).await, vec![(3, 3)]);
}

#[tokio::test]
async fn test_remove_absent_item_fails_without_disturbing_mirror() {
    let backend = TestBackend::spawn().await;
    let shop = backend.shop();
    login_customer(&shop).await;
    assert!(shop.cart().add_item(ItemId::new(1), 2).await);
    shop.notifications().dismiss();

    assert!(!shop.cart().remove_item(ItemId::new(99)).await);

    let note = shop.notifications().current().expect("error notification");
    assert_eq!(note.severity, Severity::Error);
    assert_eq!(note.message, "Item not found in cart.");
    assert_eq!(as_pairs(&shop.cart().lines()), vec![(1, 2)]);
    assert_eq!(backend.cart_snapshot(CUSTOMER_USER).await, vec![(1, 2)]);
}

// =============================================================================
// Short circuits: no network traffic
// =============================================================================

#[tokio::test]
async fn test_anonymous_add_item_makes_no_network_call() {
    let backend = TestBackend::spawn().await;
    let shop = backend.shop();

    assert!(!shop.cart().add_item(ItemId::new(7), 2).await);

    assert!(shop.cart().lines().is_empty());
    let note = shop.notifications().current().expect("warning");
    assert_eq!(note.severity, Severity::Warning);
    assert_eq!(note.message, "Please log in to add items to your cart.");
    assert_eq!(backend.total_hits(), 0);
}

#[tokio::test]
async fn test_checkout_on_empty_cart_makes_no_network_call() {
    let backend = TestBackend::spawn().await;
    let shop = backend.shop();
    login_customer(&shop).await;
    let before = backend.total_hits();

    assert!(!shop.cart().checkout().await);

    let note = shop.notifications().current().expect("warning");
    assert_eq!(note.severity, Severity::Warning);
    assert_eq!(note.message, "Your cart is empty.");
    assert_eq!(backend.total_hits(), before);
    assert_eq!(backend.hits(Route::Checkout), 0);
}

#[tokio::test]
async fn test_checkout_while_anonymous_makes_no_network_call() {
    let backend = TestBackend::spawn().await;
    let shop = backend.shop();

    assert!(!shop.cart().checkout().await);

    let note = shop.notifications().current().expect("warning");
    assert_eq!(note.severity, Severity::Warning);
    assert_eq!(backend.total_hits(), 0);
}

#[tokio::test]
async fn test_equal_quantity_update_elides_the_round_trip() {
    let backend = TestBackend::spawn().await;
    let shop = backend.shop();
    login_customer(&shop).await;
    assert!(shop.cart().add_item(ItemId::new(1), 2).await);
    shop.notifications().dismiss();
    let before = backend.total_hits();

    assert!(shop.cart().set_quantity(ItemId::new(1), 2).await);

    assert_eq!(backend.total_hits(), before);
    assert_eq!(backend.hits(Route::CartUpdate), 0);
    assert!(shop.notifications().current().is_none());
    assert_eq!(as_pairs(&shop.cart().lines()), vec![(1, 2)]);
}

// =============================================================================
// Quantity edge cases
// =============================================================================

#[tokio::test]
async fn test_set_quantity_zero_routes_to_remove() {
    let backend = TestBackend::spawn().await;
    let shop = backend.shop();
    login_customer(&shop).await;
    assert!(shop.cart().add_item(ItemId::new(1), 2).await);
    shop.notifications().dismiss();

    assert!(shop.cart().set_quantity(ItemId::new(1), 0).await);

    // Removal is reported as plain info, not an error.
    let note = shop.notifications().current().expect("removal notification");
    assert_eq!(note.severity, Severity::Info);
    assert_eq!(note.message, "Item removed from cart.");
    assert!(shop.cart().lines().is_empty());
    assert!(backend.cart_snapshot(CUSTOMER_USER).await.is_empty());
    assert_eq!(backend.hits(Route::CartUpdate), 0);
    assert_eq!(backend.hits(Route::CartRemove), 1);
}

// =============================================================================
// Checkout
// =============================================================================

#[tokio::test]
async fn test_checkout_empties_the_cart_and_reports_units() {
    let backend = TestBackend::spawn().await;
    let shop = backend.shop();
    login_customer(&shop).await;
    assert!(shop.cart().add_item(ItemId::new(1), 2).await);
    assert!(shop.cart().add_item(ItemId::new(2), 1).await);

    assert!(shop.cart().checkout().await);

    let note = shop.notifications().current().expect("receipt notification");
    assert_eq!(note.severity, Severity::Success);
    assert_eq!(
        note.message,
        "Purchase complete! 3 unit(s) are being prepared."
    );
    assert!(shop.cart().lines().is_empty());
    assert!(backend.cart_snapshot(CUSTOMER_USER).await.is_empty());
    assert_eq!(backend.sold_unit_ids().await.len(), 3);
}

// =============================================================================
// Serialization of concurrent mutations
// =============================================================================

#[tokio::test]
async fn test_concurrent_mutations_never_overlap_on_the_wire() {
    let backend = TestBackend::spawn().await;
    let shop = backend.shop();
    login_customer(&shop).await;
    backend.set_cart_delay(Duration::from_millis(25));

    let (first, second) = tokio::join!(
        shop.cart().add_item(ItemId::new(1), 1),
        shop.cart().add_item(ItemId::new(2), 1),
    );

    assert!(first);
    assert!(second);
    assert_eq!(backend.max_cart_concurrency(), 1);

    backend.set_cart_delay(Duration::ZERO);
    let mut pairs = backend.cart_snapshot(CUSTOMER_USER).await;
    pairs.sort_unstable();
    assert_eq!(pairs, vec![(1, 1), (2, 1)]);
    assert_eq!(as_pairs(&shop.cart().lines()).len(), 2);
}
