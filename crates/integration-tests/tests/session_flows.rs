//! End-to-end session tests: login, register, logout, and the state the
//! dependent stores are left in after each transition.

use pagermart_client::{Identity, LoginRole, Severity};
use pagermart_core::ItemId;
use pagermart_integration_tests::{
    CUSTOMER_EMAIL, CUSTOMER_PASSWORD, CUSTOMER_USER, OPERATOR_PASSWORD, OPERATOR_USER, Route,
    TestBackend,
};

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn test_customer_login_publishes_identity_and_message() {
    let backend = TestBackend::spawn().await;
    let shop = backend.shop();

    assert!(
        shop.session()
            .login(CUSTOMER_USER, CUSTOMER_PASSWORD, LoginRole::Customer)
            .await
    );

    let identity = shop.session().identity();
    assert!(identity.is_customer());
    match identity {
        Identity::Customer(profile) => {
            assert_eq!(profile.username, CUSTOMER_USER);
            assert_eq!(profile.email.as_str(), CUSTOMER_EMAIL);
        }
        other => panic!("expected customer identity, got {}", other.role_name()),
    }

    let note = shop.notifications().current().expect("login notification");
    assert_eq!(note.severity, Severity::Success);
    assert_eq!(note.message, "Welcome back, nora!");
    assert!(!shop.session().is_busy());
}

#[tokio::test]
async fn test_login_by_email_uses_canonical_username_for_later_calls() {
    let backend = TestBackend::spawn().await;
    let shop = backend.shop();

    assert!(
        shop.session()
            .login(CUSTOMER_EMAIL, CUSTOMER_PASSWORD, LoginRole::Customer)
            .await
    );
    shop.notifications().dismiss();

    // The cart refresh after login plus this one both authenticate with the
    // canonical username, not the email identifier.
    assert!(shop.cart().refresh().await);
    assert!(shop.notifications().current().is_none());
}

#[tokio::test]
async fn test_login_failure_leaves_anonymous_with_server_text() {
    let backend = TestBackend::spawn().await;
    let shop = backend.shop();

    assert!(
        !shop
            .session()
            .login(OPERATOR_USER, "wrong", LoginRole::Operator)
            .await
    );

    assert!(!shop.session().identity().is_authenticated());
    let note = shop.notifications().current().expect("error notification");
    assert_eq!(note.severity, Severity::Error);
    // Server-provided text, verbatim.
    assert_eq!(note.message, "Invalid operator credentials.");
    assert!(shop.cart().lines().is_empty());
}

#[tokio::test]
async fn test_login_while_authenticated_is_rejected() {
    let backend = TestBackend::spawn().await;
    let shop = backend.shop();

    assert!(
        shop.session()
            .login(CUSTOMER_USER, CUSTOMER_PASSWORD, LoginRole::Customer)
            .await
    );
    let before = backend.hits(Route::LoginOperator);

    assert!(
        !shop
            .session()
            .login(OPERATOR_USER, OPERATOR_PASSWORD, LoginRole::Operator)
            .await
    );

    assert!(shop.session().identity().is_customer());
    assert_eq!(backend.hits(Route::LoginOperator), before);
    let note = shop.notifications().current().expect("warning");
    assert_eq!(note.severity, Severity::Warning);
}

#[tokio::test]
async fn test_operator_login_forces_cart_empty() {
    let backend = TestBackend::spawn().await;
    backend.seed_cart(CUSTOMER_USER, 1, 2).await;
    let shop = backend.shop();

    assert!(
        shop.session()
            .login(OPERATOR_USER, OPERATOR_PASSWORD, LoginRole::Operator)
            .await
    );

    assert!(shop.session().identity().is_operator());
    assert!(shop.cart().lines().is_empty());
    // Operators never own a cart, so no cart fetch happens for them.
    assert_eq!(backend.hits(Route::CartFetch), 0);
}

#[tokio::test]
async fn test_customer_login_repopulates_cart_from_server() {
    let backend = TestBackend::spawn().await;
    backend.seed_cart(CUSTOMER_USER, 2, 3).await;
    let shop = backend.shop();

    assert!(
        shop.session()
            .login(CUSTOMER_USER, CUSTOMER_PASSWORD, LoginRole::Customer)
            .await
    );

    let lines = shop.cart().lines();
    assert_eq!(lines.len(), 1);
    let line = lines.first().expect("one line");
    assert_eq!(line.item_id, ItemId::new(2));
    assert_eq!(line.name, "Courier 2000");
    assert_eq!(line.quantity, 3);
    assert_eq!(shop.cart().item_count(), 3);
}

// =============================================================================
// Logout
// =============================================================================

#[tokio::test]
async fn test_logout_clears_identity_cart_and_favorites() {
    let backend = TestBackend::spawn().await;
    let shop = backend.shop();

    assert!(
        shop.session()
            .login(CUSTOMER_USER, CUSTOMER_PASSWORD, LoginRole::Customer)
            .await
    );
    assert!(shop.cart().add_item(ItemId::new(1), 2).await);
    assert!(shop.favorites().toggle(ItemId::new(3)).await);

    shop.session().logout();

    assert!(!shop.session().identity().is_authenticated());
    assert!(shop.cart().lines().is_empty());
    assert!(shop.favorites().members().is_empty());
    let note = shop.notifications().current().expect("logout notification");
    assert_eq!(note.severity, Severity::Info);
    assert_eq!(note.message, "Logged out successfully.");
}

// =============================================================================
// Register
// =============================================================================

#[tokio::test]
async fn test_register_then_login_with_the_new_account() {
    let backend = TestBackend::spawn().await;
    let shop = backend.shop();

    assert!(
        shop.session()
            .register("pat", "pat@example.com", "letmein")
            .await
    );
    // Registration provisions only; the session is untouched.
    assert!(!shop.session().identity().is_authenticated());
    let note = shop.notifications().current().expect("register notification");
    assert_eq!(note.severity, Severity::Success);
    assert_eq!(note.message, "Registration successful. Please log in.");

    assert!(
        shop.session()
            .login("pat", "letmein", LoginRole::Customer)
            .await
    );
    assert!(shop.session().identity().is_customer());
}

#[tokio::test]
async fn test_register_conflict_surfaces_server_message() {
    let backend = TestBackend::spawn().await;
    let shop = backend.shop();

    assert!(
        !shop
            .session()
            .register(CUSTOMER_USER, "other@example.com", "letmein")
            .await
    );

    let note = shop.notifications().current().expect("conflict notification");
    assert_eq!(note.severity, Severity::Error);
    assert_eq!(note.message, "Username or email already exists.");
    assert_eq!(backend.hits(Route::Register), 1);
}
