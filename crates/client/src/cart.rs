//! Cart mirror with refetch-and-replace reconciliation.
//!
//! The server owns the cart. After every mutation the store refetches the
//! whole cart and replaces its lines wholesale - no local patching, no
//! merging - so the mirror is always exactly what the server last reported.
//!
//! Mutations serialize behind a single async lock that also covers the
//! trailing refetch; the busy flag is the coarse UI signal that something
//! is in flight. A second mutation issued concurrently simply waits its
//! turn rather than being rejected.
//!
//! Every operation is a no-op with a warning notification unless the
//! session is a customer; operators and anonymous sessions own no cart.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use pagermart_core::{Credential, ItemId};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, watch};
use tracing::instrument;

use crate::api::types::CartLine;
use crate::api::{ApiClient, ApiError};
use crate::notify::NotificationChannel;
use crate::session::Identity;

const GATE_ADD: &str = "Please log in to add items to your cart.";
const GATE_MANAGE: &str = "Please log in to manage your cart.";
const GATE_CHECKOUT: &str = "Please log in to complete your purchase.";

const FALLBACK_REFRESH: &str = "Failed to load your cart.";
const FALLBACK_ADD: &str = "Failed to add item to cart.";
const FALLBACK_UPDATE: &str = "Failed to update cart quantity.";
const FALLBACK_REMOVE: &str = "Failed to remove item from cart.";
const FALLBACK_CHECKOUT: &str = "Checkout failed. Please try again.";

/// Local mirror of the customer's server-side cart.
///
/// Cloneable handle; all clones share one mirror.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    api: ApiClient,
    notifier: NotificationChannel,
    identity: watch::Receiver<Identity>,
    lines: watch::Sender<Vec<CartLine>>,
    busy: AtomicBool,
    // Serializes every mutation together with its trailing refetch.
    op_lock: Mutex<()>,
}

impl CartStore {
    pub(crate) fn new(
        api: ApiClient,
        identity: watch::Receiver<Identity>,
        notifier: NotificationChannel,
    ) -> Self {
        let (lines, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(CartStoreInner {
                api,
                notifier,
                identity,
                lines,
                busy: AtomicBool::new(false),
                op_lock: Mutex::new(()),
            }),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Snapshot of the cart lines.
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.inner.lines.borrow().clone()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.inner.lines.borrow().iter().map(|line| line.quantity).sum()
    }

    /// Cart total, derived from the lines on every call.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.inner.lines.borrow().iter().map(CartLine::subtotal).sum()
    }

    /// True while a cart operation is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    /// Subscribe to cart changes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Vec<CartLine>> {
        self.inner.lines.subscribe()
    }

    fn customer_credential(&self) -> Option<Credential> {
        match &*self.inner.identity.borrow() {
            Identity::Customer(profile) => Some(profile.credential.clone()),
            Identity::Anonymous | Identity::Operator(_) => None,
        }
    }

    fn line_quantity(&self, item_id: ItemId) -> Option<u32> {
        self.inner
            .lines
            .borrow()
            .iter()
            .find(|line| line.item_id == item_id)
            .map(|line| line.quantity)
    }

    fn notify_error(&self, err: &ApiError, fallback: &str) {
        self.inner
            .notifier
            .error(err.server_message().unwrap_or(fallback));
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Refetch the full cart and replace the mirror wholesale. Idempotent.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> bool {
        let Some(credential) = self.customer_credential() else {
            self.inner.notifier.warning(GATE_MANAGE);
            return false;
        };

        let _guard = self.inner.op_lock.lock().await;
        self.inner.busy.store(true, Ordering::Release);
        let outcome = self.refresh_locked(&credential).await;
        self.inner.busy.store(false, Ordering::Release);

        match outcome {
            Ok(()) => true,
            Err(err) => {
                self.notify_error(&err, FALLBACK_REFRESH);
                false
            }
        }
    }

    /// Refetch while already holding the op lock.
    async fn refresh_locked(&self, credential: &Credential) -> Result<(), ApiError> {
        match self.inner.api.fetch_cart(credential).await {
            Ok(entries) => {
                let lines: Vec<CartLine> = entries.into_iter().map(CartLine::from).collect();
                self.inner.lines.send_replace(lines);
                Ok(())
            }
            Err(err) => {
                // Never leave a stale mirror behind a failed fetch.
                self.inner.lines.send_replace(Vec::new());
                Err(err)
            }
        }
    }

    /// Add `quantity` units of an item, then reconcile.
    ///
    /// The success message uses the item name from the server's reply, so
    /// callers only need the id.
    #[instrument(skip(self), fields(item_id = %item_id, quantity = quantity))]
    pub async fn add_item(&self, item_id: ItemId, quantity: u32) -> bool {
        let Some(credential) = self.customer_credential() else {
            self.inner.notifier.warning(GATE_ADD);
            return false;
        };
        if quantity == 0 {
            self.inner.notifier.warning("Quantity must be at least 1.");
            return false;
        }

        let _guard = self.inner.op_lock.lock().await;
        self.inner.busy.store(true, Ordering::Release);
        let outcome = self.add_item_locked(item_id, quantity, &credential).await;
        self.inner.busy.store(false, Ordering::Release);

        match outcome {
            Ok(name) => {
                self.inner.notifier.success(format!("{name} added to cart!"));
                true
            }
            Err(err) => {
                self.notify_error(&err, FALLBACK_ADD);
                false
            }
        }
    }

    async fn add_item_locked(
        &self,
        item_id: ItemId,
        quantity: u32,
        credential: &Credential,
    ) -> Result<String, ApiError> {
        let entry = self
            .inner
            .api
            .add_cart_item(item_id, quantity, credential)
            .await?;
        // The add succeeded, but the operation only counts once the mirror
        // has converged on the server's cart.
        self.refresh_locked(credential).await?;
        Ok(entry.item.name)
    }

    /// Set a line to an absolute quantity; zero removes the line.
    #[instrument(skip(self), fields(item_id = %item_id, new_quantity = new_quantity))]
    pub async fn set_quantity(&self, item_id: ItemId, new_quantity: u32) -> bool {
        if new_quantity == 0 {
            return self.remove_item(item_id).await;
        }

        let Some(credential) = self.customer_credential() else {
            self.inner.notifier.warning(GATE_MANAGE);
            return false;
        };
        if self.line_quantity(item_id) == Some(new_quantity) {
            // Nothing would change; skip the round-trip.
            return true;
        }

        let _guard = self.inner.op_lock.lock().await;
        self.inner.busy.store(true, Ordering::Release);
        let outcome = self
            .set_quantity_locked(item_id, new_quantity, &credential)
            .await;
        self.inner.busy.store(false, Ordering::Release);

        match outcome {
            Ok(()) => {
                self.inner.notifier.success("Cart quantity updated.");
                true
            }
            Err(err) => {
                self.notify_error(&err, FALLBACK_UPDATE);
                false
            }
        }
    }

    async fn set_quantity_locked(
        &self,
        item_id: ItemId,
        quantity: u32,
        credential: &Credential,
    ) -> Result<(), ApiError> {
        self.inner
            .api
            .set_cart_quantity(item_id, quantity, credential)
            .await?;
        self.refresh_locked(credential).await
    }

    /// Remove a line, then reconcile.
    ///
    /// Removing an id the server does not know is a non-fatal failure: the
    /// server's not-found message is surfaced and the mirror stays as it
    /// was (no refetch happens on the failure path).
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn remove_item(&self, item_id: ItemId) -> bool {
        let Some(credential) = self.customer_credential() else {
            self.inner.notifier.warning(GATE_MANAGE);
            return false;
        };

        let _guard = self.inner.op_lock.lock().await;
        self.inner.busy.store(true, Ordering::Release);
        let outcome = self.remove_item_locked(item_id, &credential).await;
        self.inner.busy.store(false, Ordering::Release);

        match outcome {
            Ok(()) => {
                self.inner.notifier.info("Item removed from cart.");
                true
            }
            Err(err) => {
                self.notify_error(&err, FALLBACK_REMOVE);
                false
            }
        }
    }

    async fn remove_item_locked(
        &self,
        item_id: ItemId,
        credential: &Credential,
    ) -> Result<(), ApiError> {
        self.inner.api.remove_cart_item(item_id, credential).await?;
        self.refresh_locked(credential).await
    }

    /// Purchase the whole cart.
    ///
    /// Both preconditions - customer identity and a non-empty cart - are
    /// checked client-side before any network traffic. On success the
    /// server's message is surfaced first and then the (now empty) cart is
    /// refetched; on failure the mirror is left untouched.
    #[instrument(skip(self))]
    pub async fn checkout(&self) -> bool {
        let Some(credential) = self.customer_credential() else {
            self.inner.notifier.warning(GATE_CHECKOUT);
            return false;
        };
        if self.inner.lines.borrow().is_empty() {
            self.inner.notifier.warning("Your cart is empty.");
            return false;
        }

        let _guard = self.inner.op_lock.lock().await;
        self.inner.busy.store(true, Ordering::Release);
        let ok = match self.inner.api.checkout(&credential).await {
            Ok(receipt) => {
                self.inner.notifier.success(receipt.message);
                if let Err(err) = self.refresh_locked(&credential).await {
                    self.notify_error(&err, FALLBACK_REFRESH);
                }
                true
            }
            Err(err) => {
                self.notify_error(&err, FALLBACK_CHECKOUT);
                false
            }
        };
        self.inner.busy.store(false, Ordering::Release);
        ok
    }

    /// Drop the mirror. Session transitions are the only caller.
    pub(crate) fn reset(&self) {
        self.inner.lines.send_replace(Vec::new());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pagermart_core::{CustomerId, Email};
    use rust_decimal::Decimal;

    use super::*;
    use crate::config::ClientConfig;
    use crate::notify::Severity;
    use crate::session::CustomerProfile;

    fn store_with_identity(identity: Identity) -> (CartStore, NotificationChannel) {
        let api = ApiClient::new(&ClientConfig::default()).unwrap();
        let notifier = NotificationChannel::new();
        let (_tx, rx) = watch::channel(identity);
        // _tx dropped: identity stays fixed for the test's lifetime.
        (CartStore::new(api, rx, notifier.clone()), notifier)
    }

    fn customer() -> Identity {
        Identity::Customer(CustomerProfile {
            id: CustomerId::new(1),
            username: "nora".to_owned(),
            email: Email::parse("nora@example.com").unwrap(),
            credential: Credential::new("nora", "hunter2"),
        })
    }

    fn line(item_id: i32, quantity: u32, cents: i64) -> CartLine {
        CartLine {
            item_id: ItemId::new(item_id),
            name: format!("item-{item_id}"),
            description: None,
            unit_price: Decimal::new(cents, 2),
            image_url: None,
            quantity,
        }
    }

    #[tokio::test]
    async fn test_anonymous_operations_warn_and_fail() {
        let (store, notifier) = store_with_identity(Identity::Anonymous);

        assert!(!store.add_item(ItemId::new(7), 2).await);
        assert_eq!(notifier.current().unwrap().message, GATE_ADD);

        assert!(!store.set_quantity(ItemId::new(7), 3).await);
        assert!(!store.remove_item(ItemId::new(7)).await);
        assert!(!store.refresh().await);

        assert!(!store.checkout().await);
        assert_eq!(notifier.current().unwrap().message, GATE_CHECKOUT);

        assert!(store.lines().is_empty());
        assert!(!store.is_busy());
    }

    #[tokio::test]
    async fn test_add_item_rejects_zero_quantity_before_network() {
        let (store, notifier) = store_with_identity(customer());

        assert!(!store.add_item(ItemId::new(1), 0).await);
        let note = notifier.current().unwrap();
        assert_eq!(note.severity, Severity::Warning);
        assert!(store.lines().is_empty());
    }

    #[tokio::test]
    async fn test_checkout_empty_cart_short_circuits() {
        let (store, notifier) = store_with_identity(customer());

        assert!(!store.checkout().await);
        let note = notifier.current().unwrap();
        assert_eq!(note.severity, Severity::Warning);
        assert_eq!(note.message, "Your cart is empty.");
    }

    #[tokio::test]
    async fn test_equal_quantity_elides_round_trip() {
        let (store, notifier) = store_with_identity(customer());
        store.inner.lines.send_replace(vec![line(4, 2, 1999)]);

        // Same quantity: succeeds with no network call and no notification.
        assert!(store.set_quantity(ItemId::new(4), 2).await);
        assert!(notifier.current().is_none());
        assert_eq!(store.line_quantity(ItemId::new(4)), Some(2));
    }

    #[tokio::test]
    async fn test_totals_are_derived_from_lines() {
        let (store, _) = store_with_identity(customer());
        store
            .inner
            .lines
            .send_replace(vec![line(1, 2, 1000), line(2, 3, 550)]);

        assert_eq!(store.item_count(), 5);
        assert_eq!(store.total(), Decimal::new(3650, 2));
    }

    #[tokio::test]
    async fn test_reset_clears_lines() {
        let (store, _) = store_with_identity(customer());
        store.inner.lines.send_replace(vec![line(1, 1, 100)]);

        store.reset();
        assert!(store.lines().is_empty());
        assert_eq!(store.total(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_watch_observes_replacement() {
        let (store, _) = store_with_identity(customer());
        let mut rx = store.watch();

        store.inner.lines.send_replace(vec![line(3, 1, 700)]);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().len(), 1);
    }
}
