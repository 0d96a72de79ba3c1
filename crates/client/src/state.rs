//! Top-level handle wiring the stores together.
//!
//! [`Shop`] is the one composition point: it builds the transport, the
//! notification channel, and every store, and hands out cloneable
//! references. Nothing in this crate reads ambient globals; anything
//! that needs a store gets it from here.

use std::sync::Arc;

use tokio::sync::watch;

use crate::api::{ApiClient, ApiError};
use crate::cart::CartStore;
use crate::catalog::CatalogCache;
use crate::config::ClientConfig;
use crate::favorites::FavoritesStore;
use crate::notify::NotificationChannel;
use crate::ops::OpsConsole;
use crate::session::{AuthSession, Identity};

/// Fully wired client: transport, session, and every store.
///
/// Cloning is cheap and every clone shares the same state.
#[derive(Clone)]
pub struct Shop {
    inner: Arc<ShopInner>,
}

struct ShopInner {
    config: ClientConfig,
    notifier: NotificationChannel,
    session: AuthSession,
    catalog: CatalogCache,
    cart: CartStore,
    favorites: FavoritesStore,
    ops: OpsConsole,
}

impl Shop {
    /// Build the whole client graph from a configuration.
    ///
    /// All stores share one identity channel owned by the session, one
    /// notification slot, and one transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let notifier = NotificationChannel::new();
        let api = ApiClient::new(config)?;
        let catalog = CatalogCache::new(api.clone(), notifier.clone());

        let (identity_tx, identity_rx) = watch::channel(Identity::default());
        let cart = CartStore::new(api.clone(), identity_rx.clone(), notifier.clone());
        let favorites = FavoritesStore::new(api.clone(), identity_rx.clone(), notifier.clone());
        let ops = OpsConsole::new(api.clone(), identity_rx, notifier.clone());
        let session = AuthSession::new(
            api,
            notifier.clone(),
            identity_tx,
            cart.clone(),
            favorites.clone(),
        );

        Ok(Self {
            inner: Arc::new(ShopInner {
                config: config.clone(),
                notifier,
                session,
                catalog,
                cart,
                favorites,
                ops,
            }),
        })
    }

    /// The configuration this client was built from.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The shared notification slot.
    #[must_use]
    pub fn notifications(&self) -> &NotificationChannel {
        &self.inner.notifier
    }

    /// Identity and auth operations.
    #[must_use]
    pub fn session(&self) -> &AuthSession {
        &self.inner.session
    }

    /// The catalog listing.
    #[must_use]
    pub fn catalog(&self) -> &CatalogCache {
        &self.inner.catalog
    }

    /// The customer cart mirror.
    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    /// The favorites set.
    #[must_use]
    pub fn favorites(&self) -> &FavoritesStore {
        &self.inner.favorites
    }

    /// Operator console operations.
    #[must_use]
    pub fn ops(&self) -> &OpsConsole {
        &self.inner.ops
    }
}
