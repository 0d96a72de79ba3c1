//! Favorites set with optimistic toggles.
//!
//! The opposite consistency strategy from the cart: a toggle flips local
//! membership immediately, before the server call, and only touches the
//! set again if the call fails. The failure path restores the exact
//! pre-toggle snapshot rather than re-flipping the one id, so a rollback
//! can never double-toggle state that changed while the call was in
//! flight. There is no refetch on success; the server has nothing to add
//! to a bare membership set.
//!
//! Favorites belong to whichever credential is active, so the gate here
//! is "any authenticated identity" rather than customer-only.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use pagermart_core::{Credential, ItemId};
use tokio::sync::watch;
use tracing::instrument;

use crate::api::{ApiClient, ApiError};
use crate::notify::NotificationChannel;
use crate::session::Identity;

const GATE: &str = "Please log in to manage favorites.";
const FALLBACK_LOAD: &str = "Failed to load favorites.";
const FALLBACK_TOGGLE: &str = "Failed to update favorites.";

/// The active identity's favorite item ids.
///
/// Cloneable handle; all clones share one set.
#[derive(Clone)]
pub struct FavoritesStore {
    inner: Arc<FavoritesStoreInner>,
}

struct FavoritesStoreInner {
    api: ApiClient,
    notifier: NotificationChannel,
    identity: watch::Receiver<Identity>,
    members: watch::Sender<BTreeSet<ItemId>>,
    // Ids with a toggle in flight. Distinct ids may overlap freely; a
    // second toggle of the same id is refused until the first settles.
    pending: watch::Sender<HashSet<ItemId>>,
}

impl FavoritesStore {
    pub(crate) fn new(
        api: ApiClient,
        identity: watch::Receiver<Identity>,
        notifier: NotificationChannel,
    ) -> Self {
        let (members, _) = watch::channel(BTreeSet::new());
        let (pending, _) = watch::channel(HashSet::new());
        Self {
            inner: Arc::new(FavoritesStoreInner {
                api,
                notifier,
                identity,
                members,
                pending,
            }),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Snapshot of the favorite item ids.
    #[must_use]
    pub fn members(&self) -> BTreeSet<ItemId> {
        self.inner.members.borrow().clone()
    }

    /// Whether an item is currently a favorite.
    #[must_use]
    pub fn contains(&self, item_id: ItemId) -> bool {
        self.inner.members.borrow().contains(&item_id)
    }

    /// True while a toggle of this id is in flight.
    #[must_use]
    pub fn is_updating(&self, item_id: ItemId) -> bool {
        self.inner.pending.borrow().contains(&item_id)
    }

    /// Subscribe to membership changes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<BTreeSet<ItemId>> {
        self.inner.members.subscribe()
    }

    fn active_credential(&self) -> Option<Credential> {
        self.inner.identity.borrow().credential().cloned()
    }

    fn notify_error(&self, err: &ApiError, fallback: &str) {
        self.inner
            .notifier
            .error(err.server_message().unwrap_or(fallback));
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Fetch the full membership set and replace the local one.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> bool {
        let Some(credential) = self.active_credential() else {
            self.inner.notifier.warning(GATE);
            return false;
        };

        match self.inner.api.list_favorites(&credential).await {
            Ok(ids) => {
                self.inner.members.send_replace(ids.into_iter().collect());
                true
            }
            Err(err) => {
                self.notify_error(&err, FALLBACK_LOAD);
                false
            }
        }
    }

    /// Flip an item's membership, optimistically.
    ///
    /// Success emits no notification; the flipped set already told the
    /// story. Failure restores the pre-toggle snapshot and surfaces the
    /// server's message.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn toggle(&self, item_id: ItemId) -> bool {
        let Some(credential) = self.active_credential() else {
            self.inner.notifier.warning(GATE);
            return false;
        };
        // Same id already in flight: refuse quietly, keep the first
        // outcome authoritative.
        if !self
            .inner
            .pending
            .send_if_modified(|pending| pending.insert(item_id))
        {
            return false;
        }

        let snapshot = self.inner.members.borrow().clone();
        let was_member = snapshot.contains(&item_id);
        self.inner.members.send_modify(|members| {
            if was_member {
                members.remove(&item_id);
            } else {
                members.insert(item_id);
            }
        });

        let outcome = if was_member {
            self.inner.api.remove_favorite(item_id, &credential).await
        } else {
            self.inner.api.add_favorite(item_id, &credential).await
        };

        self.inner.pending.send_modify(|pending| {
            pending.remove(&item_id);
        });

        match outcome {
            Ok(_) => true,
            Err(err) => {
                // Exact restore, not a re-flip: other ids may have settled
                // while this call was in flight.
                self.inner.members.send_replace(snapshot);
                self.notify_error(&err, FALLBACK_TOGGLE);
                false
            }
        }
    }

    /// Drop membership and pending flags. Session transitions only.
    pub(crate) fn reset(&self) {
        self.inner.members.send_replace(BTreeSet::new());
        self.inner.pending.send_replace(HashSet::new());
    }
}
