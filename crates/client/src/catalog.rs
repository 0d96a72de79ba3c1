//! Catalog listing with lazy load and wholesale refresh.
//!
//! The catalog is public and read-only, so the store is simpler than the
//! cart: one lazy fetch on first use, an explicit refresh that drops the
//! transport-level cache, and a local search over the loaded items. A
//! failed first load is not retried automatically; the next explicit
//! refresh starts over.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use pagermart_core::ItemId;
use tokio::sync::watch;
use tracing::instrument;

use crate::api::ApiClient;
use crate::api::types::CatalogItem;
use crate::notify::NotificationChannel;

const FALLBACK_LOAD: &str = "Failed to load the catalog.";

/// Locally held catalog listing.
///
/// Cloneable handle; all clones share one listing.
#[derive(Clone)]
pub struct CatalogCache {
    inner: Arc<CatalogCacheInner>,
}

struct CatalogCacheInner {
    api: ApiClient,
    notifier: NotificationChannel,
    items: watch::Sender<Vec<CatalogItem>>,
    loading: AtomicBool,
    // Set once the first load has been attempted, successful or not.
    attempted: AtomicBool,
}

impl CatalogCache {
    pub(crate) fn new(api: ApiClient, notifier: NotificationChannel) -> Self {
        let (items, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(CatalogCacheInner {
                api,
                notifier,
                items,
                loading: AtomicBool::new(false),
                attempted: AtomicBool::new(false),
            }),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Snapshot of the loaded items.
    #[must_use]
    pub fn items(&self) -> Vec<CatalogItem> {
        self.inner.items.borrow().clone()
    }

    /// Look one item up by id.
    #[must_use]
    pub fn get(&self, item_id: ItemId) -> Option<CatalogItem> {
        self.inner
            .items
            .borrow()
            .iter()
            .find(|item| item.id == item_id)
            .cloned()
    }

    /// Case-insensitive name/description filter over the loaded items.
    ///
    /// A blank term returns the whole listing.
    #[must_use]
    pub fn search(&self, term: &str) -> Vec<CatalogItem> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return self.items();
        }
        self.inner
            .items
            .borrow()
            .iter()
            .filter(|item| {
                item.name.to_lowercase().contains(&needle)
                    || item
                        .description
                        .as_deref()
                        .is_some_and(|description| description.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect()
    }

    /// True while a load is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::Acquire)
    }

    /// Subscribe to listing changes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Vec<CatalogItem>> {
        self.inner.items.subscribe()
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Load the catalog on first use.
    ///
    /// Only the first caller fetches; later calls return immediately even
    /// if that attempt failed. An explicit [`refresh`](Self::refresh) is
    /// the way to try again.
    #[instrument(skip(self))]
    pub async fn ensure_loaded(&self) {
        if self
            .inner
            .attempted
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        self.load().await;
    }

    /// Drop the transport cache and refetch the listing.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> bool {
        self.inner.api.invalidate_catalog().await;
        self.inner.attempted.store(true, Ordering::Release);
        self.load().await
    }

    async fn load(&self) -> bool {
        self.inner.loading.store(true, Ordering::Release);
        let outcome = self.inner.api.list_items().await;
        self.inner.loading.store(false, Ordering::Release);

        match outcome {
            Ok(items) => {
                self.inner.items.send_replace(items);
                true
            }
            Err(err) => {
                // A listing we could not load is worse than none at all.
                self.inner.items.send_replace(Vec::new());
                self.inner
                    .notifier
                    .error(err.server_message().unwrap_or(FALLBACK_LOAD));
                false
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::config::ClientConfig;

    fn cache_with_items(items: Vec<CatalogItem>) -> CatalogCache {
        let api = ApiClient::new(&ClientConfig::default()).unwrap();
        let cache = CatalogCache::new(api, NotificationChannel::new());
        cache.inner.items.send_replace(items);
        cache
    }

    fn item(id: i32, name: &str, description: Option<&str>) -> CatalogItem {
        CatalogItem {
            id: ItemId::new(id),
            name: name.to_owned(),
            description: description.map(str::to_owned),
            unit_price: Decimal::new(4999, 2),
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_get_finds_by_id() {
        let cache = cache_with_items(vec![item(1, "Sentinel 40", None), item(2, "Courier X", None)]);

        assert_eq!(cache.get(ItemId::new(2)).unwrap().name, "Courier X");
        assert!(cache.get(ItemId::new(3)).is_none());
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let cache = cache_with_items(vec![
            item(1, "Sentinel 40", Some("Flagship pager")),
            item(2, "Courier X", Some("Entry level")),
        ]);

        let hits = cache.search("SENTINEL");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits.first().unwrap().id, ItemId::new(1));
    }

    #[tokio::test]
    async fn test_search_matches_description() {
        let cache = cache_with_items(vec![
            item(1, "Sentinel 40", Some("Flagship pager")),
            item(2, "Courier X", Some("Entry level")),
        ]);

        let hits = cache.search("entry");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits.first().unwrap().id, ItemId::new(2));
    }

    #[tokio::test]
    async fn test_blank_search_returns_everything() {
        let cache = cache_with_items(vec![item(1, "Sentinel 40", None), item(2, "Courier X", None)]);

        assert_eq!(cache.search("   ").len(), 2);
    }

    #[tokio::test]
    async fn test_fresh_cache_is_empty_and_idle() {
        let api = ApiClient::new(&ClientConfig::default()).unwrap();
        let cache = CatalogCache::new(api, NotificationChannel::new());

        assert!(cache.items().is_empty());
        assert!(!cache.is_loading());
    }
}
