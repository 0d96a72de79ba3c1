//! HTTP client for the shop API.
//!
//! Uses `reqwest` 0.13 with JSON bodies. Every authenticated call carries an
//! HTTP Basic `Authorization` header built from the session's [`Credential`];
//! the catalog listing is cached with `moka` for the configured TTL.
//!
//! Error envelopes: the server reports failures as `{"error": "...", "details": ...}`
//! with a non-success status. [`ApiError::server_message`] surfaces that text
//! so stores can fall back to operation-specific wording when the transport
//! itself failed instead.

pub mod types;

use std::sync::Arc;

use moka::future::Cache;
use pagermart_core::{Credential, ItemId, UnitId, UnitStatus};
use reqwest::{Method, StatusCode, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::config::ClientConfig;
use types::{
    ActivateUnitsRequest, ActivationReport, AddCartItemRequest, CartEntry, CatalogItem,
    CheckoutReceipt, CustomerLoginReply, CustomerLoginRequest, MessageReply, OperatorLoginReply,
    OperatorLoginRequest, RegisterReply, RegisterRequest, SetQuantityRequest, SoldUnit,
};

const CATALOG_CACHE_KEY: &str = "catalog:all";

// =============================================================================
// ApiError
// =============================================================================

/// Errors produced by shop API calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Transport-level failure: connect, DNS, timeout, broken body.
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("{message}")]
    Api {
        status: StatusCode,
        /// Server-supplied error text, or a status-derived generic when the
        /// body carried no envelope.
        message: String,
        details: Option<serde_json::Value>,
    },

    /// A success response carried a body this client could not decode.
    #[error("Invalid response body: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ApiError {
    /// The message the server chose for this failure, if it chose one.
    ///
    /// `None` for transport and decode failures; callers substitute their
    /// own operation-specific fallback wording.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } => Some(message),
            Self::Http(_) | Self::Parse(_) => None,
        }
    }

    /// The HTTP status of a server-reported failure.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(_) | Self::Parse(_) => None,
        }
    }

    /// Build an `Api` error from a non-success response body.
    fn from_response(status: StatusCode, body: &str) -> Self {
        #[derive(serde::Deserialize)]
        struct Envelope {
            error: String,
            #[serde(default)]
            details: Option<serde_json::Value>,
        }

        serde_json::from_str::<Envelope>(body).map_or_else(
            |_| Self::Api {
                status,
                message: format!("HTTP error {status}"),
                details: None,
            },
            |envelope| Self::Api {
                status,
                message: envelope.error,
                details: envelope.details,
            },
        )
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the Pagermart shop API.
///
/// Cheaply cloneable; the catalog listing is cached for the configured TTL,
/// everything else goes straight to the wire.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base_url: String,
    catalog: Cache<String, Vec<CatalogItem>>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;
        let catalog = Cache::builder()
            .max_capacity(1)
            .time_to_live(config.catalog_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                base_url: config.base_url.as_str().trim_end_matches('/').to_owned(),
                catalog,
            }),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.inner.base_url, path.trim_start_matches('/'))
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        credential: Option<&Credential>,
    ) -> reqwest::RequestBuilder {
        let mut builder = self.inner.http.request(method, self.endpoint(path));
        if let Some(credential) = credential {
            builder = builder.header(header::AUTHORIZATION, credential.authorization_header());
        }
        builder
    }

    /// Send a request and decode the reply.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            tracing::debug!(
                status = %status,
                body = %body.chars().take(200).collect::<String>(),
                "Shop API returned non-success status"
            );
            return Err(ApiError::from_response(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse shop API response"
            );
            ApiError::Parse(e)
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        credential: Option<&Credential>,
    ) -> Result<T, ApiError> {
        self.execute(self.request(Method::GET, path, credential))
            .await
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        credential: Option<&Credential>,
    ) -> Result<T, ApiError> {
        self.execute(self.request(method, path, credential).json(body))
            .await
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// List the full catalog.
    ///
    /// Cached for the configured TTL; use [`Self::invalidate_catalog`] to
    /// force the next call through to the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_items(&self) -> Result<Vec<CatalogItem>, ApiError> {
        if let Some(items) = self.inner.catalog.get(CATALOG_CACHE_KEY).await {
            debug!("Cache hit for catalog");
            return Ok(items);
        }

        let items: Vec<CatalogItem> = self.get("shop/items", None).await?;
        self.inner
            .catalog
            .insert(CATALOG_CACHE_KEY.to_owned(), items.clone())
            .await;
        Ok(items)
    }

    /// Drop the cached catalog listing.
    pub async fn invalidate_catalog(&self) {
        self.inner.catalog.invalidate(CATALOG_CACHE_KEY).await;
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// Log a customer in; the identifier may be a username or an email.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or credentials are rejected.
    #[instrument(skip_all, fields(identifier = %identifier))]
    pub async fn login_customer(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<CustomerLoginReply, ApiError> {
        let body = CustomerLoginRequest {
            identifier,
            password,
        };
        self.send_json(Method::POST, "auth/login/customer", &body, None)
            .await
    }

    /// Log an operator in.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or credentials are rejected.
    #[instrument(skip_all, fields(username = %username))]
    pub async fn login_operator(
        &self,
        username: &str,
        password: &str,
    ) -> Result<OperatorLoginReply, ApiError> {
        let body = OperatorLoginRequest { username, password };
        self.send_json(Method::POST, "auth/login/operator", &body, None)
            .await
    }

    /// Register a new customer account.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or validation is rejected.
    #[instrument(skip_all, fields(username = %username))]
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<RegisterReply, ApiError> {
        let body = RegisterRequest {
            username,
            email,
            password,
        };
        self.send_json(Method::POST, "auth/register", &body, None)
            .await
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Fetch the authenticated customer's full cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip_all)]
    pub async fn fetch_cart(&self, credential: &Credential) -> Result<Vec<CartEntry>, ApiError> {
        self.get("shop/cart", Some(credential)).await
    }

    /// Add an item to the cart, or bump its quantity if already present.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip_all, fields(item_id = %item_id, quantity = quantity))]
    pub async fn add_cart_item(
        &self,
        item_id: ItemId,
        quantity: u32,
        credential: &Credential,
    ) -> Result<CartEntry, ApiError> {
        let body = AddCartItemRequest { item_id, quantity };
        self.send_json(Method::POST, "shop/cart/add", &body, Some(credential))
            .await
    }

    /// Set an existing cart entry to an absolute quantity.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the entry does not exist.
    #[instrument(skip_all, fields(item_id = %item_id, quantity = quantity))]
    pub async fn set_cart_quantity(
        &self,
        item_id: ItemId,
        quantity: u32,
        credential: &Credential,
    ) -> Result<CartEntry, ApiError> {
        let body = SetQuantityRequest { quantity };
        self.send_json(
            Method::PUT,
            &format!("shop/cart/item/{item_id}"),
            &body,
            Some(credential),
        )
        .await
    }

    /// Remove a cart entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the entry does not exist.
    #[instrument(skip_all, fields(item_id = %item_id))]
    pub async fn remove_cart_item(
        &self,
        item_id: ItemId,
        credential: &Credential,
    ) -> Result<MessageReply, ApiError> {
        self.execute(self.request(
            Method::DELETE,
            &format!("shop/cart/item/{item_id}"),
            Some(credential),
        ))
        .await
    }

    /// Purchase the entire cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server rejects the
    /// purchase.
    #[instrument(skip_all)]
    pub async fn checkout(&self, credential: &Credential) -> Result<CheckoutReceipt, ApiError> {
        self.execute(self.request(Method::POST, "shop/checkout", Some(credential)))
            .await
    }

    // =========================================================================
    // Favorites
    // =========================================================================

    /// List the item ids the account has favorited.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip_all)]
    pub async fn list_favorites(&self, credential: &Credential) -> Result<Vec<ItemId>, ApiError> {
        self.get("favorites", Some(credential)).await
    }

    /// Mark an item as a favorite.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip_all, fields(item_id = %item_id))]
    pub async fn add_favorite(
        &self,
        item_id: ItemId,
        credential: &Credential,
    ) -> Result<MessageReply, ApiError> {
        self.execute(self.request(
            Method::POST,
            &format!("favorites/{item_id}"),
            Some(credential),
        ))
        .await
    }

    /// Remove an item from the favorites.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the favorite does not exist.
    #[instrument(skip_all, fields(item_id = %item_id))]
    pub async fn remove_favorite(
        &self,
        item_id: ItemId,
        credential: &Credential,
    ) -> Result<MessageReply, ApiError> {
        self.execute(self.request(
            Method::DELETE,
            &format!("favorites/{item_id}"),
            Some(credential),
        ))
        .await
    }

    // =========================================================================
    // Operator console
    // =========================================================================

    /// List sold units, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the credential is not an
    /// operator's.
    #[instrument(skip_all, fields(status = ?status))]
    pub async fn list_sold_units(
        &self,
        status: Option<UnitStatus>,
        credential: &Credential,
    ) -> Result<Vec<SoldUnit>, ApiError> {
        let path = status.map_or_else(
            || "ops/units".to_owned(),
            |status| format!("ops/units?status={status}"),
        );
        self.get(&path, Some(credential)).await
    }

    /// Activate a batch of sold units.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the credential is not an
    /// operator's.
    #[instrument(skip_all, fields(count = unit_ids.len()))]
    pub async fn activate_units(
        &self,
        unit_ids: &[UnitId],
        credential: &Credential,
    ) -> Result<ActivationReport, ApiError> {
        let body = ActivateUnitsRequest { unit_ids };
        self.send_json(Method::POST, "ops/units/activate", &body, Some(credential))
            .await
    }
}
