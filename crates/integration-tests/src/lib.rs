//! End-to-end test support: an in-process stand-in for the shop API.
//!
//! [`TestBackend`] binds a real axum server to an ephemeral port and serves
//! every endpoint the client consumes over seeded in-memory state. Tests
//! reach through it to count requests, inject failures and latency, and
//! inspect the server's own cart and favorites - which is exactly what the
//! reconciliation properties are asserted against.
//!
//! Seeded accounts: customer `nora` / `hunter2`, operator `opal` / `s3cr3t`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::{BTreeSet, HashMap};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use pagermart_client::Shop;
use pagermart_client::config::ClientConfig;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use url::Url;
use uuid::Uuid;

pub const CUSTOMER_USER: &str = "nora";
pub const CUSTOMER_PASSWORD: &str = "hunter2";
pub const CUSTOMER_EMAIL: &str = "nora@example.com";
pub const OPERATOR_USER: &str = "opal";
pub const OPERATOR_PASSWORD: &str = "s3cr3t";

// =============================================================================
// Routes and hit counters
// =============================================================================

/// Every endpoint the mock serves, for per-route request counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Items,
    LoginCustomer,
    LoginOperator,
    Register,
    CartFetch,
    CartAdd,
    CartUpdate,
    CartRemove,
    Checkout,
    FavoritesList,
    FavoritesAdd,
    FavoritesRemove,
    OpsUnits,
    OpsActivate,
}

#[derive(Default)]
struct RouteHits {
    items: AtomicU64,
    login_customer: AtomicU64,
    login_operator: AtomicU64,
    register: AtomicU64,
    cart_fetch: AtomicU64,
    cart_add: AtomicU64,
    cart_update: AtomicU64,
    cart_remove: AtomicU64,
    checkout: AtomicU64,
    favorites_list: AtomicU64,
    favorites_add: AtomicU64,
    favorites_remove: AtomicU64,
    ops_units: AtomicU64,
    ops_activate: AtomicU64,
}

impl RouteHits {
    fn counter(&self, route: Route) -> &AtomicU64 {
        match route {
            Route::Items => &self.items,
            Route::LoginCustomer => &self.login_customer,
            Route::LoginOperator => &self.login_operator,
            Route::Register => &self.register,
            Route::CartFetch => &self.cart_fetch,
            Route::CartAdd => &self.cart_add,
            Route::CartUpdate => &self.cart_update,
            Route::CartRemove => &self.cart_remove,
            Route::Checkout => &self.checkout,
            Route::FavoritesList => &self.favorites_list,
            Route::FavoritesAdd => &self.favorites_add,
            Route::FavoritesRemove => &self.favorites_remove,
            Route::OpsUnits => &self.ops_units,
            Route::OpsActivate => &self.ops_activate,
        }
    }
}

// =============================================================================
// Server-side rows
// =============================================================================

#[derive(Clone)]
struct ItemRow {
    id: i32,
    name: &'static str,
    description: Option<&'static str>,
    unit_price: f64,
    image_url: Option<&'static str>,
}

#[derive(Clone)]
struct CustomerRow {
    id: i32,
    username: String,
    email: String,
    password: String,
}

struct OperatorRow {
    id: i32,
    username: String,
    password: String,
}

#[derive(Clone)]
struct CartRow {
    item_id: i32,
    quantity: u32,
    added_at: DateTime<Utc>,
}

#[derive(Clone)]
struct UnitRow {
    id: Uuid,
    item_id: i32,
    item_name: String,
    purchased_at: DateTime<Utc>,
    status: &'static str,
    customer_id: i32,
}

// =============================================================================
// Backend state
// =============================================================================

struct BackendState {
    items: Vec<ItemRow>,
    customers: Mutex<Vec<CustomerRow>>,
    operator: OperatorRow,
    // Carts and favorites are keyed by username.
    carts: Mutex<HashMap<String, Vec<CartRow>>>,
    favorites: Mutex<HashMap<String, BTreeSet<i32>>>,
    units: Mutex<Vec<UnitRow>>,
    hits: RouteHits,
    total_hits: AtomicU64,
    fail_favorites: AtomicBool,
    cart_delay_ms: AtomicU64,
    cart_in_flight: AtomicU64,
    cart_peak_in_flight: AtomicU64,
}

impl BackendState {
    fn seeded() -> Self {
        Self {
            items: vec![
                ItemRow {
                    id: 1,
                    name: "Sentinel 40",
                    description: Some("Flagship alphanumeric pager"),
                    unit_price: 49.99,
                    image_url: Some("/img/sentinel-40.png"),
                },
                ItemRow {
                    id: 2,
                    name: "Courier 2000",
                    description: Some("Two-way messaging pager"),
                    unit_price: 129.5,
                    image_url: None,
                },
                ItemRow {
                    id: 3,
                    name: "Nightingale Mini",
                    description: Some("Entry level clip pager"),
                    unit_price: 19.99,
                    image_url: Some("/img/nightingale-mini.png"),
                },
            ],
            customers: Mutex::new(vec![CustomerRow {
                id: 1,
                username: CUSTOMER_USER.to_owned(),
                email: CUSTOMER_EMAIL.to_owned(),
                password: CUSTOMER_PASSWORD.to_owned(),
            }]),
            operator: OperatorRow {
                id: 1,
                username: OPERATOR_USER.to_owned(),
                password: OPERATOR_PASSWORD.to_owned(),
            },
            carts: Mutex::new(HashMap::new()),
            favorites: Mutex::new(HashMap::new()),
            units: Mutex::new(Vec::new()),
            hits: RouteHits::default(),
            total_hits: AtomicU64::new(0),
            fail_favorites: AtomicBool::new(false),
            cart_delay_ms: AtomicU64::new(0),
            cart_in_flight: AtomicU64::new(0),
            cart_peak_in_flight: AtomicU64::new(0),
        }
    }

    fn hit(&self, route: Route) {
        self.hits.counter(route).fetch_add(1, Ordering::SeqCst);
        self.total_hits.fetch_add(1, Ordering::SeqCst);
    }

    /// Track one cart request for the concurrency gauge, applying the
    /// injected delay while the slot is held. The guard decrements on drop.
    async fn enter_cart_section(&self) -> CartSection<'_> {
        let now = self.cart_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.cart_peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = self.cart_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        CartSection { state: self }
    }

    async fn authenticate_customer(&self, headers: &HeaderMap) -> Result<CustomerRow, Response> {
        let Some((username, password)) = decode_basic(headers) else {
            return Err(unauthorized());
        };
        let customers = self.customers.lock().await;
        customers
            .iter()
            .find(|c| c.username == username && c.password == password)
            .cloned()
            .ok_or_else(unauthorized)
    }

    async fn authenticate_any(&self, headers: &HeaderMap) -> Result<String, Response> {
        let Some((username, password)) = decode_basic(headers) else {
            return Err(unauthorized());
        };
        if self.operator.username == username && self.operator.password == password {
            return Ok(username);
        }
        let customers = self.customers.lock().await;
        if customers
            .iter()
            .any(|c| c.username == username && c.password == password)
        {
            return Ok(username);
        }
        Err(unauthorized())
    }

    fn authenticate_operator(&self, headers: &HeaderMap) -> Result<(), Response> {
        let Some((username, password)) = decode_basic(headers) else {
            return Err(unauthorized());
        };
        if self.operator.username == username && self.operator.password == password {
            Ok(())
        } else {
            Err(unauthorized())
        }
    }

    fn item(&self, item_id: i32) -> Option<&ItemRow> {
        self.items.iter().find(|item| item.id == item_id)
    }

    fn entry_json(&self, row: &CartRow) -> Option<Value> {
        let item = self.item(row.item_id)?;
        Some(json!({
            "item_id": row.item_id,
            "quantity": row.quantity,
            "added_at": row.added_at,
            "item": item_json(item),
        }))
    }
}

struct CartSection<'a> {
    state: &'a BackendState,
}

impl Drop for CartSection<'_> {
    fn drop(&mut self) {
        self.state.cart_in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

fn decode_basic(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = BASE64.decode(encoded).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (username, password) = text.split_once(':')?;
    Some((username.to_owned(), password.to_owned()))
}

fn unauthorized() -> Response {
    error_response(StatusCode::UNAUTHORIZED, "Authentication required.")
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn item_json(item: &ItemRow) -> Value {
    json!({
        "id": item.id,
        "name": item.name,
        "description": item.description,
        "unit_price": item.unit_price,
        "image_url": item.image_url,
    })
}

fn customer_json(customer: &CustomerRow) -> Value {
    json!({
        "id": customer.id,
        "username": customer.username,
        "email": customer.email,
    })
}

fn unit_json(unit: &UnitRow) -> Value {
    json!({
        "id": unit.id,
        "item_id": unit.item_id,
        "item_name": unit.item_name,
        "purchased_at": unit.purchased_at,
        "status": unit.status,
        "customer_id": unit.customer_id,
    })
}

// =============================================================================
// Request bodies
// =============================================================================

#[derive(Deserialize)]
struct CustomerLoginBody {
    identifier: String,
    password: String,
}

#[derive(Deserialize)]
struct OperatorLoginBody {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct RegisterBody {
    username: String,
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct AddCartBody {
    item_id: i32,
    quantity: u32,
}

#[derive(Deserialize)]
struct SetQuantityBody {
    quantity: u32,
}

#[derive(Deserialize)]
struct ActivateBody {
    unit_ids: Vec<Uuid>,
}

#[derive(Deserialize)]
struct UnitsQuery {
    status: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

async fn list_items(State(state): State<Arc<BackendState>>) -> Response {
    state.hit(Route::Items);
    let items: Vec<Value> = state.items.iter().map(item_json).collect();
    (StatusCode::OK, Json(json!(items))).into_response()
}

async fn login_customer(
    State(state): State<Arc<BackendState>>,
    Json(body): Json<CustomerLoginBody>,
) -> Response {
    state.hit(Route::LoginCustomer);
    let customers = state.customers.lock().await;
    let found = customers.iter().find(|c| {
        (c.username == body.identifier || c.email == body.identifier)
            && c.password == body.password
    });
    match found {
        Some(customer) => (
            StatusCode::OK,
            Json(json!({
                "message": format!("Welcome back, {}!", customer.username),
                "customer": customer_json(customer),
            })),
        )
            .into_response(),
        None => error_response(StatusCode::UNAUTHORIZED, "Invalid username or password."),
    }
}

async fn login_operator(
    State(state): State<Arc<BackendState>>,
    Json(body): Json<OperatorLoginBody>,
) -> Response {
    state.hit(Route::LoginOperator);
    if state.operator.username == body.username && state.operator.password == body.password {
        (
            StatusCode::OK,
            Json(json!({
                "message": "Operator login successful.",
                "operator": { "id": state.operator.id, "username": state.operator.username },
            })),
        )
            .into_response()
    } else {
        error_response(StatusCode::UNAUTHORIZED, "Invalid operator credentials.")
    }
}

async fn register(
    State(state): State<Arc<BackendState>>,
    Json(body): Json<RegisterBody>,
) -> Response {
    state.hit(Route::Register);
    let mut customers = state.customers.lock().await;
    let taken = customers
        .iter()
        .any(|c| c.username == body.username || c.email == body.email);
    if taken {
        return error_response(StatusCode::CONFLICT, "Username or email already exists.");
    }

    let id = i32::try_from(customers.len()).unwrap_or(i32::MAX).saturating_add(1);
    let row = CustomerRow {
        id,
        username: body.username,
        email: body.email,
        password: body.password,
    };
    let reply = (
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration successful. Please log in.",
            "customer": customer_json(&row),
        })),
    )
        .into_response();
    customers.push(row);
    reply
}

async fn fetch_cart(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    state.hit(Route::CartFetch);
    let customer = match state.authenticate_customer(&headers).await {
        Ok(customer) => customer,
        Err(resp) => return resp,
    };
    let _section = state.enter_cart_section().await;

    let carts = state.carts.lock().await;
    let entries: Vec<Value> = carts
        .get(&customer.username)
        .map(|rows| rows.iter().filter_map(|row| state.entry_json(row)).collect())
        .unwrap_or_default();
    (StatusCode::OK, Json(json!(entries))).into_response()
}

async fn add_cart_item(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<AddCartBody>,
) -> Response {
    state.hit(Route::CartAdd);
    let customer = match state.authenticate_customer(&headers).await {
        Ok(customer) => customer,
        Err(resp) => return resp,
    };
    if body.quantity == 0 {
        return error_response(StatusCode::BAD_REQUEST, "Quantity must be at least 1.");
    }
    if state.item(body.item_id).is_none() {
        return error_response(StatusCode::NOT_FOUND, "Item not found.");
    }
    let _section = state.enter_cart_section().await;

    let mut carts = state.carts.lock().await;
    let rows = carts.entry(customer.username).or_default();
    let row = match rows.iter_mut().find(|row| row.item_id == body.item_id) {
        Some(existing) => {
            existing.quantity = existing.quantity.saturating_add(body.quantity);
            existing.clone()
        }
        None => {
            let row = CartRow {
                item_id: body.item_id,
                quantity: body.quantity,
                added_at: Utc::now(),
            };
            rows.push(row.clone());
            row
        }
    };
    match state.entry_json(&row) {
        Some(entry) => (StatusCode::OK, Json(entry)).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Item not found."),
    }
}

async fn update_cart_item(
    State(state): State<Arc<BackendState>>,
    Path(item_id): Path<i32>,
    headers: HeaderMap,
    Json(body): Json<SetQuantityBody>,
) -> Response {
    state.hit(Route::CartUpdate);
    let customer = match state.authenticate_customer(&headers).await {
        Ok(customer) => customer,
        Err(resp) => return resp,
    };
    let _section = state.enter_cart_section().await;

    let mut carts = state.carts.lock().await;
    let row = carts
        .get_mut(&customer.username)
        .and_then(|rows| rows.iter_mut().find(|row| row.item_id == item_id));
    match row {
        Some(row) => {
            row.quantity = body.quantity;
            let row = row.clone();
            match state.entry_json(&row) {
                Some(entry) => (StatusCode::OK, Json(entry)).into_response(),
                None => error_response(StatusCode::NOT_FOUND, "Item not found."),
            }
        }
        None => error_response(StatusCode::NOT_FOUND, "Item not found in cart."),
    }
}

async fn remove_cart_item(
    State(state): State<Arc<BackendState>>,
    Path(item_id): Path<i32>,
    headers: HeaderMap,
) -> Response {
    state.hit(Route::CartRemove);
    let customer = match state.authenticate_customer(&headers).await {
        Ok(customer) => customer,
        Err(resp) => return resp,
    };
    let _section = state.enter_cart_section().await;

    let mut carts = state.carts.lock().await;
    let rows = carts.entry(customer.username).or_default();
    let before = rows.len();
    rows.retain(|row| row.item_id != item_id);
    if rows.len() == before {
        return error_response(StatusCode::NOT_FOUND, "Item not found in cart.");
    }
    (
        StatusCode::OK,
        Json(json!({ "message": "Item removed from cart." })),
    )
        .into_response()
}

async fn checkout(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    state.hit(Route::Checkout);
    let customer = match state.authenticate_customer(&headers).await {
        Ok(customer) => customer,
        Err(resp) => return resp,
    };
    let _section = state.enter_cart_section().await;

    let mut carts = state.carts.lock().await;
    let rows = carts.entry(customer.username).or_default();
    if rows.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Your cart is empty.");
    }

    let mut minted: u32 = 0;
    let mut units = state.units.lock().await;
    for row in rows.drain(..) {
        let Some(item) = state.item(row.item_id) else {
            continue;
        };
        for _ in 0..row.quantity {
            units.push(UnitRow {
                id: Uuid::new_v4(),
                item_id: item.id,
                item_name: item.name.to_owned(),
                purchased_at: Utc::now(),
                status: "active",
                customer_id: customer.id,
            });
            minted = minted.saturating_add(1);
        }
    }

    (
        StatusCode::OK,
        Json(json!({
            "message": format!("Purchase complete! {minted} unit(s) are being prepared."),
            "units_purchased": minted,
        })),
    )
        .into_response()
}

async fn list_favorites(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    state.hit(Route::FavoritesList);
    let username = match state.authenticate_any(&headers).await {
        Ok(username) => username,
        Err(resp) => return resp,
    };
    let favorites = state.favorites.lock().await;
    let ids: Vec<i32> = favorites
        .get(&username)
        .map(|set| set.iter().copied().collect())
        .unwrap_or_default();
    (StatusCode::OK, Json(json!(ids))).into_response()
}

async fn add_favorite(
    State(state): State<Arc<BackendState>>,
    Path(item_id): Path<i32>,
    headers: HeaderMap,
) -> Response {
    state.hit(Route::FavoritesAdd);
    let username = match state.authenticate_any(&headers).await {
        Ok(username) => username,
        Err(resp) => return resp,
    };
    if state.fail_favorites.load(Ordering::SeqCst) {
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Favorites are temporarily unavailable.",
        );
    }
    if state.item(item_id).is_none() {
        return error_response(StatusCode::NOT_FOUND, "Item not found.");
    }
    let mut favorites = state.favorites.lock().await;
    favorites.entry(username).or_default().insert(item_id);
    (
        StatusCode::OK,
        Json(json!({ "message": "Added to favorites." })),
    )
        .into_response()
}

async fn remove_favorite(
    State(state): State<Arc<BackendState>>,
    Path(item_id): Path<i32>,
    headers: HeaderMap,
) -> Response {
    state.hit(Route::FavoritesRemove);
    let username = match state.authenticate_any(&headers).await {
        Ok(username) => username,
        Err(resp) => return resp,
    };
    if state.fail_favorites.load(Ordering::SeqCst) {
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Favorites are temporarily unavailable.",
        );
    }
    let mut favorites = state.favorites.lock().await;
    favorites.entry(username).or_default().remove(&item_id);
    (
        StatusCode::OK,
        Json(json!({ "message": "Removed from favorites." })),
    )
        .into_response()
}

async fn list_units(
    State(state): State<Arc<BackendState>>,
    Query(query): Query<UnitsQuery>,
    headers: HeaderMap,
) -> Response {
    state.hit(Route::OpsUnits);
    if let Err(resp) = state.authenticate_operator(&headers) {
        return resp;
    }
    let units = state.units.lock().await;
    let listed: Vec<Value> = units
        .iter()
        .filter(|unit| {
            query
                .status
                .as_deref()
                .is_none_or(|status| unit.status == status)
        })
        .map(unit_json)
        .collect();
    (StatusCode::OK, Json(json!(listed))).into_response()
}

async fn activate_units(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<ActivateBody>,
) -> Response {
    state.hit(Route::OpsActivate);
    if let Err(resp) = state.authenticate_operator(&headers) {
        return resp;
    }

    let mut units = state.units.lock().await;
    let mut activated: Vec<Uuid> = Vec::new();
    let mut errors: Vec<String> = Vec::new();
    for id in body.unit_ids {
        match units.iter_mut().find(|unit| unit.id == id) {
            None => errors.push(format!("Unit {id} not found.")),
            Some(unit) if unit.status == "activated" => {
                errors.push(format!("Unit {id} is already activated."));
            }
            Some(unit) => {
                unit.status = "activated";
                activated.push(id);
            }
        }
    }

    // Real servers in this family send `errors: null` when there were none.
    let errors_value = if errors.is_empty() {
        Value::Null
    } else {
        json!(errors)
    };
    (
        StatusCode::OK,
        Json(json!({
            "message": format!("Activation process completed. {} unit(s) activated.", activated.len()),
            "activated_ids": activated,
            "errors": errors_value,
        })),
    )
        .into_response()
}

fn router(state: Arc<BackendState>) -> Router {
    Router::new()
        .route("/api/shop/items", get(list_items))
        .route("/api/auth/login/customer", post(login_customer))
        .route("/api/auth/login/operator", post(login_operator))
        .route("/api/auth/register", post(register))
        .route("/api/shop/cart", get(fetch_cart))
        .route("/api/shop/cart/add", post(add_cart_item))
        .route(
            "/api/shop/cart/item/{item_id}",
            put(update_cart_item).delete(remove_cart_item),
        )
        .route("/api/shop/checkout", post(checkout))
        .route("/api/favorites", get(list_favorites))
        .route(
            "/api/favorites/{item_id}",
            post(add_favorite).delete(remove_favorite),
        )
        .route("/api/ops/units", get(list_units))
        .route("/api/ops/units/activate", post(activate_units))
        .with_state(state)
}

// =============================================================================
// TestBackend
// =============================================================================

/// A live mock shop API plus handles into its state.
///
/// The server task is aborted when the backend drops.
pub struct TestBackend {
    addr: SocketAddr,
    state: Arc<BackendState>,
    server: JoinHandle<()>,
}

impl TestBackend {
    /// Bind an ephemeral port and start serving.
    pub async fn spawn() -> Self {
        let state = Arc::new(BackendState::seeded());
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("listener address");
        let app = router(Arc::clone(&state));
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve mock API");
        });
        Self {
            addr,
            state,
            server,
        }
    }

    /// Base URL the client should be pointed at, `/api` prefix included.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// A client configuration aimed at this backend.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            base_url: Url::parse(&self.base_url()).expect("mock base URL is valid"),
            http_timeout: Duration::from_secs(5),
            catalog_ttl: Duration::from_secs(300),
        }
    }

    /// A fully wired client aimed at this backend.
    #[must_use]
    pub fn shop(&self) -> Shop {
        Shop::new(&self.config()).expect("client construction succeeds")
    }

    /// Requests served on one route so far.
    #[must_use]
    pub fn hits(&self, route: Route) -> u64 {
        self.state.hits.counter(route).load(Ordering::SeqCst)
    }

    /// Requests served across all routes so far.
    #[must_use]
    pub fn total_hits(&self) -> u64 {
        self.state.total_hits.load(Ordering::SeqCst)
    }

    /// Make favorites mutations fail with HTTP 500 until turned off.
    pub fn set_fail_favorites(&self, fail: bool) {
        self.state.fail_favorites.store(fail, Ordering::SeqCst);
    }

    /// Hold every cart request open for `delay` before serving it.
    pub fn set_cart_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.state.cart_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// The most cart requests ever in flight at once.
    #[must_use]
    pub fn max_cart_concurrency(&self) -> u64 {
        self.state.cart_peak_in_flight.load(Ordering::SeqCst)
    }

    /// The server's own cart for a customer, as `(item_id, quantity)` pairs.
    pub async fn cart_snapshot(&self, username: &str) -> Vec<(i32, u32)> {
        let carts = self.state.carts.lock().await;
        carts
            .get(username)
            .map(|rows| rows.iter().map(|row| (row.item_id, row.quantity)).collect())
            .unwrap_or_default()
    }

    /// The server's own favorites for an account, sorted.
    pub async fn favorites_snapshot(&self, username: &str) -> Vec<i32> {
        let favorites = self.state.favorites.lock().await;
        favorites
            .get(username)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Put a line in a customer's server-side cart directly.
    pub async fn seed_cart(&self, username: &str, item_id: i32, quantity: u32) {
        let mut carts = self.state.carts.lock().await;
        carts.entry(username.to_owned()).or_default().push(CartRow {
            item_id,
            quantity,
            added_at: Utc::now(),
        });
    }

    /// Put an id in an account's server-side favorites directly.
    pub async fn seed_favorite(&self, username: &str, item_id: i32) {
        let mut favorites = self.state.favorites.lock().await;
        favorites.entry(username.to_owned()).or_default().insert(item_id);
    }

    /// Ids of every unit sold so far, in mint order.
    pub async fn sold_unit_ids(&self) -> Vec<Uuid> {
        let units = self.state.units.lock().await;
        units.iter().map(|unit| unit.id).collect()
    }
}

impl Drop for TestBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}
