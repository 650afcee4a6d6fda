//! Integration test support for Duodude.
//!
//! [`MockBackend`] is an in-process `axum` server implementing the backend
//! endpoints the storefront clients talk to: catalog, profile and saved
//! addresses, cart, orders and returns, and back-office hero slides. Each test starts its own backend on
//! an ephemeral port.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p duodude-integration-tests
//! ```
//!
//! # Seed data
//!
//! - Products `tee` (sizes S/M/L, featured), `hoodie` (sizes M/L, new),
//!   `cap` (no sizes, featured)
//! - [`SHOPPER_TOKEN`] signs in as [`shopper`], [`ADMIN_TOKEN`] as [`admin`]
//! - The shopper has one saved home address, `a-home`

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post, put};
use axum::{Json, Router};
use duodude_core::{
    AddressId, AddressKind, HeroSlide, Order, OrderId, OrderItem, OrderStatus, Product,
    ProductId, ProductRef, ReturnRequest, SavedAddress, ShippingAddress, SlideDraft, SlideId,
    User, UserId, UserRole,
};
use duodude_storefront::api::ApiClient;
use duodude_storefront::config::ApiConfig;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Credential of the seeded shopper.
pub const SHOPPER_TOKEN: &str = "shopper-token";

/// Credential of the seeded administrator.
pub const ADMIN_TOKEN: &str = "admin-token";

/// The seeded shopper profile.
#[must_use]
pub fn shopper() -> User {
    User {
        id: UserId::new("u-shopper"),
        name: "Asha".to_string(),
        email: "asha@example.com".to_string(),
        role: UserRole::User,
        created_at: None,
        addresses: vec![SavedAddress {
            id: Some(AddressId::new("a-home")),
            kind: AddressKind::Home,
            street: "12 MG Road".to_string(),
            city: "Pune".to_string(),
            state: "Maharashtra".to_string(),
            zip_code: "411001".to_string(),
            country: "India".to_string(),
            is_default: true,
        }],
    }
}

/// The seeded administrator profile.
#[must_use]
pub fn admin() -> User {
    User {
        id: UserId::new("u-admin"),
        name: "Ravi".to_string(),
        email: "ravi@duodude.in".to_string(),
        role: UserRole::Admin,
        created_at: None,
        addresses: Vec::new(),
    }
}

/// A cart line as the backend stores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredLine {
    pub product: String,
    pub quantity: u32,
    pub size: Option<String>,
}

impl StoredLine {
    #[must_use]
    pub fn new(product: &str, quantity: u32, size: Option<&str>) -> Self {
        Self {
            product: product.to_string(),
            quantity,
            size: size.map(String::from),
        }
    }
}

#[derive(Default)]
struct Backend {
    products: Vec<Product>,
    users: Vec<User>,
    /// Token to user id.
    sessions: HashMap<String, String>,
    /// User id to the last password set.
    passwords: HashMap<String, String>,
    /// User id to cart lines.
    carts: HashMap<String, Vec<StoredLine>>,
    /// Owner user id and order.
    orders: Vec<(String, Order)>,
    /// Requester user id and request.
    returns: Vec<(String, ReturnRequest)>,
    next_address: usize,
    slides: Vec<HeroSlide>,
    next_slide: usize,
    fail_clear: bool,
    /// Adds still accepted before `POST /api/cart` fails; `None` never fails.
    adds_left: Option<usize>,
    fail_cart_reads: bool,
    /// `"METHOD /path"` for every request received.
    requests: Vec<String>,
}

impl Backend {
    fn seeded() -> Self {
        let mut tee = product("tee", "Classic Tee", Decimal::new(1999, 2), "tshirts");
        tee.sizes = vec!["S".into(), "M".into(), "L".into()];
        tee.featured = true;

        let mut hoodie = product("hoodie", "Oversized Hoodie", Decimal::new(49, 0), "hoodies");
        hoodie.sizes = vec!["M".into(), "L".into()];
        hoodie.is_new = true;

        let mut cap = product("cap", "Dad Cap", Decimal::new(15, 0), "accessories");
        cap.featured = true;

        let users = vec![shopper(), admin()];
        let sessions = users
            .iter()
            .zip([SHOPPER_TOKEN, ADMIN_TOKEN])
            .map(|(user, token)| (token.to_string(), user.id.as_str().to_string()))
            .collect();

        Self {
            products: vec![tee, hoodie, cap],
            users,
            sessions,
            ..Self::default()
        }
    }

    fn user_mut(&mut self, id: &UserId) -> Result<&mut User, ApiError> {
        self.users
            .iter_mut()
            .find(|u| &u.id == id)
            .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "User not found"))
    }

    fn product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id.as_str() == id)
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<User, ApiError> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::new(StatusCode::UNAUTHORIZED, "Not authorized, no token"))?;

        self.sessions
            .get(token)
            .and_then(|id| self.users.iter().find(|u| u.id.as_str() == id))
            .cloned()
            .ok_or_else(|| ApiError::new(StatusCode::UNAUTHORIZED, "Not authorized, token failed"))
    }

    fn authorize_admin(&self, headers: &HeaderMap) -> Result<User, ApiError> {
        let user = self.authorize(headers)?;
        if !user.is_admin() {
            return Err(ApiError::new(StatusCode::FORBIDDEN, "Not authorized as an admin"));
        }
        Ok(user)
    }

    fn cart_json(&self, user_id: &str) -> Value {
        let items: Vec<Value> = self
            .carts
            .get(user_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|line| {
                let product = self
                    .product(&line.product)
                    .map_or_else(|| json!(line.product), |p| json!(p));
                json!({"product": product, "quantity": line.quantity, "size": line.size})
            })
            .collect();
        json!({ "items": items })
    }
}

fn product(id: &str, name: &str, price: Decimal, category: &str) -> Product {
    let mut product = Product::reference(ProductId::new(id));
    product.name = name.to_string();
    product.price = price;
    product.category = category.to_string();
    product.images = vec![format!("https://cdn.duodude.in/{id}.jpg")];
    product.stock = Some(25);
    product
}

type Shared = Arc<Mutex<Backend>>;

fn lock(state: &Shared) -> MutexGuard<'_, Backend> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// MockBackend
// =============================================================================

/// An in-process backend listening on `127.0.0.1` with an ephemeral port.
///
/// The server stops when the value is dropped.
pub struct MockBackend {
    addr: SocketAddr,
    state: Shared,
    server: JoinHandle<()>,
}

impl MockBackend {
    /// Start a backend with the seed data.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(Backend::seeded()));
        let app = router(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock backend");
        let addr = listener.local_addr().expect("Mock backend has no address");

        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Mock backend stopped");
        });

        Self {
            addr,
            state,
            server,
        }
    }

    /// Base URL of the backend, without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client configuration pointing at this backend.
    ///
    /// # Panics
    ///
    /// Never in practice: the base URL is always valid.
    #[must_use]
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig::new(&self.base_url(), Duration::from_secs(5)).expect("Mock base URL is valid")
    }

    /// A shared API client for this backend.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn api(&self) -> ApiClient {
        ApiClient::new(&self.api_config()).expect("Failed to build API client")
    }

    /// Lines the backend holds for a user.
    #[must_use]
    pub fn cart_of(&self, user: &User) -> Vec<StoredLine> {
        lock(&self.state)
            .carts
            .get(user.id.as_str())
            .cloned()
            .unwrap_or_default()
    }

    /// Put a line straight into a user's backend cart.
    pub fn seed_cart(&self, user: &User, line: StoredLine) {
        lock(&self.state)
            .carts
            .entry(user.id.as_str().to_string())
            .or_default()
            .push(line);
    }

    /// Make `DELETE /api/cart` fail with a 500.
    pub fn set_fail_clear(&self, fail: bool) {
        lock(&self.state).fail_clear = fail;
    }

    /// Make `POST /api/cart` fail with a 500.
    pub fn set_fail_adds(&self, fail: bool) {
        self.fail_adds_after(fail.then_some(0));
    }

    /// Accept `count` more adds, then fail every further one with a 500.
    pub fn fail_adds_after(&self, count: Option<usize>) {
        lock(&self.state).adds_left = count;
    }

    /// Make `GET /api/cart` fail with a 500.
    pub fn set_fail_cart_reads(&self, fail: bool) {
        lock(&self.state).fail_cart_reads = fail;
    }

    /// Move an order along its lifecycle, as the back office would.
    pub fn set_order_status(&self, id: &OrderId, status: OrderStatus) {
        if let Some((_, order)) = lock(&self.state)
            .orders
            .iter_mut()
            .find(|(_, order)| &order.id == id)
        {
            order.status = status;
        }
    }

    /// Return requests a user has filed.
    #[must_use]
    pub fn returns_of(&self, user: &User) -> Vec<ReturnRequest> {
        lock(&self.state)
            .returns
            .iter()
            .filter(|(owner, _)| owner == user.id.as_str())
            .map(|(_, request)| request.clone())
            .collect()
    }

    /// The password last set for a user through the profile endpoint.
    #[must_use]
    pub fn password_of(&self, user: &User) -> Option<String> {
        lock(&self.state).passwords.get(user.id.as_str()).cloned()
    }

    /// Invalidate a credential, as if it expired.
    pub fn revoke(&self, token: &str) {
        lock(&self.state).sessions.remove(token);
    }

    /// Slides as the backend stores them.
    #[must_use]
    pub fn slides(&self) -> Vec<HeroSlide> {
        lock(&self.state).slides.clone()
    }

    /// Number of requests received matching `"METHOD /path"`.
    #[must_use]
    pub fn request_count(&self, request: &str) -> usize {
        lock(&self.state)
            .requests
            .iter()
            .filter(|r| r.as_str() == request)
            .count()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/api/products", get(list_products))
        .route("/api/products/{id}", get(get_product))
        .route("/api/featured-products", get(featured_products))
        .route("/api/users", get(all_users))
        .route("/api/users/me", get(me).put(update_profile))
        .route("/api/users/me/addresses", post(add_address))
        .route(
            "/api/users/me/addresses/{id}",
            put(update_address).delete(delete_address),
        )
        .route(
            "/api/cart",
            get(get_cart).post(add_to_cart).delete(clear_cart),
        )
        .route("/api/cart/{product_id}", delete(remove_from_cart))
        .route("/api/cart/{product_id}/quantity", post(set_cart_quantity))
        .route("/api/orders", get(all_orders).post(place_order))
        .route("/api/orders/myorders", get(my_orders))
        .route("/api/orders/{id}/cancel", put(cancel_order))
        .route("/api/returns", post(request_return))
        .route("/api/hero-slides/admin", post(create_slide))
        .route("/api/hero-slides/admin/all", get(all_slides))
        .route(
            "/api/hero-slides/admin/{id}",
            put(update_slide).delete(delete_slide),
        )
        .route("/api/hero-slides/admin/{id}/toggle", patch(toggle_slide))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            log_request,
        ))
        .with_state(state)
}

async fn log_request(State(state): State<Shared>, request: Request, next: Next) -> Response {
    let entry = format!("{} {}", request.method(), request.uri().path());
    lock(&state).requests.push(entry);
    next.run(request).await
}

// =============================================================================
// Errors
// =============================================================================

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

// =============================================================================
// Catalog
// =============================================================================

async fn list_products(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let backend = lock(&state);
    let mut products: Vec<Product> = backend
        .products
        .iter()
        .filter(|p| params.get("category").is_none_or(|c| &p.category == c))
        .cloned()
        .collect();

    // Seed order is creation order
    if params.get("sort").is_some_and(|s| s == "createdAt") {
        products.reverse();
    }
    if let Some(limit) = params.get("limit").and_then(|l| l.parse().ok()) {
        products.truncate(limit);
    }

    Json(json!({ "products": products }))
}

async fn featured_products(State(state): State<Shared>) -> Json<Vec<Product>> {
    let backend = lock(&state);
    Json(
        backend
            .products
            .iter()
            .filter(|p| p.featured)
            .cloned()
            .collect(),
    )
}

async fn get_product(
    State(state): State<Shared>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    lock(&state)
        .product(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "Product not found"))
}

// =============================================================================
// Users
// =============================================================================

#[derive(Deserialize)]
struct UpdateProfile {
    name: String,
    email: String,
    password: Option<String>,
}

async fn me(State(state): State<Shared>, headers: HeaderMap) -> Result<Json<User>, ApiError> {
    lock(&state).authorize(&headers).map(Json)
}

async fn all_users(
    State(state): State<Shared>,
    headers: HeaderMap,
) -> Result<Json<Vec<User>>, ApiError> {
    let backend = lock(&state);
    backend.authorize_admin(&headers)?;
    Ok(Json(backend.users.clone()))
}

async fn update_profile(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<UpdateProfile>,
) -> Result<Json<User>, ApiError> {
    let mut backend = lock(&state);
    let user = backend.authorize(&headers)?;

    if backend
        .users
        .iter()
        .any(|u| u.id != user.id && u.email == body.email)
    {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Email already in use"));
    }
    if let Some(password) = body.password {
        if password.len() < 6 {
            return Err(ApiError::new(
                StatusCode::BAD_REQUEST,
                "Password must be at least 6 characters",
            ));
        }
        backend
            .passwords
            .insert(user.id.as_str().to_string(), password);
    }

    let profile = backend.user_mut(&user.id)?;
    profile.name = body.name;
    profile.email = body.email;
    Ok(Json(profile.clone()))
}

async fn add_address(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(mut address): Json<SavedAddress>,
) -> Result<Json<User>, ApiError> {
    let mut backend = lock(&state);
    let user = backend.authorize(&headers)?;

    backend.next_address += 1;
    address.id = Some(AddressId::new(format!("a{}", backend.next_address)));

    let profile = backend.user_mut(&user.id)?;
    save_address(profile, address);
    Ok(Json(profile.clone()))
}

async fn update_address(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(mut address): Json<SavedAddress>,
) -> Result<Json<User>, ApiError> {
    let mut backend = lock(&state);
    let user = backend.authorize(&headers)?;
    let profile = backend.user_mut(&user.id)?;

    let id = AddressId::new(id);
    let index = profile
        .addresses
        .iter()
        .position(|a| a.id.as_ref() == Some(&id))
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "Address not found"))?;
    profile.addresses.remove(index);
    address.id = Some(id);
    save_address(profile, address);
    Ok(Json(profile.clone()))
}

async fn delete_address(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let mut backend = lock(&state);
    let user = backend.authorize(&headers)?;
    let profile = backend.user_mut(&user.id)?;

    let before = profile.addresses.len();
    profile
        .addresses
        .retain(|a| a.id.as_ref().is_none_or(|saved| saved.as_str() != id));
    if profile.addresses.len() == before {
        return Err(ApiError::new(StatusCode::NOT_FOUND, "Address not found"));
    }
    Ok(Json(profile.clone()))
}

/// Append an address; a new default replaces the previous one.
fn save_address(profile: &mut User, address: SavedAddress) {
    if address.is_default {
        for existing in &mut profile.addresses {
            existing.is_default = false;
        }
    }
    profile.addresses.push(address);
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddToCart {
    product_id: String,
    quantity: u32,
    size: Option<String>,
}

#[derive(Deserialize)]
struct SetQuantity {
    quantity: u32,
    size: Option<String>,
}

async fn get_cart(State(state): State<Shared>, headers: HeaderMap) -> Result<Json<Value>, ApiError> {
    let backend = lock(&state);
    let user = backend.authorize(&headers)?;
    if backend.fail_cart_reads {
        return Err(ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Server error"));
    }
    Ok(Json(backend.cart_json(user.id.as_str())))
}

async fn add_to_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<AddToCart>,
) -> Result<Json<Value>, ApiError> {
    let mut backend = lock(&state);
    let user = backend.authorize(&headers)?;

    match backend.adds_left {
        Some(0) => {
            return Err(ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Server error"));
        }
        Some(left) => backend.adds_left = Some(left - 1),
        None => {}
    }
    if body.quantity == 0 {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Quantity must be at least 1"));
    }
    if backend.product(&body.product_id).is_none() {
        return Err(ApiError::new(StatusCode::NOT_FOUND, "Product not found"));
    }

    let lines = backend
        .carts
        .entry(user.id.as_str().to_string())
        .or_default();
    match lines
        .iter_mut()
        .find(|l| l.product == body.product_id && l.size == body.size)
    {
        Some(line) => line.quantity += body.quantity,
        None => lines.push(StoredLine {
            product: body.product_id,
            quantity: body.quantity,
            size: body.size,
        }),
    }

    Ok(Json(backend.cart_json(user.id.as_str())))
}

async fn remove_from_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(product_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let mut backend = lock(&state);
    let user = backend.authorize(&headers)?;
    if let Some(lines) = backend.carts.get_mut(user.id.as_str()) {
        lines.retain(|l| l.product != product_id);
    }
    Ok(Json(json!({ "message": "Item removed from cart" })))
}

async fn set_cart_quantity(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(product_id): Path<String>,
    Json(body): Json<SetQuantity>,
) -> Result<Json<Value>, ApiError> {
    let mut backend = lock(&state);
    let user = backend.authorize(&headers)?;

    if body.quantity == 0 {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Quantity must be at least 1"));
    }
    let line = backend
        .carts
        .get_mut(user.id.as_str())
        .and_then(|lines| {
            lines
                .iter_mut()
                .find(|l| l.product == product_id && l.size == body.size)
        })
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "Item not found in cart"))?;
    line.quantity = body.quantity;

    Ok(Json(backend.cart_json(user.id.as_str())))
}

async fn clear_cart(State(state): State<Shared>, headers: HeaderMap) -> Result<Json<Value>, ApiError> {
    let mut backend = lock(&state);
    let user = backend.authorize(&headers)?;
    if backend.fail_clear {
        return Err(ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Server error"));
    }
    backend.carts.remove(user.id.as_str());
    Ok(Json(json!({ "message": "Cart cleared" })))
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaceOrder {
    items: Vec<PlaceOrderItem>,
    total: f64,
    shipping_address: ShippingAddress,
    payment_method: String,
}

#[derive(Deserialize)]
struct PlaceOrderItem {
    product: String,
    quantity: u32,
    size: Option<String>,
}

async fn my_orders(
    State(state): State<Shared>,
    headers: HeaderMap,
) -> Result<Json<Vec<Order>>, ApiError> {
    let backend = lock(&state);
    let user = backend.authorize(&headers)?;
    Ok(Json(
        backend
            .orders
            .iter()
            .filter(|(owner, _)| owner == user.id.as_str())
            .map(|(_, order)| order.clone())
            .collect(),
    ))
}

async fn all_orders(
    State(state): State<Shared>,
    headers: HeaderMap,
) -> Result<Json<Vec<Order>>, ApiError> {
    let backend = lock(&state);
    backend.authorize_admin(&headers)?;
    Ok(Json(
        backend
            .orders
            .iter()
            .map(|(_, order)| order.clone())
            .collect(),
    ))
}

async fn place_order(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<PlaceOrder>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let mut backend = lock(&state);
    let user = backend.authorize(&headers)?;

    if body.items.is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "No order items"));
    }
    if body.payment_method != "cod" {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Unsupported payment method"));
    }

    let items = body
        .items
        .into_iter()
        .map(|item| OrderItem {
            product: backend.product(&item.product).map_or_else(
                || ProductRef::Id(ProductId::new(&item.product)),
                |p| ProductRef::Populated(Box::new(p.clone())),
            ),
            quantity: item.quantity,
            size: item.size,
        })
        .collect();

    let order = Order {
        id: OrderId::new(format!("o{}", backend.orders.len() + 1)),
        items,
        total: Decimal::try_from(body.total)
            .map_err(|_| ApiError::new(StatusCode::BAD_REQUEST, "Invalid total"))?
            .round_dp(2),
        status: OrderStatus::Pending,
        created_at: None,
        shipping_address: Some(body.shipping_address),
    };

    backend
        .orders
        .push((user.id.as_str().to_string(), order.clone()));
    Ok((StatusCode::CREATED, Json(order)))
}

async fn cancel_order(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let mut backend = lock(&state);
    let user = backend.authorize(&headers)?;

    let (_, order) = backend
        .orders
        .iter_mut()
        .find(|(owner, order)| {
            order.id.as_str() == id && (owner == user.id.as_str() || user.is_admin())
        })
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "Order not found"))?;

    if !order.status.is_cancellable() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Order cannot be cancelled"));
    }
    order.status = OrderStatus::Cancelled;
    Ok(Json(order.clone()))
}

async fn request_return(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<ReturnRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut backend = lock(&state);
    let user = backend.authorize(&headers)?;

    let (_, order) = backend
        .orders
        .iter()
        .find(|(owner, order)| order.id == body.order_id && owner == user.id.as_str())
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "Order not found"))?;
    if order.status != OrderStatus::Delivered {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Only delivered orders can be returned",
        ));
    }
    if body.items.is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "No items to return"));
    }

    backend
        .returns
        .push((user.id.as_str().to_string(), body));
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Return request submitted", "status": "pending" })),
    ))
}

// =============================================================================
// Hero Slides
// =============================================================================

fn slide_from_draft(id: SlideId, draft: SlideDraft) -> HeroSlide {
    HeroSlide {
        id,
        title: draft.title,
        subtitle: draft.subtitle,
        description: Some(draft.description),
        image: draft.image,
        button_text: Some(draft.button_text),
        button_link: Some(draft.button_link),
        secondary_button_text: Some(draft.secondary_button_text),
        secondary_button_link: Some(draft.secondary_button_link),
        background_color: Some(draft.background_color),
        text_color: Some(draft.text_color),
        overlay_opacity: Some(draft.overlay_opacity),
        order: draft.order,
        is_active: true,
    }
}

fn slide_mut<'a>(backend: &'a mut Backend, id: &str) -> Result<&'a mut HeroSlide, ApiError> {
    backend
        .slides
        .iter_mut()
        .find(|slide| slide.id.as_str() == id)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "Slide not found"))
}

async fn all_slides(
    State(state): State<Shared>,
    headers: HeaderMap,
) -> Result<Json<Vec<HeroSlide>>, ApiError> {
    let backend = lock(&state);
    backend.authorize_admin(&headers)?;
    Ok(Json(backend.slides.clone()))
}

async fn create_slide(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(draft): Json<SlideDraft>,
) -> Result<(StatusCode, Json<HeroSlide>), ApiError> {
    let mut backend = lock(&state);
    backend.authorize_admin(&headers)?;

    backend.next_slide += 1;
    let slide = slide_from_draft(SlideId::new(format!("s{}", backend.next_slide)), draft);
    backend.slides.push(slide.clone());
    Ok((StatusCode::CREATED, Json(slide)))
}

/// Fields present in the body replace the stored ones.
async fn update_slide(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<HeroSlide>, ApiError> {
    let mut backend = lock(&state);
    backend.authorize_admin(&headers)?;
    let slide = slide_mut(&mut backend, &id)?;

    let invalid = |e: serde_json::Error| ApiError::new(StatusCode::BAD_REQUEST, e.to_string());
    let mut merged = serde_json::to_value(&*slide).map_err(invalid)?;
    if let (Some(target), Some(changes)) = (merged.as_object_mut(), body.as_object()) {
        for (field, value) in changes {
            if field != "_id" {
                target.insert(field.clone(), value.clone());
            }
        }
    }
    *slide = serde_json::from_value(merged).map_err(invalid)?;
    Ok(Json(slide.clone()))
}

async fn toggle_slide(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<HeroSlide>, ApiError> {
    let mut backend = lock(&state);
    backend.authorize_admin(&headers)?;
    let slide = slide_mut(&mut backend, &id)?;
    slide.is_active = !slide.is_active;
    Ok(Json(slide.clone()))
}

async fn delete_slide(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let mut backend = lock(&state);
    backend.authorize_admin(&headers)?;
    slide_mut(&mut backend, &id)?;
    backend.slides.retain(|slide| slide.id.as_str() != id);
    Ok(Json(json!({ "message": "Slide deleted" })))
}
