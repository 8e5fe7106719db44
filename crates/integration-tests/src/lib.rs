//! Integration test harness for the wearables storefront.
//!
//! [`FakeBackend`] serves the cart and session REST API from memory on an
//! ephemeral port, with the server-side semantics the storefront relies on:
//! one line per product, add increments, merge sums quantities.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p wearables-integration-tests
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use tempfile::TempDir;
use wearables_core::{CartId, ProductId, UserId};
use wearables_storefront::Storefront;
use wearables_storefront::backend::{ApiCart, ApiUser, CartLine};
use wearables_storefront::config::{ConfigError, StorefrontConfig};

type HandlerError = (StatusCode, String);

#[derive(Default)]
struct FakeState {
    catalog: HashMap<ProductId, (String, Decimal)>,
    carts: HashMap<UserId, (CartId, Vec<CartLine>)>,
    next_cart_id: i32,
    user: Option<ApiUser>,
    failure: Option<StatusCode>,
    requests: Vec<String>,
}

impl FakeState {
    fn record(&mut self, request: String) -> Result<(), HandlerError> {
        self.requests.push(request);
        match self.failure {
            Some(status) => Err((status, "injected failure".to_string())),
            None => Ok(()),
        }
    }

    fn cart_for_user(&mut self, user_id: UserId) -> CartId {
        if let Some((cart_id, _)) = self.carts.get(&user_id) {
            return *cart_id;
        }
        self.next_cart_id += 1;
        let cart_id = CartId::new(self.next_cart_id);
        self.carts.insert(user_id, (cart_id, Vec::new()));
        cart_id
    }

    fn lines_mut(&mut self, cart_id: CartId) -> Result<&mut Vec<CartLine>, HandlerError> {
        self.carts
            .values_mut()
            .find(|(id, _)| *id == cart_id)
            .map(|(_, lines)| lines)
            .ok_or((StatusCode::NOT_FOUND, format!("cart {cart_id} not found")))
    }

    fn api_cart(&self, cart_id: CartId) -> ApiCart {
        let items = self
            .carts
            .values()
            .find(|(id, _)| *id == cart_id)
            .map(|(_, lines)| lines.clone())
            .unwrap_or_default();
        ApiCart {
            cart_id: Some(cart_id),
            items,
        }
    }

    fn catalog_line(&self, product_id: ProductId, quantity: i64) -> Result<CartLine, HandlerError> {
        let (name, price) = self.catalog.get(&product_id).ok_or((
            StatusCode::NOT_FOUND,
            format!("product {product_id} not found"),
        ))?;
        Ok(CartLine {
            product_id,
            name: name.clone(),
            price: *price,
            image: format!("/img/{product_id}.png"),
            quantity,
        })
    }
}

fn add_line(lines: &mut Vec<CartLine>, incoming: CartLine) {
    match lines.iter_mut().find(|l| l.product_id == incoming.product_id) {
        Some(existing) => existing.quantity += incoming.quantity,
        None => lines.push(incoming),
    }
}

type Shared = Arc<Mutex<FakeState>>;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemQuery {
    product_id: ProductId,
    quantity: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MergeQuery {
    user_id: UserId,
}

async fn get_cart(
    State(state): State<Shared>,
    Path(user_id): Path<UserId>,
) -> Result<Json<ApiCart>, HandlerError> {
    let mut state = state.lock();
    state.record(format!("GET /cart/{user_id}"))?;
    let cart_id = state.cart_for_user(user_id);
    Ok(Json(state.api_cart(cart_id)))
}

async fn add_item(
    State(state): State<Shared>,
    Path(user_id): Path<UserId>,
    Query(query): Query<ItemQuery>,
) -> Result<Json<ApiCart>, HandlerError> {
    let mut state = state.lock();
    let quantity = query.quantity.unwrap_or(1);
    state.record(format!(
        "POST /cart/{user_id}/add?productId={}&quantity={quantity}",
        query.product_id
    ))?;
    let line = state.catalog_line(query.product_id, quantity)?;
    let cart_id = state.cart_for_user(user_id);
    add_line(state.lines_mut(cart_id)?, line);
    Ok(Json(state.api_cart(cart_id)))
}

async fn update_item(
    State(state): State<Shared>,
    Path(cart_id): Path<CartId>,
    Query(query): Query<ItemQuery>,
) -> Result<Json<ApiCart>, HandlerError> {
    let mut state = state.lock();
    let quantity = query.quantity.unwrap_or(1);
    state.record(format!(
        "PUT /cart/{cart_id}/update?productId={}&quantity={quantity}",
        query.product_id
    ))?;
    if let Some(line) = state
        .lines_mut(cart_id)?
        .iter_mut()
        .find(|l| l.product_id == query.product_id)
    {
        line.quantity = quantity;
    }
    Ok(Json(state.api_cart(cart_id)))
}

async fn remove_item(
    State(state): State<Shared>,
    Path(cart_id): Path<CartId>,
    Query(query): Query<ItemQuery>,
) -> Result<StatusCode, HandlerError> {
    let mut state = state.lock();
    state.record(format!(
        "DELETE /cart/{cart_id}/remove?productId={}",
        query.product_id
    ))?;
    state
        .lines_mut(cart_id)?
        .retain(|l| l.product_id != query.product_id);
    Ok(StatusCode::NO_CONTENT)
}

async fn clear_cart(
    State(state): State<Shared>,
    Path(cart_id): Path<CartId>,
) -> Result<StatusCode, HandlerError> {
    let mut state = state.lock();
    state.record(format!("DELETE /cart/{cart_id}/clear"))?;
    state.lines_mut(cart_id)?.clear();
    Ok(StatusCode::NO_CONTENT)
}

async fn merge_cart(
    State(state): State<Shared>,
    Query(query): Query<MergeQuery>,
    Json(incoming): Json<Vec<CartLine>>,
) -> Result<Json<ApiCart>, HandlerError> {
    let mut state = state.lock();
    state.record(format!(
        "POST /cart/merge?userId={} ({} lines)",
        query.user_id,
        incoming.len()
    ))?;
    let cart_id = state.cart_for_user(query.user_id);
    let lines = state.lines_mut(cart_id)?;
    for line in incoming {
        add_line(lines, line);
    }
    Ok(Json(state.api_cart(cart_id)))
}

async fn me(State(state): State<Shared>) -> Result<Json<Value>, HandlerError> {
    let mut state = state.lock();
    state.record("GET /auth/me".to_string())?;
    match &state.user {
        Some(user) => Ok(Json(json!({ "user": user }))),
        None => Err((StatusCode::UNAUTHORIZED, "no session".to_string())),
    }
}

async fn logout(State(state): State<Shared>) -> Result<StatusCode, HandlerError> {
    let mut state = state.lock();
    state.record("POST /auth/logout".to_string())?;
    state.user = None;
    Ok(StatusCode::NO_CONTENT)
}

fn router(state: Shared) -> Router {
    let api = Router::new()
        .route("/cart/merge", post(merge_cart))
        .route("/cart/{id}", get(get_cart))
        .route("/cart/{id}/add", post(add_item))
        .route("/cart/{id}/update", put(update_item))
        .route("/cart/{id}/remove", delete(remove_item))
        .route("/cart/{id}/clear", delete(clear_cart))
        .route("/auth/me", get(me))
        .route("/auth/logout", post(logout));

    Router::new().nest("/api", api).with_state(state)
}

/// In-memory cart backend listening on `127.0.0.1`.
pub struct FakeBackend {
    addr: SocketAddr,
    state: Shared,
}

impl FakeBackend {
    /// Start the server on an ephemeral port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    #[allow(clippy::expect_used)]
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(FakeState::default()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake backend");
        let addr = listener.local_addr().expect("fake backend address");

        let app = router(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state }
    }

    /// API base URL, e.g. `http://127.0.0.1:4711/api`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// Register a product the add endpoint can resolve.
    pub fn add_product(&self, product_id: i32, name: &str, price: i64) {
        self.state
            .lock()
            .catalog
            .insert(ProductId::new(product_id), (name.to_string(), Decimal::new(price, 0)));
    }

    /// Give `user_id` an existing server cart.
    pub fn seed_cart(&self, user_id: UserId, cart_id: CartId, lines: Vec<CartLine>) {
        let mut state = self.state.lock();
        state.next_cart_id = state.next_cart_id.max(cart_id.as_i32());
        state.carts.insert(user_id, (cart_id, lines));
    }

    /// The server-side cart of `user_id`, if one exists.
    #[must_use]
    pub fn server_cart(&self, user_id: UserId) -> Option<ApiCart> {
        let state = self.state.lock();
        state
            .carts
            .get(&user_id)
            .map(|(cart_id, _)| state.api_cart(*cart_id))
    }

    /// Make the session endpoint report `user` as signed in.
    pub fn sign_in(&self, user: ApiUser) {
        self.state.lock().user = Some(user);
    }

    /// Answer every request with `status` until [`FakeBackend::recover`].
    pub fn fail_with(&self, status: u16) {
        self.state.lock().failure =
            Some(StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR));
    }

    /// Stop injecting failures.
    pub fn recover(&self) {
        self.state.lock().failure = None;
    }

    /// Requests received so far, as `METHOD /path?query`.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().requests.clone()
    }

    /// Storefront configuration pointing at this backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the generated configuration is invalid.
    pub fn config(&self, data_dir: &std::path::Path) -> Result<StorefrontConfig, ConfigError> {
        let base_url = self.base_url();
        let data_dir = data_dir.display().to_string();
        StorefrontConfig::from_lookup(|key| match key {
            "STOREFRONT_API_BASE_URL" => Some(base_url.clone()),
            "STOREFRONT_API_TIMEOUT_SECS" => Some("5".to_string()),
            "STOREFRONT_DATA_DIR" => Some(data_dir.clone()),
            _ => None,
        })
    }

    /// A storefront wired to this backend, storing its guest cart in a fresh
    /// temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory or the client cannot be created.
    #[allow(clippy::expect_used)]
    #[must_use]
    pub fn storefront(&self) -> (Storefront, TempDir) {
        let dir = tempfile::tempdir().expect("temp dir");
        let storefront = self.storefront_in(dir.path());
        (storefront, dir)
    }

    /// A storefront wired to this backend using `data_dir` for the guest
    /// cart. Two storefronts over the same directory share the guest cart
    /// like two runs of the same app.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be created.
    #[allow(clippy::expect_used)]
    #[must_use]
    pub fn storefront_in(&self, data_dir: &std::path::Path) -> Storefront {
        let config = self.config(data_dir).expect("fake backend config");
        Storefront::new(&config).expect("storefront client")
    }
}

/// A wire cart line.
#[must_use]
pub fn line(product_id: i32, name: &str, price: i64, quantity: i64) -> CartLine {
    CartLine {
        product_id: ProductId::new(product_id),
        name: name.to_string(),
        price: Decimal::new(price, 0),
        image: String::new(),
        quantity,
    }
}

/// A signed-in user as the session endpoint reports it.
#[must_use]
pub fn user(id: i32) -> ApiUser {
    ApiUser {
        id: UserId::new(id),
        email: format!("shopper{id}@example.com"),
        name: Some(format!("Shopper {id}")),
    }
}
