//! Backend REST API client for carts and sessions.
//!
//! # Architecture
//!
//! - The backend is the source of truth for synced carts; this client makes
//!   direct calls and never caches cart responses
//! - Wire types in [`types`] mirror the JSON shapes loosely; the validated
//!   conversion into domain types lives in [`conversions`] and runs at the
//!   sync-operation boundary
//! - [`CartBackend`] and [`SessionBackend`] are the seams the cart subsystem
//!   depends on; [`ApiClient`] implements both over `reqwest`
//!
//! # Endpoints
//!
//! | Operation | Request |
//! |-----------|---------|
//! | fetch     | `GET /cart/{userId}` |
//! | add       | `POST /cart/{userId}/add?productId&quantity` |
//! | update    | `PUT /cart/{cartId}/update?productId&quantity` |
//! | remove    | `DELETE /cart/{cartId}/remove?productId` |
//! | clear     | `DELETE /cart/{cartId}/clear` |
//! | merge     | `POST /cart/merge?userId=<id>` with the guest lines as body |
//! | me        | `GET /auth/me` |
//! | logout    | `POST /auth/logout` |

mod client;
pub mod conversions;
pub mod types;

pub use client::ApiClient;
pub use conversions::{InvalidLine, SyncedCart};
pub use types::{ApiCart, ApiUser, CartLine};

use async_trait::async_trait;
use thiserror::Error;
use wearables_core::{CartId, ProductId, Quantity, UserId};

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed (connection, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint URL could not be built from the base URL.
    #[error("Invalid request URL: {0}")]
    Url(#[from] url::ParseError),

    /// Backend answered with a non-success status.
    #[error("Backend returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        body: String,
    },

    /// Session is missing or expired.
    #[error("Unauthorized")]
    Unauthorized,

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Response parsed but violates cart invariants.
    #[error("Invalid cart response: {0}")]
    InvalidCart(String),
}

impl BackendError {
    /// Whether the failure points at the backend rather than the caller.
    ///
    /// Used to decide which errors are worth reporting to Sentry.
    #[must_use]
    pub const fn is_server_fault(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 500,
            Self::Parse(_) | Self::InvalidCart(_) => true,
            Self::Http(_) | Self::Url(_) | Self::Unauthorized | Self::RateLimited(_) => false,
        }
    }
}

/// Cart endpoints of the backend.
///
/// Responses are returned as raw wire types; callers validate them with
/// [`SyncedCart::try_from`] before touching state.
#[async_trait]
pub trait CartBackend: Send + Sync {
    /// `GET /cart/{userId}`
    async fn get_cart(&self, user_id: UserId) -> Result<ApiCart, BackendError>;

    /// `POST /cart/{userId}/add?productId&quantity`
    async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<ApiCart, BackendError>;

    /// `PUT /cart/{cartId}/update?productId&quantity`
    async fn update_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<ApiCart, BackendError>;

    /// `DELETE /cart/{cartId}/remove?productId`
    async fn remove_item(&self, cart_id: CartId, product_id: ProductId)
    -> Result<(), BackendError>;

    /// `DELETE /cart/{cartId}/clear`
    async fn clear_cart(&self, cart_id: CartId) -> Result<(), BackendError>;

    /// `POST /cart/merge?userId=<id>`
    async fn merge_cart(&self, user_id: UserId, lines: &[CartLine])
    -> Result<ApiCart, BackendError>;
}

/// Session endpoints of the backend.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// `GET /auth/me`. Resolves to `None` when nobody is signed in.
    async fn current_user(&self) -> Result<Option<ApiUser>, BackendError>;

    /// `POST /auth/logout`
    async fn logout(&self) -> Result<(), BackendError>;
}
