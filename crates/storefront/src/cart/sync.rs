//! Cart sync operations.
//!
//! Each operation calls the backend and feeds the result into the
//! [`CartStore`]. On any failure the cart is left as it was and the error is
//! returned to the caller; there is no automatic retry.

use std::sync::Arc;

use tracing::{info, instrument};
use wearables_core::{CartId, ProductId, Quantity, UserId};

use super::state::CartStore;
use crate::backend::{BackendError, CartBackend, SyncedCart};
use crate::error::{CartError, Result, report};

/// Backend-backed cart operations.
#[derive(Clone)]
pub struct CartSync {
    backend: Arc<dyn CartBackend>,
    store: CartStore,
}

impl CartSync {
    /// Create the sync operations over `backend`, writing into `store`.
    #[must_use]
    pub fn new(backend: Arc<dyn CartBackend>, store: CartStore) -> Self {
        Self { backend, store }
    }

    /// Fetch the authoritative server cart; it replaces the state entirely.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Backend` if the request fails or the response is
    /// not a valid cart.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn fetch_cart(&self, user_id: UserId) -> Result<SyncedCart> {
        let ticket = self.store.begin_request();
        let cart = validated(self.backend.get_cart(user_id).await)
            .map_err(|e| failed(e, "fetch_cart"))?;

        self.store.apply_synced(&ticket, cart.cart_id, cart.items.clone());
        info!(cart_id = %cart.cart_id, items = cart.items.len(), "Fetched cart");
        Ok(cart)
    }

    /// Add `quantity` units of a product (the backend increments an existing
    /// line). The echoed cart replaces the items.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Backend` if the request fails or the response is
    /// not a valid cart.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<SyncedCart> {
        let ticket = self.store.begin_request();
        let cart = validated(self.backend.add_item(user_id, product_id, quantity).await)
            .map_err(|e| failed(e, "add_item"))?;

        self.store.apply_synced(&ticket, cart.cart_id, cart.items.clone());
        Ok(cart)
    }

    /// Set the absolute quantity of a line.
    ///
    /// Quantities below one are clamped to one, the same policy as guest
    /// carts; removing a line goes through [`CartSync::remove_item`].
    ///
    /// # Errors
    ///
    /// Returns `CartError::Backend` if the request fails or the response is
    /// not a valid cart.
    #[instrument(skip(self), fields(cart_id = %cart_id, product_id = %product_id))]
    pub async fn update_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<SyncedCart> {
        let quantity = Quantity::clamped(quantity);
        let ticket = self.store.begin_request();
        let cart = validated(self.backend.update_item(cart_id, product_id, quantity).await)
            .map_err(|e| failed(e, "update_quantity"))?;

        self.store.apply_synced(&ticket, cart.cart_id, cart.items.clone());
        Ok(cart)
    }

    /// Delete a line. On success the product is filtered out locally without
    /// waiting for a cart echo.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Backend` if the request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id, product_id = %product_id))]
    pub async fn remove_item(&self, cart_id: CartId, product_id: ProductId) -> Result<()> {
        let ticket = self.store.begin_request();
        self.backend
            .remove_item(cart_id, product_id)
            .await
            .map_err(|e| failed(e, "remove_item"))?;

        self.store.apply_removal(&ticket, product_id);
        Ok(())
    }

    /// Empty the server cart. The cart id is kept.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Backend` if the request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn clear_remote(&self, cart_id: CartId) -> Result<()> {
        let ticket = self.store.begin_request();
        self.backend
            .clear_cart(cart_id)
            .await
            .map_err(|e| failed(e, "clear_remote"))?;

        self.store.apply_clear(&ticket);
        Ok(())
    }
}

/// Validate a raw backend cart at the sync boundary.
pub(crate) fn validated(
    response: std::result::Result<crate::backend::ApiCart, BackendError>,
) -> std::result::Result<SyncedCart, BackendError> {
    response.and_then(SyncedCart::try_from)
}

fn failed(err: BackendError, operation: &str) -> CartError {
    let err = CartError::Backend(err);
    report(&err, operation);
    err
}
