//! Validated conversion from wire types to domain types.

use thiserror::Error;
use tracing::warn;
use wearables_core::{CartId, CartItem, Price, PriceError, Quantity, QuantityError};

use super::BackendError;
use super::types::{ApiCart, CartLine};

/// A cart line that cannot become a [`CartItem`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidLine {
    /// The price is negative.
    #[error("product {product_id}: {source}")]
    Price {
        /// Offending product.
        product_id: wearables_core::ProductId,
        /// Underlying error.
        source: PriceError,
    },
    /// The quantity is zero, negative or too large.
    #[error("product {product_id}: {source}")]
    Quantity {
        /// Offending product.
        product_id: wearables_core::ProductId,
        /// Underlying error.
        source: QuantityError,
    },
}

impl TryFrom<CartLine> for CartItem {
    type Error = InvalidLine;

    fn try_from(line: CartLine) -> Result<Self, Self::Error> {
        let product_id = line.product_id;
        let unit_price =
            Price::new(line.price).map_err(|source| InvalidLine::Price { product_id, source })?;
        let quantity = Quantity::new(line.quantity)
            .map_err(|source| InvalidLine::Quantity { product_id, source })?;

        Ok(Self::new(product_id, line.name, unit_price, line.image, quantity))
    }
}

/// A server cart that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncedCart {
    /// Server identity.
    pub cart_id: CartId,
    /// Validated items in server order.
    pub items: Vec<CartItem>,
}

impl TryFrom<ApiCart> for SyncedCart {
    type Error = BackendError;

    fn try_from(cart: ApiCart) -> Result<Self, Self::Error> {
        let cart_id = cart
            .cart_id
            .ok_or_else(|| BackendError::InvalidCart("missing cartId".to_string()))?;

        let items = cart
            .items
            .into_iter()
            .map(CartItem::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| BackendError::InvalidCart(e.to_string()))?;

        Ok(Self { cart_id, items })
    }
}

/// Convert untrusted lines (e.g., a guest snapshot), dropping invalid ones.
pub fn lenient_items(lines: impl IntoIterator<Item = CartLine>) -> Vec<CartItem> {
    lines
        .into_iter()
        .filter_map(|line| match CartItem::try_from(line) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(error = %e, "Dropping invalid cart line");
                None
            }
        })
        .collect()
}
