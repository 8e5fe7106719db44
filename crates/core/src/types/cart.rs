//! Cart line items.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::types::id::ProductId;
use crate::types::price::Price;
use crate::types::quantity::Quantity;

/// Stable identifier for a cart line, derived from the product it holds.
///
/// Because a cart has at most one line per product, the product id alone is
/// enough to keep the line id stable across re-renders and re-syncs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(String);

impl LineId {
    /// Derive the line id for a product.
    #[must_use]
    pub fn for_product(product_id: ProductId) -> Self {
        Self(format!("line-{product_id}"))
    }

    /// Get the line id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A product entry in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Line id, always `LineId::for_product(product_id)`.
    pub line_id: LineId,
    /// Catalog product.
    pub product_id: ProductId,
    /// Product display name.
    pub name: String,
    /// Price of a single unit.
    pub unit_price: Price,
    /// Product image URL or asset reference.
    pub image: String,
    /// Number of units.
    pub quantity: Quantity,
}

impl CartItem {
    /// Create a cart item, deriving its line id from the product id.
    #[must_use]
    pub fn new(
        product_id: ProductId,
        name: impl Into<String>,
        unit_price: Price,
        image: impl Into<String>,
        quantity: Quantity,
    ) -> Self {
        Self {
            line_id: LineId::for_product(product_id),
            product_id,
            name: name.into(),
            unit_price,
            image: image.into(),
            quantity,
        }
    }

    /// Total price of the line (unit price × quantity).
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price.times(self.quantity)
    }

    /// Copy of this item with a different quantity.
    #[must_use]
    pub fn with_quantity(&self, quantity: Quantity) -> Self {
        Self {
            quantity,
            ..self.clone()
        }
    }
}

/// Catalog data needed to put a product in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    /// Catalog product.
    pub id: ProductId,
    /// Product display name.
    pub name: String,
    /// Price of a single unit.
    pub price: Price,
    /// Product image URL or asset reference.
    pub image: String,
}

impl ProductSummary {
    /// Cart line holding `quantity` units of this product.
    #[must_use]
    pub fn to_item(&self, quantity: Quantity) -> CartItem {
        CartItem::new(
            self.id,
            self.name.clone(),
            self.price,
            self.image.clone(),
            quantity,
        )
    }
}
