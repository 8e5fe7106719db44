//! Wire types for the backend REST API.
//!
//! These mirror the JSON the backend sends and accepts. They are deliberately
//! loose (raw integers and decimals) so that a malformed value produces a
//! precise validation error in [`super::conversions`] instead of an opaque
//! parse failure.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use wearables_core::{CartId, CartItem, ProductId, UserId};

// =============================================================================
// Cart Types
// =============================================================================

/// One cart line as exchanged with the backend and stored in the guest
/// snapshot: `{productId, name, price, image, quantity}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Catalog product.
    pub product_id: ProductId,
    /// Product display name.
    #[serde(default)]
    pub name: String,
    /// Unit price. Written as a JSON number, read from a number or string.
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub price: Decimal,
    /// Image URL or asset reference.
    #[serde(default)]
    pub image: String,
    /// Units on the line.
    pub quantity: i64,
}

impl From<&CartItem> for CartLine {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product_id,
            name: item.name.clone(),
            price: item.unit_price.amount(),
            image: item.image.clone(),
            quantity: i64::from(item.quantity.get()),
        }
    }
}

/// A cart as returned by fetch, add, update and merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCart {
    /// Server identity of the cart.
    #[serde(default)]
    pub cart_id: Option<CartId>,
    /// Cart lines in server order.
    #[serde(default)]
    pub items: Vec<CartLine>,
}

// =============================================================================
// Session Types
// =============================================================================

/// Signed-in user as returned by `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiUser {
    /// Stable numeric identity.
    pub id: UserId,
    /// Account email.
    pub email: String,
    /// Display name, if the account has one.
    #[serde(default)]
    pub name: Option<String>,
}

/// Envelope around [`ApiUser`] used by `GET /auth/me`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MeResponse {
    pub user: Option<ApiUser>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_line_wire_shape() {
        let line = CartLine {
            product_id: ProductId::new(3),
            name: "Orbit Watch".to_string(),
            price: Decimal::new(1995, 1),
            image: "/img/orbit.png".to_string(),
            quantity: 2,
        };

        let value = serde_json::to_value(&line).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "productId": 3,
                "name": "Orbit Watch",
                "price": 199.5,
                "image": "/img/orbit.png",
                "quantity": 2
            })
        );
    }

    #[test]
    fn test_api_cart_tolerates_missing_fields() {
        let cart: ApiCart = serde_json::from_str(
            r#"{"cartId": 10, "items": [{"productId": 1, "price": "100", "quantity": 1}]}"#,
        )
        .unwrap();

        assert_eq!(cart.cart_id, Some(CartId::new(10)));
        let line = cart.items.first().unwrap();
        assert_eq!(line.name, "");
        assert_eq!(line.image, "");
        assert_eq!(line.price, Decimal::new(100, 0));
    }

    #[test]
    fn test_me_response_without_user() {
        let me: MeResponse = serde_json::from_str(r#"{"user": null}"#).unwrap();
        assert!(me.user.is_none());
    }
}
