//! Order summary shown at checkout.

use serde::Serialize;
use wearables_core::{CartItem, CurrencyCode, Price};

/// Orders above this subtotal ship free.
pub const FREE_SHIPPING_THRESHOLD: u32 = 9999;

/// Flat shipping fee below the threshold.
pub const SHIPPING_FEE: u32 = 99;

/// Tax rate in percent, applied to the subtotal.
pub const TAX_RATE_PERCENT: u32 = 18;

/// Checkout totals for a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    /// Number of units.
    pub item_count: u64,
    /// Sum of line totals.
    pub subtotal: Price,
    /// Shipping charge.
    pub shipping: Price,
    /// Tax on the subtotal, rounded to cents.
    pub tax: Price,
    /// Subtotal + shipping + tax, rounded to cents.
    pub total: Price,
    /// Display currency.
    pub currency: CurrencyCode,
}

impl OrderSummary {
    /// Compute the summary for `items`.
    #[must_use]
    pub fn from_items(items: &[CartItem]) -> Self {
        let subtotal: Price = items.iter().map(CartItem::line_total).sum();
        let shipping = if subtotal > Price::from_units(FREE_SHIPPING_THRESHOLD) {
            Price::ZERO
        } else {
            Price::from_units(SHIPPING_FEE)
        };
        let tax = subtotal.apply_rate(TAX_RATE_PERCENT).round_cents();
        let total = (subtotal + shipping + tax).round_cents();

        Self {
            item_count: items.iter().map(|item| u64::from(item.quantity.get())).sum(),
            subtotal,
            shipping,
            tax,
            total,
            currency: CurrencyCode::INR,
        }
    }

    /// Whether shipping is free.
    #[must_use]
    pub fn free_shipping(&self) -> bool {
        self.shipping == Price::ZERO
    }

    /// Format an amount in the summary currency.
    #[must_use]
    pub fn format(&self, amount: Price) -> String {
        amount.display(self.currency)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use wearables_core::{ProductId, Quantity};

    use super::*;

    fn item(product_id: i32, price: Decimal, quantity: i64) -> CartItem {
        CartItem::new(
            ProductId::new(product_id),
            "Item",
            Price::new(price).unwrap(),
            "",
            Quantity::new(quantity).unwrap(),
        )
    }

    #[test]
    fn test_small_order_pays_shipping() {
        let summary = OrderSummary::from_items(&[
            item(1, Decimal::new(100, 0), 2),
            item(2, Decimal::new(50, 0), 1),
        ]);

        assert_eq!(summary.item_count, 3);
        assert_eq!(summary.subtotal, Price::from_units(250));
        assert_eq!(summary.shipping, Price::from_units(99));
        assert_eq!(summary.tax, Price::from_units(45));
        assert_eq!(summary.total, Price::from_units(394));
        assert_eq!(summary.format(summary.total), "₹394.00");
    }

    #[test]
    fn test_free_shipping_above_threshold() {
        let summary = OrderSummary::from_items(&[item(1, Decimal::new(10_000, 0), 1)]);
        assert!(summary.free_shipping());
        assert_eq!(summary.total, Price::from_units(11_800));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let summary = OrderSummary::from_items(&[item(1, Decimal::new(9999, 0), 1)]);
        assert!(!summary.free_shipping());
    }

    #[test]
    fn test_tax_rounds_to_cents() {
        // 18% of 10.99 = 1.9782
        let summary = OrderSummary::from_items(&[item(1, Decimal::new(1099, 2), 1)]);
        assert_eq!(summary.tax.amount(), Decimal::new(198, 2));
        assert_eq!(summary.total.amount(), Decimal::new(11197, 2));
    }

    #[test]
    fn test_empty_cart() {
        let summary = OrderSummary::from_items(&[]);
        assert_eq!(summary.subtotal, Price::ZERO);
        assert_eq!(summary.tax, Price::ZERO);
        assert_eq!(summary.item_count, 0);
    }
}
