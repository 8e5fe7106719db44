//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are never negative. The backend sends them as JSON numbers and the
//! guest snapshot stores them the same way, so parsing goes through
//! [`Price::new`] to reject bad data at the edge.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::quantity::Quantity;

/// Errors that can occur when constructing a [`Price`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative (got {0})")]
    Negative(Decimal),
}

/// A non-negative unit price in the store currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// The zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price, rejecting negative amounts.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` if `amount` is below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        Ok(Self(amount))
    }

    /// Create a price from a whole number of currency units.
    #[must_use]
    pub fn from_units(units: u32) -> Self {
        Self(Decimal::from(units))
    }

    /// Get the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units at this unit price.
    #[must_use]
    pub fn times(self, quantity: Quantity) -> Self {
        Self(self.0 * Decimal::from(quantity.get()))
    }

    /// `percent`% of this price (e.g., `apply_rate(18)` for 18% tax).
    #[must_use]
    pub fn apply_rate(self, percent: u32) -> Self {
        Self(self.0 * Decimal::from(percent) / Decimal::ONE_HUNDRED)
    }

    /// Round to two decimal places, halves away from zero.
    #[must_use]
    pub fn round_cents(self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Format for display with a currency symbol (e.g., "₹250.00").
    #[must_use]
    pub fn display(&self, currency: CurrencyCode) -> String {
        format!("{}{:.2}", currency.symbol(), self.0)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
    EUR,
    GBP,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::INR => "₹",
            Self::USD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_price_rejected() {
        let err = Price::new(Decimal::new(-1, 0)).unwrap_err();
        assert_eq!(err, PriceError::Negative(Decimal::new(-1, 0)));
    }

    #[test]
    fn test_zero_price_allowed() {
        assert_eq!(Price::new(Decimal::ZERO).unwrap(), Price::ZERO);
    }

    #[test]
    fn test_deserialize_number_and_string() {
        let from_number: Price = serde_json::from_str("99.5").unwrap();
        let from_string: Price = serde_json::from_str("\"99.5\"").unwrap();
        assert_eq!(from_number, from_string);
        assert!(serde_json::from_str::<Price>("-3").is_err());
    }

    #[test]
    fn test_times_and_sum() {
        let total: Price = [
            Price::from_units(100).times(Quantity::new(2).unwrap()),
            Price::from_units(50).times(Quantity::new(1).unwrap()),
        ]
        .into_iter()
        .sum();
        assert_eq!(total, Price::from_units(250));
    }

    #[test]
    fn test_display_with_currency() {
        assert_eq!(Price::from_units(250).display(CurrencyCode::INR), "₹250.00");
        assert_eq!(
            Price::new(Decimal::new(1999, 2)).unwrap().display(CurrencyCode::USD),
            "$19.99"
        );
    }

    #[test]
    fn test_apply_rate() {
        let tax = Price::from_units(250).apply_rate(18);
        assert_eq!(tax.amount(), Decimal::new(45, 0));
    }

    #[test]
    fn test_round_cents() {
        let price = Price::new(Decimal::new(12345, 3)).unwrap();
        assert_eq!(price.round_cents().amount(), Decimal::new(1235, 2));
    }
}
