//! Line item quantity.

use core::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when constructing a [`Quantity`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    /// The quantity is below [`Quantity::MIN`].
    #[error("quantity must be at least 1 (got {0})")]
    BelowMinimum(i64),
    /// The quantity does not fit in a `u32`.
    #[error("quantity {0} is too large")]
    TooLarge(i64),
}

/// Number of units on a cart line. Always at least one.
///
/// A line with zero units does not exist: removing a product is a separate
/// operation. Callers that accept arbitrary integers from a UI should use
/// [`Quantity::clamped`], which floors anything below one to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    /// Smallest allowed quantity.
    pub const MIN: Self = Self(1);

    /// Create a quantity.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::BelowMinimum` for values below 1 and
    /// `QuantityError::TooLarge` for values above `u32::MAX`.
    pub fn new(value: i64) -> Result<Self, QuantityError> {
        if value < 1 {
            return Err(QuantityError::BelowMinimum(value));
        }
        u32::try_from(value)
            .map(Self)
            .map_err(|_| QuantityError::TooLarge(value))
    }

    /// Create a quantity, flooring values below one to [`Quantity::MIN`]
    /// and capping values above `u32::MAX`.
    #[must_use]
    pub fn clamped(value: i64) -> Self {
        Self(u32::try_from(value.max(1)).unwrap_or(u32::MAX))
    }

    /// Get the underlying count.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Add two quantities, saturating at `u32::MAX`.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::MIN
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_rejected() {
        assert_eq!(Quantity::new(0), Err(QuantityError::BelowMinimum(0)));
        assert_eq!(Quantity::new(-4), Err(QuantityError::BelowMinimum(-4)));
    }

    #[test]
    fn test_clamped_floors_to_one() {
        assert_eq!(Quantity::clamped(0), Quantity::MIN);
        assert_eq!(Quantity::clamped(-10), Quantity::MIN);
        assert_eq!(Quantity::clamped(3).get(), 3);
    }

    #[test]
    fn test_clamped_caps_large_values() {
        assert_eq!(Quantity::clamped(i64::MAX).get(), u32::MAX);
    }

    #[test]
    fn test_deserialize_rejects_zero() {
        assert!(serde_json::from_str::<Quantity>("0").is_err());
        assert_eq!(serde_json::from_str::<Quantity>("2").unwrap().get(), 2);
    }

    #[test]
    fn test_saturating_add() {
        let big = Quantity::clamped(i64::from(u32::MAX));
        assert_eq!(big.saturating_add(Quantity::MIN).get(), u32::MAX);
    }
}
