//! Core types for the wearables storefront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod id;
pub mod price;
pub mod quantity;

pub use cart::{CartItem, LineId, ProductSummary};
pub use id::*;
pub use price::{CurrencyCode, Price, PriceError};
pub use quantity::{Quantity, QuantityError};
