//! Wearables Core - Shared types library.
//!
//! This crate provides the domain types used across the storefront:
//! - `storefront` - Cart reconciliation (guest store, sync, login merge)
//! - `cli` - Command-line front end driving the cart
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, quantities, and cart lines

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
