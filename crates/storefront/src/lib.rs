//! Wearables storefront cart library.
//!
//! Keeps a shopper's cart consistent across the guest and signed-in states:
//! a durable guest cart, backend cart sync, and the merge of the two when the
//! shopper signs in. The [`state::Storefront`] handle wires everything
//! together.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod cart;
pub mod config;
pub mod error;
pub mod guest;
pub mod order;
pub mod session;
pub mod state;
pub mod storage;

pub use error::{CartError, Result};
pub use state::Storefront;
