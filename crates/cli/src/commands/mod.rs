//! Command implementations.

pub mod cart;
pub mod session;

use thiserror::Error;
use wearables_storefront::CartError;
use wearables_storefront::backend::BackendError;
use wearables_storefront::config::ConfigError;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// HTTP client could not be built.
    #[error("Backend setup error: {0}")]
    Setup(#[from] BackendError),

    /// A cart operation failed.
    #[error("{}", .0.user_message())]
    Cart(#[from] CartError),

    /// Price argument is not a valid non-negative amount.
    #[error("Invalid price: {0}")]
    InvalidPrice(String),
}
