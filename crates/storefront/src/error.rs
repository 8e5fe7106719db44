//! Unified error handling with Sentry integration.
//!
//! Provides the caller-facing `CartError` type returned by every cart
//! operation. None of these errors are fatal; the UI shows them as transient
//! notifications. Server-side faults are captured to Sentry through
//! [`report`] before they reach the caller.

use thiserror::Error;

use crate::backend::BackendError;

/// Cart-level error type for the storefront.
#[derive(Debug, Error)]
pub enum CartError {
    /// Backend request failed; cart state was left unchanged.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// The operation needs a signed-in user.
    #[error("Not signed in")]
    NotAuthenticated,

    /// The operation needs a synced cart (server cart id).
    #[error("Cart is not synced with the server")]
    NotSynced,

    /// Checkout attempted with no items.
    #[error("Your cart is empty")]
    EmptyCart,

    /// Login merge has not finished yet.
    #[error("Cart is still syncing, please wait")]
    MergeIncomplete,

    /// Login merge failed; the server cart cannot be trusted.
    #[error("Cart sync failed: {0}")]
    MergeFailed(String),
}

impl CartError {
    /// Message suitable for a user-visible notification.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Backend(BackendError::RateLimited(secs)) => {
                format!("Too many requests, try again in {secs}s")
            }
            Self::Backend(BackendError::Unauthorized) => {
                "Your session expired, please sign in again".to_string()
            }
            Self::Backend(_) => "Could not update your cart, please try again".to_string(),
            Self::MergeFailed(_) => "Could not sync your cart, please try again".to_string(),
            _ => self.to_string(),
        }
    }

    /// Whether this error should be captured to Sentry.
    #[must_use]
    pub const fn is_server_fault(&self) -> bool {
        match self {
            Self::Backend(err) => err.is_server_fault(),
            Self::MergeFailed(_) => true,
            Self::NotAuthenticated | Self::NotSynced | Self::EmptyCart | Self::MergeIncomplete => {
                false
            }
        }
    }
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;

/// Log an error and capture it to Sentry if it is a server-side fault.
pub fn report(err: &CartError, operation: &str) {
    if err.is_server_fault() {
        let event_id = sentry::capture_error(err);
        tracing::error!(
            error = %err,
            operation,
            sentry_event_id = %event_id,
            "Cart operation failed"
        );
    } else {
        tracing::warn!(error = %err, operation, "Cart operation failed");
    }
}

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of cart
/// actions leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
