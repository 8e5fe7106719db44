//! Signed-in user and the login/logout hand-off.
//!
//! The session provider is the only component that moves the cart between
//! guest and synced: a resolved user triggers the login merge, logout resets
//! the cart to an empty guest cart.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, instrument, warn};
use wearables_core::UserId;

use crate::backend::{ApiUser, SessionBackend};
use crate::cart::{CartStore, LoginMerge, MergeOutcome};
use crate::error::{
    CartError, Result, add_breadcrumb, clear_sentry_user, report, set_sentry_user,
};

/// Signed-in user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Backend user id.
    pub id: UserId,
    /// Account email.
    pub email: String,
    /// Display name.
    pub name: Option<String>,
}

impl From<ApiUser> for User {
    fn from(user: ApiUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
        }
    }
}

/// Holds the current user and runs the login/logout hand-off.
///
/// Cheap to clone; clones share the same user.
#[derive(Clone)]
pub struct SessionProvider {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    backend: Arc<dyn SessionBackend>,
    user: watch::Sender<Option<User>>,
    merge: LoginMerge,
    cart: CartStore,
}

impl SessionProvider {
    /// Create a provider with nobody signed in.
    #[must_use]
    pub fn new(backend: Arc<dyn SessionBackend>, merge: LoginMerge, cart: CartStore) -> Self {
        let (user, _) = watch::channel(None);
        Self {
            inner: Arc::new(SessionInner {
                backend,
                user,
                merge,
                cart,
            }),
        }
    }

    /// The signed-in user, if any.
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.inner.user.borrow().clone()
    }

    /// Subscribe to sign-in/sign-out changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.inner.user.subscribe()
    }

    /// Ask the backend who is signed in and hand off to the login merge.
    ///
    /// An expired or missing session resolves to `None`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Backend` if the session lookup fails, or
    /// `CartError::MergeFailed` if the user resolved but the cart merge
    /// failed (the user stays signed in).
    #[instrument(skip(self))]
    pub async fn resolve_current_user(&self) -> Result<Option<User>> {
        let user = self.inner.backend.current_user().await.map_err(|e| {
            let err = CartError::Backend(e);
            report(&err, "resolve_current_user");
            err
        })?;

        let Some(user) = user.map(User::from) else {
            info!("No signed-in user, staying on guest cart");
            return Ok(None);
        };

        self.login_resolved(user.clone()).await?;
        Ok(Some(user))
    }

    /// Hand off a user authenticated elsewhere.
    ///
    /// Stores the user, sets the Sentry user context and runs the login
    /// merge.
    ///
    /// # Errors
    ///
    /// Returns `CartError::MergeFailed` if the cart merge failed.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn login_resolved(&self, user: User) -> Result<MergeOutcome> {
        let user_id = user.id;
        set_sentry_user(&user_id, Some(&user.email));
        add_breadcrumb("auth", "Signed in", None);
        self.inner.user.send_replace(Some(user));

        self.inner.merge.run(user_id).await
    }

    /// Sign out and return to an empty guest cart.
    ///
    /// The backend logout is best effort; local state is always cleared.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        if let Err(e) = self.inner.backend.logout().await {
            warn!(error = %e, "Backend logout failed, clearing local session anyway");
        }

        self.inner.user.send_replace(None);
        self.inner.merge.reset();
        self.inner.cart.reset();
        clear_sentry_user();
        add_breadcrumb("auth", "Signed out", None);
        info!("Signed out");
    }
}
