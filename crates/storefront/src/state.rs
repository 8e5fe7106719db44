//! Shared storefront handle.

use std::sync::Arc;

use crate::backend::{ApiClient, BackendError, CartBackend, SessionBackend};
use crate::cart::{CartActions, CartStore, CartSync, LoginMerge};
use crate::config::StorefrontConfig;
use crate::guest::GuestCartStore;
use crate::session::SessionProvider;
use crate::storage::{DurableStorage, FileStorage};

/// The wired-up cart subsystem.
///
/// This struct is cheaply cloneable via `Arc`; all clones share one cart,
/// one session and one merge status.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    cart: CartStore,
    sync: CartSync,
    merge: LoginMerge,
    session: SessionProvider,
    actions: CartActions,
}

impl Storefront {
    /// Build the storefront from configuration.
    ///
    /// The guest cart is stored under `config.data_dir` and rehydrated
    /// immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &StorefrontConfig) -> Result<Self, BackendError> {
        let client = ApiClient::new(&config.api)?;
        let storage = Arc::new(FileStorage::new(config.data_dir.clone()));
        Ok(Self::from_parts(
            Arc::new(client.clone()),
            Arc::new(client),
            storage,
        ))
    }

    /// Build the storefront over explicit backends and storage.
    #[must_use]
    pub fn from_parts(
        cart_backend: Arc<dyn CartBackend>,
        session_backend: Arc<dyn SessionBackend>,
        storage: Arc<dyn DurableStorage>,
    ) -> Self {
        let cart = CartStore::rehydrate(GuestCartStore::new(storage));
        let sync = CartSync::new(cart_backend.clone(), cart.clone());
        let merge = LoginMerge::new(cart_backend, cart.clone());
        let session = SessionProvider::new(session_backend, merge.clone(), cart.clone());
        let actions = CartActions::new(cart.clone(), sync.clone(), session.clone(), merge.clone());

        Self {
            inner: Arc::new(StorefrontInner {
                cart,
                sync,
                merge,
                session,
                actions,
            }),
        }
    }

    /// The cart state container.
    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    /// Low-level backend cart operations.
    #[must_use]
    pub fn sync(&self) -> &CartSync {
        &self.inner.sync
    }

    /// The login-merge coordinator.
    #[must_use]
    pub fn merge(&self) -> &LoginMerge {
        &self.inner.merge
    }

    /// The signed-in user and login/logout hand-off.
    #[must_use]
    pub fn session(&self) -> &SessionProvider {
        &self.inner.session
    }

    /// UI-facing cart actions.
    #[must_use]
    pub fn actions(&self) -> &CartActions {
        &self.inner.actions
    }
}
