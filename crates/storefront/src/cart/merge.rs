//! Login-merge coordinator.
//!
//! Runs once per authentication. A non-empty guest cart is merged into the
//! user's server cart (the backend sums overlapping quantities); otherwise
//! the server cart is fetched. Either way the cart becomes synced and the
//! guest snapshot is removed.
//!
//! The outcome is published as a [`MergeStatus`]. Checkout waits for
//! `Completed`; a failed merge keeps the guest snapshot so nothing is lost.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tracing::{info, instrument, warn};
use wearables_core::UserId;

use super::state::CartStore;
use super::sync::validated;
use crate::backend::conversions::lenient_items;
use crate::backend::{BackendError, CartBackend, CartLine, SyncedCart};
use crate::error::{CartError, Result, add_breadcrumb, report};

/// Progress of the login merge for the current session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MergeStatus {
    /// No authenticated user has been handed off yet.
    #[default]
    Idle,
    /// Merge or fetch in flight.
    Pending(UserId),
    /// Cart is synced for this user.
    Completed(UserId),
    /// The last attempt failed; the guest snapshot is still stored.
    Failed {
        /// User the merge ran for.
        user_id: UserId,
        /// Failure description.
        message: String,
    },
}

impl MergeStatus {
    /// Whether a merge is in flight.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

/// What a merge run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Guest lines were posted to the merge endpoint.
    Merged {
        /// Number of guest lines sent.
        lines: usize,
    },
    /// No guest lines; the server cart was fetched.
    Fetched,
    /// Already completed for this user.
    AlreadyDone,
}

/// Coordinates the guest-to-server cart hand-off at login.
///
/// Cheap to clone; clones share status.
#[derive(Clone)]
pub struct LoginMerge {
    inner: Arc<LoginMergeInner>,
}

struct LoginMergeInner {
    backend: Arc<dyn CartBackend>,
    store: CartStore,
    status: watch::Sender<MergeStatus>,
    running: Mutex<()>,
}

impl LoginMerge {
    /// Create a coordinator over `backend`, writing into `store`.
    #[must_use]
    pub fn new(backend: Arc<dyn CartBackend>, store: CartStore) -> Self {
        let (status, _) = watch::channel(MergeStatus::Idle);
        Self {
            inner: Arc::new(LoginMergeInner {
                backend,
                store,
                status,
                running: Mutex::new(()),
            }),
        }
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> MergeStatus {
        self.inner.status.borrow().clone()
    }

    /// Subscribe to status changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<MergeStatus> {
        self.inner.status.subscribe()
    }

    /// Run the hand-off for `user_id`.
    ///
    /// Concurrent calls are serialized; a call for a user whose merge has
    /// already completed returns [`MergeOutcome::AlreadyDone`] without
    /// touching the backend.
    ///
    /// # Errors
    ///
    /// Returns `CartError::MergeFailed` if the merge or fetch request fails,
    /// returns an invalid cart, or its result was discarded because a newer
    /// result or a logout got there first. The guest snapshot is left intact.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn run(&self, user_id: UserId) -> Result<MergeOutcome> {
        let _running = self.inner.running.lock().await;

        if self.status() == MergeStatus::Completed(user_id) {
            return Ok(MergeOutcome::AlreadyDone);
        }
        self.inner.status.send_replace(MergeStatus::Pending(user_id));

        match self.merge_or_fetch(user_id).await {
            Ok(Some(outcome)) => {
                self.settle(user_id, MergeStatus::Completed(user_id));
                add_breadcrumb("cart", "Login merge completed", None);
                Ok(outcome)
            }
            Ok(None) => {
                let message = "cart result was superseded".to_string();
                warn!("Login merge result discarded");
                self.settle(
                    user_id,
                    MergeStatus::Failed {
                        user_id,
                        message: message.clone(),
                    },
                );
                Err(CartError::MergeFailed(message))
            }
            Err(e) => {
                self.settle(
                    user_id,
                    MergeStatus::Failed {
                        user_id,
                        message: e.to_string(),
                    },
                );
                let err = CartError::MergeFailed(e.to_string());
                report(&err, "login_merge");
                Err(err)
            }
        }
    }

    /// Publish the end of a run. A logout during the request moves the
    /// status away from `Pending`; it must stay that way.
    fn settle(&self, user_id: UserId, next: MergeStatus) {
        self.inner.status.send_if_modified(|status| {
            let current = *status == MergeStatus::Pending(user_id);
            if current {
                *status = next;
            }
            current
        });
    }

    /// Returns `None` if the cart result was stale and not applied.
    async fn merge_or_fetch(
        &self,
        user_id: UserId,
    ) -> std::result::Result<Option<MergeOutcome>, BackendError> {
        let store = &self.inner.store;
        let guest_lines: Vec<CartLine> = lenient_items(store.guest_store().load())
            .iter()
            .map(CartLine::from)
            .collect();

        let ticket = store.begin_request();
        let (cart, outcome): (SyncedCart, MergeOutcome) = if guest_lines.is_empty() {
            let cart = validated(self.inner.backend.get_cart(user_id).await)?;
            (cart, MergeOutcome::Fetched)
        } else {
            let lines = guest_lines.len();
            let cart = validated(self.inner.backend.merge_cart(user_id, &guest_lines).await)?;
            (cart, MergeOutcome::Merged { lines })
        };

        if !store.apply_synced(&ticket, cart.cart_id, cart.items) {
            return Ok(None);
        }
        info!(cart_id = %cart.cart_id, ?outcome, "Cart synced after login");
        Ok(Some(outcome))
    }

    /// Wait until no merge is in flight and return the settled status.
    pub async fn settled(&self) -> MergeStatus {
        let mut rx = self.inner.status.subscribe();
        let settled = rx
            .wait_for(|status| !status.is_pending())
            .await
            .map(|status| status.clone());
        settled.unwrap_or_else(|_| self.status())
    }

    /// Check that the cart is synced for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::MergeFailed` if the last merge failed and
    /// `CartError::MergeIncomplete` if it has not completed for this user.
    pub fn ensure_ready(&self, user_id: UserId) -> Result<()> {
        match self.status() {
            MergeStatus::Completed(id) if id == user_id => Ok(()),
            MergeStatus::Failed { message, .. } => Err(CartError::MergeFailed(message)),
            _ => Err(CartError::MergeIncomplete),
        }
    }

    /// Forget the last merge (logout).
    pub fn reset(&self) {
        self.inner.status.send_replace(MergeStatus::Idle);
    }
}
