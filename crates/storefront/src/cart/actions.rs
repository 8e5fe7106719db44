//! UI-facing cart actions.
//!
//! Each action picks the synced path when a user is signed in and the cart
//! has a server id, and the guest path otherwise. Guest changes go straight
//! through [`CartStore::replace_cart`], which persists the snapshot.

use tracing::{info, instrument};
use wearables_core::{CartId, ProductId, ProductSummary, Quantity, UserId};

use super::merge::LoginMerge;
use super::state::CartStore;
use super::sync::CartSync;
use crate::error::{CartError, Result, add_breadcrumb};
use crate::order::OrderSummary;
use crate::session::SessionProvider;

/// Where an action will be applied.
enum Target {
    Guest,
    Synced {
        user_id: UserId,
        cart_id: CartId,
    },
}

/// Cart actions as triggered from product pages and the cart drawer.
#[derive(Clone)]
pub struct CartActions {
    store: CartStore,
    sync: CartSync,
    session: SessionProvider,
    merge: LoginMerge,
}

impl CartActions {
    /// Wire the actions to their collaborators.
    #[must_use]
    pub fn new(
        store: CartStore,
        sync: CartSync,
        session: SessionProvider,
        merge: LoginMerge,
    ) -> Self {
        Self {
            store,
            sync,
            session,
            merge,
        }
    }

    fn target(&self) -> Target {
        match (self.session.current_user(), self.store.cart_id()) {
            (Some(user), Some(cart_id)) => Target::Synced {
                user_id: user.id,
                cart_id,
            },
            _ => Target::Guest,
        }
    }

    /// Add `quantity` units of `product`. Quantities below one add one unit.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Backend` if the synced add fails.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add(&self, product: &ProductSummary, quantity: i64) -> Result<()> {
        let quantity = Quantity::clamped(quantity);
        let product_id = product.id.to_string();
        add_breadcrumb("cart", "Added item", Some(&[("product_id", product_id.as_str())]));

        match self.target() {
            Target::Synced { user_id, .. } => {
                self.sync.add_item(user_id, product.id, quantity).await?;
            }
            Target::Guest => {
                let mut items = self.store.items();
                if let Some(existing) = items.iter_mut().find(|item| item.product_id == product.id)
                {
                    existing.quantity = existing.quantity.saturating_add(quantity);
                } else {
                    items.push(product.to_item(quantity));
                }
                self.store.replace_cart(items, None);
            }
        }
        Ok(())
    }

    /// Set the quantity of a line. Quantities below one are clamped to one.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Backend` if the synced update fails.
    #[instrument(skip(self))]
    pub async fn change_quantity(&self, product_id: ProductId, quantity: i64) -> Result<()> {
        match self.target() {
            Target::Synced { cart_id, .. } => {
                self.sync
                    .update_quantity(cart_id, product_id, quantity)
                    .await?;
            }
            Target::Guest => {
                let quantity = Quantity::clamped(quantity);
                let items = self
                    .store
                    .items()
                    .into_iter()
                    .map(|item| {
                        if item.product_id == product_id {
                            item.with_quantity(quantity)
                        } else {
                            item
                        }
                    })
                    .collect();
                self.store.replace_cart(items, None);
            }
        }
        Ok(())
    }

    /// Remove a product's line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Backend` if the synced removal fails.
    #[instrument(skip(self))]
    pub async fn remove(&self, product_id: ProductId) -> Result<()> {
        let id = product_id.to_string();
        add_breadcrumb("cart", "Removed item", Some(&[("product_id", id.as_str())]));

        match self.target() {
            Target::Synced { cart_id, .. } => {
                self.sync.remove_item(cart_id, product_id).await?;
            }
            Target::Guest => {
                let items = self
                    .store
                    .items()
                    .into_iter()
                    .filter(|item| item.product_id != product_id)
                    .collect();
                self.store.replace_cart(items, None);
            }
        }
        Ok(())
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Backend` if the synced clear fails.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        match self.target() {
            Target::Synced { cart_id, .. } => self.sync.clear_remote(cart_id).await?,
            Target::Guest => self.store.clear_cart(),
        }
        Ok(())
    }

    /// Validate the cart for checkout and return its totals.
    ///
    /// # Errors
    ///
    /// - `CartError::EmptyCart` if there is nothing to buy (the drawer is
    ///   closed)
    /// - `CartError::NotAuthenticated` if nobody is signed in
    /// - `CartError::MergeIncomplete` or `CartError::MergeFailed` if the
    ///   login merge has not completed
    #[instrument(skip(self))]
    pub fn begin_checkout(&self) -> Result<OrderSummary> {
        let items = self.store.items();
        if items.is_empty() {
            self.store.close_cart();
            return Err(CartError::EmptyCart);
        }

        let user = self.session.current_user().ok_or(CartError::NotAuthenticated)?;
        self.merge.ensure_ready(user.id)?;

        self.store.close_cart();
        let summary = OrderSummary::from_items(&items);
        info!(items = summary.item_count, total = %summary.total, "Proceeding to checkout");
        Ok(summary)
    }
}
