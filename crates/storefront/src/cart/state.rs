//! Cart state container.
//!
//! [`CartStore`] is the single source of truth for the cart. Every change
//! lands through [`CartStore::replace_cart`] (or one of the small UI toggles),
//! which is also the one place that decides where the cart lives:
//!
//! - no cart id: the cart is a guest cart and the snapshot is written to the
//!   guest store after every change
//! - cart id present: the backend owns the cart and the guest snapshot is
//!   removed
//!
//! Observers subscribe to a `tokio::sync::watch` channel and see every
//! change.
//!
//! # Request ordering
//!
//! Sync operations take a [`RequestTicket`] before going to the network.
//! A result is applied only if no later-issued result has landed already, so
//! a slow response cannot overwrite a newer one. [`CartStore::reset`]
//! invalidates all outstanding tickets.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, warn};
use wearables_core::{CartId, CartItem, Price, ProductId};

use crate::backend::conversions::lenient_items;
use crate::guest::GuestCartStore;
use crate::storage::StorageError;

// =============================================================================
// CartState
// =============================================================================

/// Snapshot of the cart as seen by the UI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    /// Server identity; `None` while the cart is a guest cart.
    pub cart_id: Option<CartId>,
    /// Line items in insertion/merge order.
    pub items: Vec<CartItem>,
    /// Cart drawer visibility.
    pub is_open: bool,
    /// At least one sync operation is in flight.
    pub loading: bool,
}

/// Where the cart currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartIdentity {
    /// Client-side only, persisted in the guest store.
    Guest,
    /// Server cart; the backend is authoritative.
    Synced(CartId),
}

impl CartState {
    /// Total number of units (sum of quantities).
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.items
            .iter()
            .map(|item| u64::from(item.quantity.get()))
            .sum()
    }

    /// Total price (sum of quantity × unit price).
    #[must_use]
    pub fn total_price(&self) -> Price {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Current identity state.
    #[must_use]
    pub const fn identity(&self) -> CartIdentity {
        match self.cart_id {
            Some(id) => CartIdentity::Synced(id),
            None => CartIdentity::Guest,
        }
    }

    /// Whether the cart holds a line for `product_id`.
    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.items.iter().any(|item| item.product_id == product_id)
    }
}

/// Coalesce duplicate products (summing quantities, keeping the first
/// position) and re-derive every line id.
#[must_use]
pub fn normalize_items(items: Vec<CartItem>) -> Vec<CartItem> {
    let mut normalized: Vec<CartItem> = Vec::with_capacity(items.len());

    for item in items {
        if let Some(existing) = normalized
            .iter_mut()
            .find(|existing| existing.product_id == item.product_id)
        {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            normalized.push(CartItem::new(
                item.product_id,
                item.name,
                item.unit_price,
                item.image,
                item.quantity,
            ));
        }
    }

    normalized
}

// =============================================================================
// Request tickets
// =============================================================================

#[derive(Debug, Default)]
struct Tickets {
    /// Last ticket handed out.
    issued: u64,
    /// Ticket of the last applied full-cart result.
    applied: u64,
    /// Tickets at or below this value were invalidated by a reset.
    floor: u64,
    /// Requests currently in flight.
    in_flight: usize,
}

/// Ordering token for one sync operation.
///
/// Holding a ticket marks the cart as loading; dropping the last
/// outstanding ticket clears the flag.
pub struct RequestTicket {
    seq: u64,
    store: CartStore,
}

impl RequestTicket {
    /// Sequence number of this ticket.
    #[must_use]
    pub const fn seq(&self) -> u64 {
        self.seq
    }
}

impl Drop for RequestTicket {
    fn drop(&mut self) {
        let idle = {
            let mut tickets = self.store.inner.tickets.lock();
            tickets.in_flight = tickets.in_flight.saturating_sub(1);
            tickets.in_flight == 0
        };
        if idle {
            self.store.inner.state.send_if_modified(|state| {
                let changed = state.loading;
                state.loading = false;
                changed
            });
        }
    }
}

// =============================================================================
// CartStore
// =============================================================================

/// Process-wide cart state container.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    state: watch::Sender<CartState>,
    guest: GuestCartStore,
    tickets: Mutex<Tickets>,
}

impl CartStore {
    /// Create an empty guest cart backed by `guest`.
    #[must_use]
    pub fn new(guest: GuestCartStore) -> Self {
        Self::with_state(guest, CartState::default())
    }

    /// Create a cart rehydrated from the guest snapshot.
    ///
    /// Invalid snapshot lines are dropped; nothing is written back until the
    /// first change.
    #[must_use]
    pub fn rehydrate(guest: GuestCartStore) -> Self {
        let items = normalize_items(lenient_items(guest.load()));
        debug!(items = items.len(), "Rehydrated guest cart");
        Self::with_state(
            guest,
            CartState {
                items,
                ..CartState::default()
            },
        )
    }

    fn with_state(guest: GuestCartStore, initial: CartState) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            inner: Arc::new(CartStoreInner {
                state,
                guest,
                tickets: Mutex::new(Tickets::default()),
            }),
        }
    }

    /// The guest store this container persists to.
    #[must_use]
    pub fn guest_store(&self) -> &GuestCartStore {
        &self.inner.guest
    }

    // =========================================================================
    // Selectors
    // =========================================================================

    /// Clone of the whole state.
    #[must_use]
    pub fn snapshot(&self) -> CartState {
        self.inner.state.borrow().clone()
    }

    /// Line items.
    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.inner.state.borrow().items.clone()
    }

    /// Sum of quantities.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.inner.state.borrow().total_items()
    }

    /// Sum of quantity × unit price.
    #[must_use]
    pub fn total_price(&self) -> Price {
        self.inner.state.borrow().total_price()
    }

    /// Drawer visibility.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.inner.state.borrow().is_open
    }

    /// Whether a sync operation is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    /// Server cart id, if synced.
    #[must_use]
    pub fn cart_id(&self) -> Option<CartId> {
        self.inner.state.borrow().cart_id
    }

    /// Guest or synced.
    #[must_use]
    pub fn identity(&self) -> CartIdentity {
        self.inner.state.borrow().identity()
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.inner.state.subscribe()
    }

    // =========================================================================
    // Drawer
    // =========================================================================

    /// Show the cart drawer.
    pub fn open_cart(&self) {
        self.set_open(true);
    }

    /// Hide the cart drawer.
    pub fn close_cart(&self) {
        self.set_open(false);
    }

    /// Flip drawer visibility.
    pub fn toggle_cart(&self) {
        self.inner.state.send_modify(|state| state.is_open = !state.is_open);
    }

    fn set_open(&self, open: bool) {
        self.inner.state.send_if_modified(|state| {
            let changed = state.is_open != open;
            state.is_open = open;
            changed
        });
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Replace the cart contents.
    ///
    /// Items are normalized (duplicates coalesced, line ids re-derived).
    /// Passing a cart id makes the cart synced and removes the guest
    /// snapshot. Passing `None` keeps the current identity: a guest cart is
    /// written to the guest store, a synced cart stays synced (only
    /// [`CartStore::reset`] returns a cart to guest).
    pub fn replace_cart(&self, items: Vec<CartItem>, cart_id: Option<CartId>) {
        let items = normalize_items(items);
        let mut identity = CartIdentity::Guest;

        self.inner.state.send_modify(|state| {
            if cart_id.is_some() {
                state.cart_id = cart_id;
            }
            state.items = items;
            identity = state.identity();
        });

        self.persist(identity);
    }

    /// Remove all items, keeping identity and drawer state.
    pub fn clear_cart(&self) {
        let mut identity = CartIdentity::Guest;
        self.inner.state.send_modify(|state| {
            state.items.clear();
            identity = state.identity();
        });
        self.persist(identity);
    }

    /// Reset to a fresh, empty guest cart (logout).
    ///
    /// Outstanding sync requests are invalidated and their results will be
    /// discarded.
    pub fn reset(&self) {
        let loading = {
            let mut tickets = self.inner.tickets.lock();
            tickets.floor = tickets.issued;
            tickets.applied = tickets.issued;
            tickets.in_flight > 0
        };
        self.inner.state.send_replace(CartState {
            loading,
            ..CartState::default()
        });
        if let Err(e) = self.inner.guest.clear() {
            report_storage(&e);
        }
    }

    fn persist(&self, identity: CartIdentity) {
        let result = match identity {
            CartIdentity::Synced(_) => self.inner.guest.clear(),
            CartIdentity::Guest => self.inner.guest.save(&self.inner.state.borrow().items),
        };
        if let Err(e) = result {
            report_storage(&e);
        }
    }

    // =========================================================================
    // Sync results
    // =========================================================================

    /// Take a ticket for a sync operation and mark the cart as loading.
    #[must_use]
    pub fn begin_request(&self) -> RequestTicket {
        let seq = {
            let mut tickets = self.inner.tickets.lock();
            tickets.issued += 1;
            tickets.in_flight += 1;
            tickets.issued
        };
        self.inner.state.send_if_modified(|state| {
            let changed = !state.loading;
            state.loading = true;
            changed
        });
        RequestTicket {
            seq,
            store: self.clone(),
        }
    }

    /// Apply a full server cart if `ticket` is still current.
    ///
    /// Returns `false` if the result was stale and discarded.
    pub fn apply_synced(
        &self,
        ticket: &RequestTicket,
        cart_id: CartId,
        items: Vec<CartItem>,
    ) -> bool {
        {
            let mut tickets = self.inner.tickets.lock();
            if ticket.seq <= tickets.applied || ticket.seq <= tickets.floor {
                debug!(
                    seq = ticket.seq,
                    applied = tickets.applied,
                    "Discarding stale cart response"
                );
                return false;
            }
            tickets.applied = ticket.seq;
        }
        self.replace_cart(items, Some(cart_id));
        true
    }

    /// Drop `product_id` from the items after a confirmed server removal.
    ///
    /// Filtering is safe against any earlier result, so only a reset makes
    /// this stale. Full-cart results issued before the removal are discarded
    /// from here on.
    pub fn apply_removal(&self, ticket: &RequestTicket, product_id: ProductId) -> bool {
        if !self.advance_applied(ticket) {
            debug!(seq = ticket.seq, "Discarding removal after reset");
            return false;
        }
        let items = self
            .items()
            .into_iter()
            .filter(|item| item.product_id != product_id)
            .collect();
        self.replace_cart(items, None);
        true
    }

    /// Empty the items after a confirmed server clear.
    ///
    /// Full-cart results issued before the clear are discarded from here on.
    pub fn apply_clear(&self, ticket: &RequestTicket) -> bool {
        if !self.advance_applied(ticket) {
            debug!(seq = ticket.seq, "Discarding clear after reset");
            return false;
        }
        self.clear_cart();
        true
    }

    /// Record `ticket` as applied unless a reset has invalidated it.
    fn advance_applied(&self, ticket: &RequestTicket) -> bool {
        let mut tickets = self.inner.tickets.lock();
        if ticket.seq <= tickets.floor {
            return false;
        }
        tickets.applied = tickets.applied.max(ticket.seq);
        true
    }
}

/// Storage failures never reach the caller; the in-memory cart stays correct
/// for this session.
fn report_storage(err: &StorageError) {
    let event_id = sentry::capture_error(err);
    warn!(error = %err, sentry_event_id = %event_id, "Failed to persist guest cart");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wearables_core::Quantity;

    use super::*;
    use crate::guest::GUEST_CART_KEY;
    use crate::storage::{DurableStorage, MemoryStorage};

    fn item(product_id: i32, price: u32, quantity: i64) -> CartItem {
        CartItem::new(
            ProductId::new(product_id),
            format!("Product {product_id}"),
            Price::from_units(price),
            format!("/img/{product_id}.png"),
            Quantity::new(quantity).unwrap(),
        )
    }

    fn store() -> (CartStore, MemoryStorage) {
        let storage = MemoryStorage::new();
        let guest = GuestCartStore::new(Arc::new(storage.clone()));
        (CartStore::new(guest), storage)
    }

    #[test]
    fn test_totals() {
        let (store, _) = store();
        store.replace_cart(vec![item(1, 100, 2), item(2, 50, 1)], None);

        assert_eq!(store.total_price(), Price::from_units(250));
        assert_eq!(store.total_items(), 3);
    }

    #[test]
    fn test_empty_totals() {
        let (store, _) = store();
        assert_eq!(store.total_price(), Price::ZERO);
        assert_eq!(store.total_items(), 0);
    }

    #[test]
    fn test_drawer_toggles() {
        let (store, _) = store();
        assert!(!store.is_open());
        store.open_cart();
        assert!(store.is_open());
        store.toggle_cart();
        assert!(!store.is_open());
        store.toggle_cart();
        store.close_cart();
        assert!(!store.is_open());
    }

    #[test]
    fn test_guest_replace_writes_snapshot() {
        let (store, storage) = store();
        store.replace_cart(vec![item(1, 100, 2)], None);

        let raw = storage.get(GUEST_CART_KEY).unwrap().unwrap();
        assert!(raw.contains("\"productId\":1"));
        assert_eq!(store.cart_id(), None);
        assert_eq!(store.identity(), CartIdentity::Guest);
    }

    #[test]
    fn test_synced_replace_clears_snapshot() {
        let (store, storage) = store();
        store.replace_cart(vec![item(1, 100, 2)], None);
        store.replace_cart(vec![item(1, 100, 5)], Some(CartId::new(10)));

        assert_eq!(storage.get(GUEST_CART_KEY).unwrap(), None);
        assert_eq!(store.identity(), CartIdentity::Synced(CartId::new(10)));
    }

    #[test]
    fn test_replace_without_id_keeps_synced_identity() {
        let (store, storage) = store();
        store.replace_cart(vec![item(1, 100, 1)], Some(CartId::new(10)));
        store.replace_cart(vec![], None);

        assert_eq!(store.cart_id(), Some(CartId::new(10)));
        assert_eq!(storage.get(GUEST_CART_KEY).unwrap(), None);
    }

    #[test]
    fn test_replace_coalesces_duplicates() {
        let (store, _) = store();
        store.replace_cart(vec![item(1, 100, 2), item(2, 50, 1), item(1, 100, 3)], None);

        let items = store.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items.first().unwrap().quantity.get(), 5);
        assert_eq!(items.first().unwrap().line_id.as_str(), "line-1");
    }

    #[test]
    fn test_rehydrate_from_snapshot() {
        let storage = MemoryStorage::new();
        storage
            .set(
                GUEST_CART_KEY,
                r#"[{"productId":1,"name":"Band","price":100,"image":"","quantity":2},
                    {"productId":2,"name":"Bad","price":10,"image":"","quantity":0}]"#,
            )
            .unwrap();

        let store = CartStore::rehydrate(GuestCartStore::new(Arc::new(storage)));
        let items = store.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items.first().unwrap().name, "Band");
        assert_eq!(store.cart_id(), None);
    }

    #[test]
    fn test_rehydrate_corrupt_snapshot_is_empty() {
        let storage = MemoryStorage::new();
        storage.set(GUEST_CART_KEY, "garbage").unwrap();
        let store = CartStore::rehydrate(GuestCartStore::new(Arc::new(storage)));
        assert!(store.items().is_empty());
    }

    #[test]
    fn test_clear_cart_guest_writes_empty_snapshot() {
        let (store, storage) = store();
        store.replace_cart(vec![item(1, 100, 2)], None);
        store.clear_cart();

        assert!(store.items().is_empty());
        assert_eq!(storage.get(GUEST_CART_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_reset_returns_to_empty_guest() {
        let (store, storage) = store();
        store.open_cart();
        store.replace_cart(vec![item(1, 100, 2)], Some(CartId::new(3)));
        store.reset();

        assert_eq!(store.snapshot(), CartState::default());
        assert_eq!(storage.get(GUEST_CART_KEY).unwrap(), None);
    }

    #[test]
    fn test_loading_follows_tickets() {
        let (store, _) = store();
        let first = store.begin_request();
        let second = store.begin_request();
        assert!(store.is_loading());
        drop(first);
        assert!(store.is_loading());
        drop(second);
        assert!(!store.is_loading());
    }

    #[test]
    fn test_stale_result_discarded() {
        let (store, _) = store();
        let older = store.begin_request();
        let newer = store.begin_request();

        assert!(store.apply_synced(&newer, CartId::new(1), vec![item(1, 100, 3)]));
        assert!(!store.apply_synced(&older, CartId::new(1), vec![item(1, 100, 1)]));

        assert_eq!(store.items().first().unwrap().quantity.get(), 3);
    }

    #[test]
    fn test_in_order_results_both_apply() {
        let (store, _) = store();
        let older = store.begin_request();
        let newer = store.begin_request();

        assert!(store.apply_synced(&older, CartId::new(1), vec![item(1, 100, 1)]));
        assert!(store.apply_synced(&newer, CartId::new(1), vec![item(1, 100, 3)]));
        assert_eq!(store.items().first().unwrap().quantity.get(), 3);
    }

    #[test]
    fn test_reset_invalidates_in_flight_results() {
        let (store, _) = store();
        let ticket = store.begin_request();
        store.reset();

        assert!(!store.apply_synced(&ticket, CartId::new(1), vec![item(1, 100, 1)]));
        assert!(!store.apply_removal(&ticket, ProductId::new(1)));
        assert!(store.items().is_empty());
        assert_eq!(store.cart_id(), None);
    }

    #[test]
    fn test_apply_removal_filters_only_target() {
        let (store, _) = store();
        store.replace_cart(vec![item(7, 10, 1), item(8, 20, 2)], Some(CartId::new(10)));
        let ticket = store.begin_request();

        assert!(store.apply_removal(&ticket, ProductId::new(7)));
        let items = store.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items.first().unwrap().product_id, ProductId::new(8));
        assert_eq!(items.first().unwrap().quantity.get(), 2);
    }

    #[test]
    fn test_older_result_after_removal_discarded() {
        let (store, _) = store();
        store.replace_cart(vec![item(7, 10, 1), item(8, 20, 2)], Some(CartId::new(10)));
        let fetch = store.begin_request();
        let removal = store.begin_request();

        assert!(store.apply_removal(&removal, ProductId::new(7)));
        assert!(!store.apply_synced(
            &fetch,
            CartId::new(10),
            vec![item(7, 10, 1), item(8, 20, 2)]
        ));

        let items = store.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items.first().unwrap().product_id, ProductId::new(8));
    }

    #[test]
    fn test_older_result_after_clear_discarded() {
        let (store, _) = store();
        store.replace_cart(vec![item(7, 10, 1)], Some(CartId::new(10)));
        let fetch = store.begin_request();
        let clear = store.begin_request();

        assert!(store.apply_clear(&clear));
        assert!(!store.apply_synced(&fetch, CartId::new(10), vec![item(7, 10, 1)]));
        assert!(store.items().is_empty());
        assert_eq!(store.cart_id(), Some(CartId::new(10)));
    }

    #[test]
    fn test_newer_result_after_removal_applies() {
        let (store, _) = store();
        store.replace_cart(vec![item(7, 10, 1), item(8, 20, 2)], Some(CartId::new(10)));
        let removal = store.begin_request();
        let add = store.begin_request();

        assert!(store.apply_removal(&removal, ProductId::new(7)));
        assert!(store.apply_synced(
            &add,
            CartId::new(10),
            vec![item(8, 20, 2), item(9, 5, 1)]
        ));
        assert_eq!(store.items().len(), 2);
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let (store, _) = store();
        let mut rx = store.subscribe();

        store.replace_cart(vec![item(1, 100, 1)], None);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().items.len(), 1);
    }
}
