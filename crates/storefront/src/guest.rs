//! Guest cart persistence.
//!
//! Thin wrapper around [`DurableStorage`] holding the guest cart snapshot
//! under a fixed key. Loading never fails: missing or corrupt data reads as
//! an empty cart. Item shape is not validated here; the cart state
//! container normalizes whatever comes back.

use std::sync::Arc;

use tracing::{debug, warn};
use wearables_core::CartItem;

use crate::backend::CartLine;
use crate::storage::{DurableStorage, StorageError};

/// Storage key of the guest cart snapshot.
pub const GUEST_CART_KEY: &str = "guest_cart";

/// Reads and writes the guest cart snapshot.
#[derive(Clone)]
pub struct GuestCartStore {
    storage: Arc<dyn DurableStorage>,
}

impl GuestCartStore {
    /// Create a guest store over `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        Self { storage }
    }

    /// Serialize and write `items` as the snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage write fails.
    pub fn save(&self, items: &[CartItem]) -> Result<(), StorageError> {
        let lines: Vec<CartLine> = items.iter().map(CartLine::from).collect();
        let json = serde_json::to_string(&lines)?;
        self.storage.set(GUEST_CART_KEY, &json)?;
        debug!(lines = lines.len(), "Saved guest cart snapshot");
        Ok(())
    }

    /// Read the snapshot. Missing, unreadable or corrupt data yields an
    /// empty list.
    #[must_use]
    pub fn load(&self) -> Vec<CartLine> {
        let raw = match self.storage.get(GUEST_CART_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read guest cart snapshot, treating as empty");
                return Vec::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "Corrupt guest cart snapshot, treating as empty");
            Vec::new()
        })
    }

    /// Remove the snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage removal fails.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(GUEST_CART_KEY)?;
        debug!("Cleared guest cart snapshot");
        Ok(())
    }

    /// Whether a snapshot is currently stored.
    #[must_use]
    pub fn exists(&self) -> bool {
        matches!(self.storage.get(GUEST_CART_KEY), Ok(Some(_)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wearables_core::{Price, ProductId, Quantity};

    use super::*;
    use crate::storage::MemoryStorage;

    fn store() -> (GuestCartStore, MemoryStorage) {
        let storage = MemoryStorage::new();
        (GuestCartStore::new(Arc::new(storage.clone())), storage)
    }

    #[test]
    fn test_save_then_load() {
        let (guest, _) = store();
        let items = vec![CartItem::new(
            ProductId::new(2),
            "Pulse Band",
            Price::from_units(50),
            "/img/pulse.png",
            Quantity::new(3).unwrap(),
        )];

        guest.save(&items).unwrap();
        let lines = guest.load();

        assert_eq!(lines.len(), 1);
        let line = lines.first().unwrap();
        assert_eq!(line.product_id, ProductId::new(2));
        assert_eq!(line.quantity, 3);
        assert_eq!(line.name, "Pulse Band");
    }

    #[test]
    fn test_load_missing_is_empty() {
        let (guest, _) = store();
        assert!(guest.load().is_empty());
        assert!(!guest.exists());
    }

    #[test]
    fn test_load_corrupt_is_empty() {
        let (guest, storage) = store();
        storage.set(GUEST_CART_KEY, "{not json").unwrap();
        assert!(guest.load().is_empty());

        storage
            .set(GUEST_CART_KEY, r#"{"productId": 1}"#)
            .unwrap();
        assert!(guest.load().is_empty());
    }

    #[test]
    fn test_load_does_not_validate_shape() {
        let (guest, storage) = store();
        storage
            .set(
                GUEST_CART_KEY,
                r#"[{"productId": 1, "name": "x", "price": 10, "image": "", "quantity": 0}]"#,
            )
            .unwrap();
        let lines = guest.load();
        assert_eq!(lines.first().unwrap().quantity, 0);
    }

    #[test]
    fn test_clear_removes_key() {
        let (guest, storage) = store();
        guest.save(&[]).unwrap();
        assert!(guest.exists());
        guest.clear().unwrap();
        assert_eq!(storage.get(GUEST_CART_KEY).unwrap(), None);
    }
}
