use crate::auth::Caller;
use crate::error::{EntityKind, ServiceError};
use crate::model::{WishlistEntry, WishlistItem};
use crate::pagination::{Page, PageRequest};
use crate::store::{EntityStore, StoreError};
use chrono::Utc;
use uuid::Uuid;

/// Per-user wishlists
///
/// Every operation acts on the caller's own list; there is no cross-user access.
pub struct WishlistService<'a> {
    store: &'a dyn EntityStore,
}

impl<'a> WishlistService<'a> {
    pub fn new(store: &'a dyn EntityStore) -> Self {
        Self { store }
    }

    pub fn add(&self, caller: &Caller, product: Uuid) -> Result<WishlistItem, ServiceError> {
        let product = self
            .store
            .find_product(product)?
            .ok_or_else(|| ServiceError::not_found(EntityKind::Product, product))?;

        let entry = WishlistEntry {
            id: Uuid::new_v4(),
            user: caller.id,
            product: product.id,
            created_at: Utc::now(),
        };
        match self.store.insert_wishlist_entry(&entry) {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => {
                return Err(ServiceError::Conflict(
                    "Product already in wishlist".to_string(),
                ))
            }
            Err(e) => return Err(e.into()),
        }

        log::debug!("user {} wishlisted product {}", caller.id, product.id);
        Ok(WishlistItem {
            id: entry.id,
            product,
            added_at: entry.created_at,
        })
    }

    /// The caller's wishlist in the order items were added
    ///
    /// Entries whose product has since been deleted are purged before paging, so totals
    /// only count live items.
    pub fn list(
        &self,
        caller: &Caller,
        page: PageRequest,
    ) -> Result<Page<WishlistItem>, ServiceError> {
        let mut items = Vec::new();
        let mut stale = Vec::new();
        for entry in self.store.list_wishlist(caller.id)? {
            match self.store.find_product(entry.product)? {
                Some(product) => items.push(WishlistItem {
                    id: entry.id,
                    product,
                    added_at: entry.created_at,
                }),
                None => stale.push(entry.id),
            }
        }

        if !stale.is_empty() {
            let purged = self.store.delete_wishlist_entries(&stale)?;
            log::debug!(
                "purged {} stale wishlist entries for user {}",
                purged,
                caller.id
            );
        }

        Ok(Page::from_all(items, page))
    }

    pub fn remove(&self, caller: &Caller, product: Uuid) -> Result<(), ServiceError> {
        if !self.store.delete_wishlist_entry(caller.id, product)? {
            return Err(ServiceError::not_found(EntityKind::WishlistEntry, product));
        }
        Ok(())
    }
}
