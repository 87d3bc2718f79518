//! In-process [`EntityStore`].
//!
//! Tables are insertion-ordered vectors behind a `may` read/write lock. Serialized units take
//! a separate `may` mutex, so they exclude each other while plain reads keep flowing; a unit
//! receives a handle that is already inside the unit, and nested units run inline.

use super::{EntityStore, StoreError, Unit};
use crate::error::ServiceError;
use crate::model::{Category, Product, ProductFilter, Tier, User, WishlistEntry};
use crate::pagination::{Page, PageRequest};
use may::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    categories: Vec<Category>,
    products: Vec<Product>,
    wishlist: Vec<WishlistEntry>,
}

struct Shared {
    tables: RwLock<Tables>,
    units: Mutex<()>,
}

/// Entity store held entirely in memory
///
/// Cloning yields another handle onto the same tables.
#[derive(Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
    in_unit: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                tables: RwLock::new(Tables::default()),
                units: Mutex::new(()),
            }),
            in_unit: false,
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.shared
            .tables
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.shared
            .tables
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    /// Overwrite a category's parent without any checks
    ///
    /// Lets tests and repair tooling reproduce corrupt hierarchies (cycles, dangling
    /// parents) that the services themselves never write.
    pub fn force_parent(&self, id: Uuid, parent: Option<Uuid>) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        match tables.categories.iter_mut().find(|c| c.id == id) {
            Some(category) => {
                category.parent = parent;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn replace<T: Clone>(rows: &mut [T], updated: &T, same: impl Fn(&T) -> bool) -> bool {
    match rows.iter_mut().find(|row| same(row)) {
        Some(row) => {
            *row = updated.clone();
            true
        }
        None => false,
    }
}

fn remove<T>(rows: &mut Vec<T>, matches: impl Fn(&T) -> bool) -> u64 {
    let before = rows.len();
    rows.retain(|row| !matches(row));
    (before - rows.len()) as u64
}

fn user_conflict(users: &[User], candidate: &User) -> Option<&'static str> {
    users
        .iter()
        .filter(|u| u.id != candidate.id)
        .find_map(|u| {
            if u.username == candidate.username {
                Some("username")
            } else if u.email == candidate.email {
                Some("email")
            } else {
                None
            }
        })
}

impl EntityStore for MemoryStore {
    fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.iter().find(|u| u.id == id).cloned())
    }

    fn find_user_by_login(&self, login: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .read()?
            .users
            .iter()
            .find(|u| u.username == login || u.email == login)
            .cloned())
    }

    fn find_user_conflicts(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        exclude: Option<Uuid>,
    ) -> Result<Vec<User>, StoreError> {
        Ok(self
            .read()?
            .users
            .iter()
            .filter(|u| Some(u.id) != exclude)
            .filter(|u| {
                username.is_some_and(|name| u.username == name)
                    || email.is_some_and(|mail| u.email == mail)
            })
            .cloned()
            .collect())
    }

    fn list_users(&self, tier: Tier, page: PageRequest) -> Result<Page<User>, StoreError> {
        let matching: Vec<User> = self
            .read()?
            .users
            .iter()
            .rev()
            .filter(|u| u.tier == tier)
            .cloned()
            .collect();
        Ok(Page::from_all(matching, page))
    }

    fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if tables.users.iter().any(|u| u.id == user.id) {
            return Err(StoreError::Duplicate("user id".to_string()));
        }
        if let Some(field) = user_conflict(&tables.users, user) {
            return Err(StoreError::Duplicate(field.to_string()));
        }
        tables.users.push(user.clone());
        Ok(())
    }

    fn update_user(&self, user: &User) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        if let Some(field) = user_conflict(&tables.users, user) {
            return Err(StoreError::Duplicate(field.to_string()));
        }
        Ok(replace(&mut tables.users, user, |u| u.id == user.id))
    }

    fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(remove(&mut self.write()?.users, |u| u.id == id) > 0)
    }

    fn find_category(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        Ok(self.read()?.categories.iter().find(|c| c.id == id).cloned())
    }

    fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        Ok(self.read()?.categories.clone())
    }

    fn child_categories(&self, parent: Uuid) -> Result<Vec<Category>, StoreError> {
        Ok(self
            .read()?
            .categories
            .iter()
            .filter(|c| c.parent == Some(parent))
            .cloned()
            .collect())
    }

    fn insert_category(&self, category: &Category) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if tables.categories.iter().any(|c| c.id == category.id) {
            return Err(StoreError::Duplicate("category id".to_string()));
        }
        tables.categories.push(category.clone());
        Ok(())
    }

    fn update_category(&self, category: &Category) -> Result<bool, StoreError> {
        Ok(replace(&mut self.write()?.categories, category, |c| {
            c.id == category.id
        }))
    }

    fn delete_category(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(remove(&mut self.write()?.categories, |c| c.id == id) > 0)
    }

    fn find_product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        Ok(self.read()?.products.iter().find(|p| p.id == id).cloned())
    }

    fn list_products(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<Page<Product>, StoreError> {
        let mut matching: Vec<Product> = self
            .read()?
            .products
            .iter()
            .rev()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Page::from_all(matching, page))
    }

    fn products_owned_by(&self, owner: Uuid) -> Result<Vec<Product>, StoreError> {
        Ok(self
            .read()?
            .products
            .iter()
            .filter(|p| p.owner == owner)
            .cloned()
            .collect())
    }

    fn count_products_in_category(&self, category: Uuid) -> Result<u64, StoreError> {
        Ok(self
            .read()?
            .products
            .iter()
            .filter(|p| p.category == category)
            .count() as u64)
    }

    fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if tables.products.iter().any(|p| p.id == product.id) {
            return Err(StoreError::Duplicate("product id".to_string()));
        }
        tables.products.push(product.clone());
        Ok(())
    }

    fn update_product(&self, product: &Product) -> Result<bool, StoreError> {
        Ok(replace(&mut self.write()?.products, product, |p| {
            p.id == product.id
        }))
    }

    fn delete_product(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(remove(&mut self.write()?.products, |p| p.id == id) > 0)
    }

    fn find_wishlist_entry(
        &self,
        user: Uuid,
        product: Uuid,
    ) -> Result<Option<WishlistEntry>, StoreError> {
        Ok(self
            .read()?
            .wishlist
            .iter()
            .find(|e| e.user == user && e.product == product)
            .cloned())
    }

    fn list_wishlist(&self, user: Uuid) -> Result<Vec<WishlistEntry>, StoreError> {
        Ok(self
            .read()?
            .wishlist
            .iter()
            .filter(|e| e.user == user)
            .cloned()
            .collect())
    }

    fn insert_wishlist_entry(&self, entry: &WishlistEntry) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if tables
            .wishlist
            .iter()
            .any(|e| e.id == entry.id || (e.user == entry.user && e.product == entry.product))
        {
            return Err(StoreError::Duplicate("wishlist entry".to_string()));
        }
        tables.wishlist.push(entry.clone());
        Ok(())
    }

    fn delete_wishlist_entry(&self, user: Uuid, product: Uuid) -> Result<bool, StoreError> {
        Ok(remove(&mut self.write()?.wishlist, |e| {
            e.user == user && e.product == product
        }) > 0)
    }

    fn delete_wishlist_entries(&self, ids: &[Uuid]) -> Result<u64, StoreError> {
        Ok(remove(&mut self.write()?.wishlist, |e| ids.contains(&e.id)))
    }

    fn delete_wishlist_by_user(&self, user: Uuid) -> Result<u64, StoreError> {
        Ok(remove(&mut self.write()?.wishlist, |e| e.user == user))
    }

    fn serialized(&self, unit: &mut Unit<'_>) -> Result<(), ServiceError> {
        if self.in_unit {
            return unit(self);
        }
        let _held = self
            .shared
            .units
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store unit lock poisoned".to_string()))?;
        let scoped = MemoryStore {
            shared: Arc::clone(&self.shared),
            in_unit: true,
        };
        unit(&scoped)
    }
}
