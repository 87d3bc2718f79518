//! Persistence boundary.
//!
//! Services talk to storage only through [`EntityStore`]. Two implementations ship with the
//! crate: [`MemoryStore`] for tests and embedded use, and [`PgStore`] over any
//! [`SqlExecutor`](crate::executor::SqlExecutor).
//!
//! Uniqueness rules (username, email, one wishlist entry per user/product pair) are enforced
//! by the store itself and reported as [`StoreError::Duplicate`], so concurrent inserts
//! cannot both succeed even when both passed a service-level pre-check.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::error::ServiceError;
use crate::executor::SqlError;
use crate::model::{Category, Product, ProductFilter, Tier, User, WishlistEntry};
use crate::pagination::{Page, PageRequest};
use crate::transaction::TransactionError;
use std::fmt;
use uuid::Uuid;

#[derive(Debug)]
pub enum StoreError {
    /// A uniqueness rule rejected the write; names what collided
    Duplicate(String),
    /// The serializable unit lost a race and was rolled back
    SerializationFailure,
    /// SQL-level failure
    Sql(SqlError),
    /// Stored data could not be decoded
    Corrupt(String),
    /// Backend unusable (poisoned lock, closed transaction, ...)
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Duplicate(what) => write!(f, "duplicate {what}"),
            StoreError::SerializationFailure => {
                write!(f, "could not serialize access due to concurrent update")
            }
            StoreError::Sql(e) => write!(f, "{e}"),
            StoreError::Corrupt(msg) => write!(f, "corrupt record: {msg}"),
            StoreError::Unavailable(msg) => write!(f, "store unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<SqlError> for StoreError {
    fn from(err: SqlError) -> Self {
        if err.is_serialization_failure() {
            StoreError::SerializationFailure
        } else if err.is_unique_violation() {
            let constraint = match &err {
                SqlError::PostgresError(e) => e
                    .as_db_error()
                    .and_then(|db| db.constraint())
                    .unwrap_or("record")
                    .to_string(),
                _ => "record".to_string(),
            };
            StoreError::Duplicate(constraint)
        } else {
            StoreError::Sql(err)
        }
    }
}

impl From<TransactionError> for StoreError {
    fn from(err: TransactionError) -> Self {
        if err.is_serialization_failure() {
            StoreError::SerializationFailure
        } else {
            StoreError::from(SqlError::from(err))
        }
    }
}

/// A serialized unit of work run by [`EntityStore::serialized`]
pub type Unit<'u> = dyn FnMut(&dyn EntityStore) -> Result<(), ServiceError> + 'u;

/// Typed access to the four collections: users, categories, products, wishlist entries
///
/// Listing methods return records in a stable order: insertion order for categories and
/// wishlist entries, newest first for products and users.
pub trait EntityStore: Send + Sync {
    // users
    fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    /// Look up by username or email
    fn find_user_by_login(&self, login: &str) -> Result<Option<User>, StoreError>;
    /// Users other than `exclude` holding `username` or `email`
    fn find_user_conflicts(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        exclude: Option<Uuid>,
    ) -> Result<Vec<User>, StoreError>;
    fn list_users(&self, tier: Tier, page: PageRequest) -> Result<Page<User>, StoreError>;
    fn insert_user(&self, user: &User) -> Result<(), StoreError>;
    /// Returns `false` when no such user exists
    fn update_user(&self, user: &User) -> Result<bool, StoreError>;
    fn delete_user(&self, id: Uuid) -> Result<bool, StoreError>;

    // categories
    fn find_category(&self, id: Uuid) -> Result<Option<Category>, StoreError>;
    fn list_categories(&self) -> Result<Vec<Category>, StoreError>;
    fn child_categories(&self, parent: Uuid) -> Result<Vec<Category>, StoreError>;
    fn insert_category(&self, category: &Category) -> Result<(), StoreError>;
    fn update_category(&self, category: &Category) -> Result<bool, StoreError>;
    fn delete_category(&self, id: Uuid) -> Result<bool, StoreError>;

    // products
    fn find_product(&self, id: Uuid) -> Result<Option<Product>, StoreError>;
    fn list_products(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<Page<Product>, StoreError>;
    fn products_owned_by(&self, owner: Uuid) -> Result<Vec<Product>, StoreError>;
    fn count_products_in_category(&self, category: Uuid) -> Result<u64, StoreError>;
    fn insert_product(&self, product: &Product) -> Result<(), StoreError>;
    fn update_product(&self, product: &Product) -> Result<bool, StoreError>;
    fn delete_product(&self, id: Uuid) -> Result<bool, StoreError>;

    // wishlist
    fn find_wishlist_entry(
        &self,
        user: Uuid,
        product: Uuid,
    ) -> Result<Option<WishlistEntry>, StoreError>;
    fn list_wishlist(&self, user: Uuid) -> Result<Vec<WishlistEntry>, StoreError>;
    fn insert_wishlist_entry(&self, entry: &WishlistEntry) -> Result<(), StoreError>;
    fn delete_wishlist_entry(&self, user: Uuid, product: Uuid) -> Result<bool, StoreError>;
    fn delete_wishlist_entries(&self, ids: &[Uuid]) -> Result<u64, StoreError>;
    fn delete_wishlist_by_user(&self, user: Uuid) -> Result<u64, StoreError>;

    /// Run `unit` so that no other serialized unit interleaves with it
    ///
    /// Reads and writes made through the `&dyn EntityStore` handed to `unit` either all take
    /// effect or, when `unit` fails, none do (Postgres) / stop where it failed (memory, where
    /// units validate before they write). A lost race surfaces as
    /// [`StoreError::SerializationFailure`].
    fn serialized(&self, unit: &mut Unit<'_>) -> Result<(), ServiceError>;
}
