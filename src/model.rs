//! Records persisted by the entity store, and the payloads used to create and change them.
//!
//! Records are plain data. Identity is a [`Uuid`] assigned by the service that creates the
//! record; references between records (`Category::parent`, `Product::owner`, ...) are ids
//! rather than embedded objects.

pub mod category;
pub mod product;
pub mod user;
pub mod wishlist;

pub use category::{Category, CategoryChanges, CategoryNode, NewCategory};
pub use product::{NewProduct, Product, ProductChanges, ProductFilter};
pub use user::{AccountChanges, NewAccount, PasswordHash, Tier, User};
pub use wishlist::{WishlistEntry, WishlistItem};

pub use uuid::Uuid;
