//! # Storefront
//!
//! Core services for a small storefront on PostgreSQL and the `may` coroutine runtime:
//! a category hierarchy at most three levels deep, a product catalogue with images,
//! per-user wishlists, and accounts in three tiers (`user`, `admin`, `super_admin`).
//!
//! Every mutating operation is authorized by [`auth::authorize`], a pure function of the
//! caller, the action and the target. Storage sits behind [`store::EntityStore`], with a
//! PostgreSQL implementation ([`store::PgStore`]) and an in-memory one
//! ([`store::MemoryStore`]).
//!
//! ```no_run
//! use storefront::{AppConfig, Storefront};
//!
//! let config = AppConfig::load()?;
//! let app = Storefront::connect(&config)?;
//! let caller = app.accounts().authenticate("root", "changeme")?;
//! let tree = app.categories().tree()?;
//! # let _ = (caller, tree);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod account;
pub mod app;
pub mod auth;
pub mod category;
pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod migration;
pub mod model;
pub mod pagination;
pub mod product;
pub mod store;
pub mod transaction;
pub mod validation;
pub mod wishlist;

pub use app::{StartupError, Storefront};
pub use auth::{Caller, Tier};
pub use config::AppConfig;
pub use error::{EntityKind, FieldErrors, ServiceError};
pub use pagination::{Page, PageRequest};
pub use store::{EntityStore, MemoryStore, PgStore, StoreError};
