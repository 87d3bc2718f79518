use super::Product;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Stored (user, product) pair; unique per pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WishlistEntry {
    pub id: Uuid,
    pub user: Uuid,
    pub product: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Wishlist entry resolved against the catalogue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WishlistItem {
    pub id: Uuid,
    pub product: Product,
    pub added_at: DateTime<Utc>,
}
