//! Service-level error taxonomy.
//!
//! Every operation exposed to the API surface returns [`ServiceError`]. Validation and
//! authorization failures are raised before any write is attempted, so an `Err` from a
//! mutation never leaves partial state behind.

use crate::auth::DenyReason;
use crate::product::ImageError;
use crate::store::StoreError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Kind of record an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Admin,
    Category,
    Product,
    WishlistEntry,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::User => "User",
            EntityKind::Admin => "Admin",
            EntityKind::Category => "Category",
            EntityKind::Product => "Product",
            EntityKind::WishlistEntry => "Wishlist item",
        };
        f.write_str(label)
    }
}

/// A validation failure with optional per-field detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldErrors {
    pub message: String,
    pub details: BTreeMap<&'static str, String>,
}

impl FieldErrors {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    /// Record a problem with `field`; the first message per field wins
    pub fn add(&mut self, field: &'static str, problem: impl Into<String>) {
        self.details.entry(field).or_insert_with(|| problem.into());
    }

    pub fn with(mut self, field: &'static str, problem: impl Into<String>) -> Self {
        self.add(field, problem);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    pub fn field(&self, field: &str) -> Option<&str> {
        self.details.get(field).map(String::as_str)
    }

    /// `Ok(())` when nothing was recorded, otherwise a [`ServiceError::Validation`]
    pub fn into_result(self) -> Result<(), ServiceError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation(self))
        }
    }
}

/// Error returned by every storefront service operation
#[derive(Debug)]
pub enum ServiceError {
    /// Malformed or missing input; caller-correctable
    Validation(FieldErrors),
    /// Referenced record does not exist
    NotFound { kind: EntityKind, id: String },
    /// Caller lacks the privilege, or the self-protection rule fired
    Forbidden(DenyReason),
    /// Category parent is itself, missing, or one of its own descendants
    InvalidParent(String),
    /// Category placement would put a node at depth 3 or deeper
    MaxDepthExceeded { depth: usize },
    /// Stored hierarchy is corrupt (cycle, dangling parent); server-side fault
    Integrity(String),
    /// Duplicate or still-referenced record, or a lost serializable race
    Conflict(String),
    /// Login credentials did not match
    Unauthenticated,
    /// Image upload rejected or image file I/O failed
    Image(ImageError),
    /// Entity store failure
    Store(StoreError),
}

impl ServiceError {
    pub fn not_found(kind: EntityKind, id: impl ToString) -> Self {
        ServiceError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(FieldErrors::new(message))
    }

    /// Build an integrity error, logging it for operators on a dedicated target
    pub fn integrity(message: impl Into<String>) -> Self {
        let message = message.into();
        log::error!(target: "storefront::integrity", "{}", message);
        #[cfg(feature = "metrics")]
        crate::metrics::METRICS.record_integrity_error();
        ServiceError::Integrity(message)
    }

    /// Stable machine-readable kind, used as the error code on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation_error",
            ServiceError::NotFound { .. } => "not_found",
            ServiceError::Forbidden(_) => "forbidden",
            ServiceError::InvalidParent(_) => "invalid_parent",
            ServiceError::MaxDepthExceeded { .. } => "max_depth_exceeded",
            ServiceError::Integrity(_) => "integrity_error",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::Unauthenticated => "unauthenticated",
            ServiceError::Image(_) => "image_error",
            ServiceError::Store(_) => "store_error",
        }
    }

    /// HTTP status the API surface should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Validation(_)
            | ServiceError::InvalidParent(_)
            | ServiceError::MaxDepthExceeded { .. } => 400,
            ServiceError::Unauthenticated => 401,
            ServiceError::Forbidden(_) => 403,
            ServiceError::NotFound { .. } => 404,
            ServiceError::Conflict(_) => 409,
            ServiceError::Image(e) if e.is_client_error() => 400,
            ServiceError::Image(_) | ServiceError::Integrity(_) | ServiceError::Store(_) => 500,
        }
    }

    /// True for errors the caller can fix by changing the request
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Validation(errors) => write!(f, "{}", errors.message),
            ServiceError::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            ServiceError::Forbidden(reason) => write!(f, "Forbidden: {reason}"),
            ServiceError::InvalidParent(msg) => write!(f, "Invalid parent: {msg}"),
            ServiceError::MaxDepthExceeded { depth } => write!(
                f,
                "Category would sit at depth {depth}; the tree allows at most 3 levels (depths 0-2)"
            ),
            ServiceError::Integrity(msg) => write!(f, "Integrity error: {msg}"),
            ServiceError::Conflict(msg) => write!(f, "Conflict: {msg}"),
            ServiceError::Unauthenticated => write!(f, "Invalid credentials"),
            ServiceError::Image(e) => write!(f, "Image error: {e}"),
            ServiceError::Store(e) => write!(f, "Store error: {e}"),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(what) => ServiceError::Conflict(format!("{what} already exists")),
            StoreError::SerializationFailure => ServiceError::Conflict(
                "the record was modified concurrently; retry the request".to_string(),
            ),
            other => ServiceError::Store(other),
        }
    }
}

impl From<ImageError> for ServiceError {
    fn from(err: ImageError) -> Self {
        ServiceError::Image(err)
    }
}
