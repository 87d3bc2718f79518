//! Authentication context and the tiered authorization model.
//!
//! Every mutating service operation asks [`policy::authorize`] for a [`Decision`] before it
//! touches the store. The decision is a pure function of the [`Caller`], the [`Action`] and
//! the [`Target`] it is aimed at.

pub mod credentials;
pub mod policy;

pub use credentials::{CredentialHasher, Sha256CredentialHasher};
pub use policy::{authorize, require, AccountTarget, Action, Decision, DenyReason, Target};

pub use crate::model::Tier;

use uuid::Uuid;

/// The authenticated principal an operation runs on behalf of
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: Uuid,
    pub tier: Tier,
}

impl Caller {
    pub fn new(id: Uuid, tier: Tier) -> Self {
        Self { id, tier }
    }

    pub fn is_at_least(&self, tier: Tier) -> bool {
        self.tier >= tier
    }
}

impl From<&crate::model::User> for Caller {
    fn from(user: &crate::model::User) -> Self {
        Self::new(user.id, user.tier)
    }
}
