//! Authorization decisions.
//!
//! | action          | required tier                                                        |
//! |-----------------|----------------------------------------------------------------------|
//! | create product  | any authenticated caller                                             |
//! | modify product  | the product's owner, or `Admin` and above                            |
//! | manage category | `Admin` and above                                                    |
//! | manage account  | `Admin` when the account is and stays `User`, otherwise `SuperAdmin` |
//!
//! Whenever `SuperAdmin` is the required tier and the target account is the caller's own,
//! the request is denied with [`DenyReason::CannotModifySelf`], whatever the caller's tier.

use super::Caller;
use crate::error::ServiceError;
use crate::model::Tier;
use std::fmt;
use uuid::Uuid;

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;
#[cfg(feature = "metrics")]
use crate::metrics::METRICS;

/// Class of privileged operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateProduct,
    ModifyProduct,
    ManageCategory,
    ManageAccount,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CreateProduct => "create_product",
            Action::ModifyProduct => "modify_product",
            Action::ManageCategory => "manage_category",
            Action::ManageAccount => "manage_account",
        }
    }
}

/// Account an account-management action is aimed at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountTarget {
    /// `None` for collection-level actions (listing, creating)
    pub id: Option<Uuid>,
    /// Current tier of the account, or the tier being created or listed
    pub tier: Tier,
    /// Tier the account ends up with, when the action changes it
    pub new_tier: Option<Tier>,
}

impl AccountTarget {
    pub fn existing(id: Uuid, tier: Tier) -> Self {
        Self {
            id: Some(id),
            tier,
            new_tier: None,
        }
    }

    pub fn collection(tier: Tier) -> Self {
        Self {
            id: None,
            tier,
            new_tier: None,
        }
    }

    pub fn retier(id: Uuid, tier: Tier, new_tier: Tier) -> Self {
        Self {
            id: Some(id),
            tier,
            new_tier: Some(new_tier),
        }
    }

    /// Tier needed to act on this account
    pub fn required_tier(&self) -> Tier {
        let resulting = self.new_tier.unwrap_or(self.tier);
        if self.tier == Tier::User && resulting == Tier::User {
            Tier::Admin
        } else {
            Tier::SuperAdmin
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Nothing,
    Product { owner: Uuid },
    Account(AccountTarget),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    InsufficientTier { required: Tier },
    NotOwner,
    CannotModifySelf,
}

impl DenyReason {
    /// Label used for the denial counter
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::InsufficientTier { .. } => "insufficient_tier",
            DenyReason::NotOwner => "not_owner",
            DenyReason::CannotModifySelf => "cannot_modify_self",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::InsufficientTier { required } => {
                write!(f, "requires the {required} tier or higher")
            }
            DenyReason::NotOwner => write!(f, "only the owner or an admin may do this"),
            DenyReason::CannotModifySelf => {
                write!(f, "an administrator cannot modify or delete their own account")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

fn at_least(caller: &Caller, required: Tier) -> Decision {
    if caller.is_at_least(required) {
        Decision::Allow
    } else {
        Decision::Deny(DenyReason::InsufficientTier { required })
    }
}

/// Decide whether `caller` may perform `action` on `target`
///
/// Pure; callers that want the denial logged and counted use [`require`].
pub fn authorize(caller: &Caller, action: Action, target: &Target) -> Decision {
    match (action, target) {
        (Action::CreateProduct, _) => Decision::Allow,
        (Action::ModifyProduct, Target::Product { owner }) => {
            if *owner == caller.id {
                Decision::Allow
            } else if caller.is_at_least(Tier::Admin) {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::NotOwner)
            }
        }
        // No ownership information: only the admin path can apply.
        (Action::ModifyProduct, _) => at_least(caller, Tier::Admin),
        (Action::ManageCategory, _) => at_least(caller, Tier::Admin),
        (Action::ManageAccount, Target::Account(account)) => {
            let required = account.required_tier();
            if required == Tier::SuperAdmin && account.id == Some(caller.id) {
                return Decision::Deny(DenyReason::CannotModifySelf);
            }
            at_least(caller, required)
        }
        (Action::ManageAccount, _) => at_least(caller, Tier::SuperAdmin),
    }
}

/// [`authorize`], turning a denial into [`ServiceError::Forbidden`]
pub fn require(caller: &Caller, action: Action, target: &Target) -> Result<(), ServiceError> {
    #[cfg(feature = "tracing")]
    let _span = tracing_helpers::authorize_span(action.as_str()).entered();

    match authorize(caller, action, target) {
        Decision::Allow => Ok(()),
        Decision::Deny(reason) => {
            log::debug!(
                "denied {} for caller {} ({}): {}",
                action.as_str(),
                caller.id,
                caller.tier,
                reason
            );
            #[cfg(feature = "metrics")]
            METRICS.record_denial(reason.as_str());
            Err(ServiceError::Forbidden(reason))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(tier: Tier) -> Caller {
        Caller::new(Uuid::new_v4(), tier)
    }

    #[test]
    fn test_any_caller_may_create_products() {
        for tier in [Tier::User, Tier::Admin, Tier::SuperAdmin] {
            assert!(authorize(&caller(tier), Action::CreateProduct, &Target::Nothing).is_allowed());
        }
    }

    #[test]
    fn test_owner_or_admin_may_modify_product() {
        let owner = caller(Tier::User);
        let target = Target::Product { owner: owner.id };

        assert!(authorize(&owner, Action::ModifyProduct, &target).is_allowed());
        assert_eq!(
            authorize(&caller(Tier::User), Action::ModifyProduct, &target),
            Decision::Deny(DenyReason::NotOwner)
        );
        assert!(authorize(&caller(Tier::Admin), Action::ModifyProduct, &target).is_allowed());
        assert!(authorize(&caller(Tier::SuperAdmin), Action::ModifyProduct, &target).is_allowed());
    }

    #[test]
    fn test_categories_need_admin() {
        assert_eq!(
            authorize(&caller(Tier::User), Action::ManageCategory, &Target::Nothing),
            Decision::Deny(DenyReason::InsufficientTier {
                required: Tier::Admin
            })
        );
        assert!(authorize(&caller(Tier::Admin), Action::ManageCategory, &Target::Nothing).is_allowed());
    }

    #[test]
    fn test_admin_manages_user_accounts_only() {
        let admin = caller(Tier::Admin);
        let user_account = Target::Account(AccountTarget::existing(Uuid::new_v4(), Tier::User));
        assert!(authorize(&admin, Action::ManageAccount, &user_account).is_allowed());

        // Admin acting on another admin: denied even though the ids differ.
        let other_admin = Target::Account(AccountTarget::existing(Uuid::new_v4(), Tier::Admin));
        assert_eq!(
            authorize(&admin, Action::ManageAccount, &other_admin),
            Decision::Deny(DenyReason::InsufficientTier {
                required: Tier::SuperAdmin
            })
        );

        let promote = Target::Account(AccountTarget::retier(
            Uuid::new_v4(),
            Tier::User,
            Tier::Admin,
        ));
        assert!(!authorize(&admin, Action::ManageAccount, &promote).is_allowed());
    }

    #[test]
    fn test_self_protection_applies_to_every_tier() {
        let admin = caller(Tier::Admin);
        let own = Target::Account(AccountTarget::existing(admin.id, Tier::Admin));
        assert_eq!(
            authorize(&admin, Action::ManageAccount, &own),
            Decision::Deny(DenyReason::CannotModifySelf)
        );

        let root = caller(Tier::SuperAdmin);
        let own = Target::Account(AccountTarget::existing(root.id, Tier::SuperAdmin));
        assert_eq!(
            authorize(&root, Action::ManageAccount, &own),
            Decision::Deny(DenyReason::CannotModifySelf)
        );
    }

    #[test]
    fn test_super_admin_manages_other_admins() {
        let root = caller(Tier::SuperAdmin);
        for tier in [Tier::User, Tier::Admin, Tier::SuperAdmin] {
            let target = Target::Account(AccountTarget::existing(Uuid::new_v4(), tier));
            assert!(authorize(&root, Action::ManageAccount, &target).is_allowed());
        }
        let admins = Target::Account(AccountTarget::collection(Tier::Admin));
        assert!(authorize(&root, Action::ManageAccount, &admins).is_allowed());
    }

    #[test]
    fn test_user_cannot_manage_accounts() {
        let user = caller(Tier::User);
        let users = Target::Account(AccountTarget::collection(Tier::User));
        assert_eq!(
            authorize(&user, Action::ManageAccount, &users),
            Decision::Deny(DenyReason::InsufficientTier {
                required: Tier::Admin
            })
        );
    }

    #[test]
    fn test_require_maps_denial_to_forbidden() {
        let err = require(&caller(Tier::User), Action::ManageCategory, &Target::Nothing)
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        assert_eq!(err.status_code(), 403);
    }
}
