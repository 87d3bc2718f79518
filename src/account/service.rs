use crate::auth::{require, AccountTarget, Action, Caller, CredentialHasher, Target};
use crate::error::{EntityKind, FieldErrors, ServiceError};
use crate::model::{AccountChanges, NewAccount, Tier, User};
use crate::pagination::{Page, PageRequest};
use crate::product::ImageStore;
use crate::store::{EntityStore, StoreError};
use crate::validation;
use chrono::Utc;
use uuid::Uuid;

const TAKEN: &str = "Account already exists";

/// Registration, login, and user/admin management
///
/// Management operations run the record-independent gate (caller tier, self-protection)
/// before looking the target up, then re-authorize against the freshly fetched record.
pub struct AccountService<'a> {
    store: &'a dyn EntityStore,
    hasher: &'a dyn CredentialHasher,
    images: &'a dyn ImageStore,
}

fn manage(caller: &Caller, target: AccountTarget) -> Result<(), ServiceError> {
    require(caller, Action::ManageAccount, &Target::Account(target))
}

fn duplicate_as_validation(err: StoreError) -> ServiceError {
    match err {
        StoreError::Duplicate(what) if what.contains("username") => ServiceError::Validation(
            FieldErrors::new(TAKEN).with("username", "Username already taken"),
        ),
        StoreError::Duplicate(what) if what.contains("email") => ServiceError::Validation(
            FieldErrors::new(TAKEN).with("email", "Email already registered"),
        ),
        other => other.into(),
    }
}

impl<'a> AccountService<'a> {
    pub fn new(
        store: &'a dyn EntityStore,
        hasher: &'a dyn CredentialHasher,
        images: &'a dyn ImageStore,
    ) -> Self {
        Self {
            store,
            hasher,
            images,
        }
    }

    fn check_unique(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        exclude: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut errors = FieldErrors::new(TAKEN);
        for other in self.store.find_user_conflicts(username, email, exclude)? {
            if username == Some(other.username.as_str()) {
                errors.add("username", "Username already taken");
            }
            if email == Some(other.email.as_str()) {
                errors.add("email", "Email already registered");
            }
        }
        errors.into_result()
    }

    fn create_account(&self, input: &NewAccount, tier: Tier) -> Result<User, ServiceError> {
        let mut errors = FieldErrors::new("Invalid account");
        let username = validation::username(&mut errors, &input.username);
        let name = validation::text(
            &mut errors,
            "name",
            "Name",
            &input.name,
            validation::MIN_NAME_LEN,
        );
        let email = validation::email(&mut errors, &input.email);
        validation::password(&mut errors, &input.password);
        errors.into_result()?;

        self.check_unique(Some(&username), Some(&email), None)?;

        let user = User {
            id: Uuid::new_v4(),
            username,
            name,
            email,
            password_hash: self.hasher.hash(&input.password),
            tier,
            created_at: Utc::now(),
        };
        self.store
            .insert_user(&user)
            .map_err(duplicate_as_validation)?;
        Ok(user)
    }

    /// Admin-family record, or `NotFound` for missing and user-tier ids alike
    fn fetch_admin(&self, id: Uuid) -> Result<User, ServiceError> {
        self.store
            .find_user(id)?
            .filter(|user| user.tier.is_admin_family())
            .ok_or_else(|| ServiceError::not_found(EntityKind::Admin, id))
    }

    fn fetch_user(&self, id: Uuid) -> Result<User, ServiceError> {
        self.store
            .find_user(id)?
            .ok_or_else(|| ServiceError::not_found(EntityKind::User, id))
    }

    /// Delete `user` together with its wishlist and its products, then the product images
    fn purge(&self, user: &User) -> Result<(), ServiceError> {
        let mut images = Vec::new();
        self.store.serialized(&mut |store| {
            images.clear();
            store.delete_wishlist_by_user(user.id)?;
            for product in store.products_owned_by(user.id)? {
                store.delete_product(product.id)?;
                images.extend(product.image);
            }
            if !store.delete_user(user.id)? {
                return Err(ServiceError::not_found(EntityKind::User, user.id));
            }
            Ok(())
        })?;

        for reference in &images {
            if let Err(e) = self.images.remove(reference) {
                log::warn!("could not remove image {}: {}", reference, e);
            }
        }
        Ok(())
    }

    /// Self-registration; always creates a `user`-tier account
    pub fn register(&self, input: NewAccount) -> Result<User, ServiceError> {
        let user = self.create_account(&input, Tier::User)?;
        log::info!("registered user {} ({})", user.username, user.id);
        Ok(user)
    }

    /// Resolve credentials to a [`Caller`]; `login` is a username or an email
    pub fn authenticate(&self, login: &str, password: &str) -> Result<Caller, ServiceError> {
        let Some(user) = self.store.find_user_by_login(login.trim())? else {
            log::debug!("login failed: unknown account");
            return Err(ServiceError::Unauthenticated);
        };
        if !self.hasher.verify(password, &user.password_hash) {
            log::debug!("login failed for {}: bad password", user.id);
            return Err(ServiceError::Unauthenticated);
        }
        Ok(Caller::from(&user))
    }

    pub fn create_admin(&self, caller: &Caller, input: NewAccount) -> Result<User, ServiceError> {
        manage(caller, AccountTarget::collection(Tier::Admin))?;
        let admin = self.create_account(&input, Tier::Admin)?;
        log::info!("admin {} ({}) created by {}", admin.username, admin.id, caller.id);
        Ok(admin)
    }

    pub fn update_admin(
        &self,
        caller: &Caller,
        id: Uuid,
        changes: AccountChanges,
    ) -> Result<User, ServiceError> {
        manage(caller, AccountTarget::existing(id, Tier::Admin))?;

        if changes.is_empty() {
            return Err(ServiceError::validation("No update data provided"));
        }
        let mut errors = FieldErrors::new("Invalid account");
        let username = changes
            .username
            .as_deref()
            .map(|value| validation::username(&mut errors, value));
        let name = changes.name.as_deref().map(|value| {
            validation::text(&mut errors, "name", "Name", value, validation::MIN_NAME_LEN)
        });
        let email = changes
            .email
            .as_deref()
            .map(|value| validation::email(&mut errors, value));
        if let Some(password) = &changes.password {
            validation::password(&mut errors, password);
        }
        errors.into_result()?;

        let mut admin = self.fetch_admin(id)?;
        manage(caller, AccountTarget::existing(id, admin.tier))?;
        self.check_unique(username.as_deref(), email.as_deref(), Some(id))?;

        if let Some(username) = username {
            admin.username = username;
        }
        if let Some(name) = name {
            admin.name = name;
        }
        if let Some(email) = email {
            admin.email = email;
        }
        if let Some(password) = &changes.password {
            admin.password_hash = self.hasher.hash(password);
        }

        if !self
            .store
            .update_user(&admin)
            .map_err(duplicate_as_validation)?
        {
            return Err(ServiceError::not_found(EntityKind::Admin, id));
        }
        log::info!("admin {} updated by {}", id, caller.id);
        Ok(admin)
    }

    pub fn delete_admin(&self, caller: &Caller, id: Uuid) -> Result<User, ServiceError> {
        manage(caller, AccountTarget::existing(id, Tier::Admin))?;
        let admin = self.fetch_admin(id)?;
        manage(caller, AccountTarget::existing(id, admin.tier))?;

        self.purge(&admin)?;
        log::info!("admin {} ({}) deleted by {}", admin.username, id, caller.id);
        Ok(admin)
    }

    /// Promote or demote an account
    pub fn set_tier(&self, caller: &Caller, id: Uuid, tier: Tier) -> Result<User, ServiceError> {
        // Any tier change other than user-to-user touches the admin family.
        manage(caller, AccountTarget::retier(id, Tier::Admin, tier))?;
        let mut user = self.fetch_user(id)?;
        manage(caller, AccountTarget::retier(id, user.tier, tier))?;

        if user.tier == tier {
            log::debug!("account {} already has tier {}", id, tier);
            return Ok(user);
        }
        let previous = user.tier;
        user.tier = tier;
        if !self.store.update_user(&user)? {
            return Err(ServiceError::not_found(EntityKind::User, id));
        }
        log::info!(
            "account {} changed from {} to {} by {}",
            id,
            previous,
            tier,
            caller.id
        );
        Ok(user)
    }

    pub fn list_admins(&self, caller: &Caller, page: PageRequest) -> Result<Page<User>, ServiceError> {
        manage(caller, AccountTarget::collection(Tier::Admin))?;
        Ok(self.store.list_users(Tier::Admin, page)?)
    }

    pub fn list_users(&self, caller: &Caller, page: PageRequest) -> Result<Page<User>, ServiceError> {
        manage(caller, AccountTarget::collection(Tier::User))?;
        Ok(self.store.list_users(Tier::User, page)?)
    }

    /// Delete any account; the target's tier decides which caller tier is needed
    pub fn delete_user(&self, caller: &Caller, id: Uuid) -> Result<User, ServiceError> {
        manage(caller, AccountTarget::existing(id, Tier::User))?;
        let user = self.fetch_user(id)?;
        manage(caller, AccountTarget::existing(id, user.tier))?;

        self.purge(&user)?;
        log::info!("account {} ({}) deleted by {}", user.username, id, caller.id);
        Ok(user)
    }

    /// Create the bootstrap super admin unless an account with that username exists
    pub fn provision_super_admin(&self, input: &NewAccount) -> Result<Option<User>, ServiceError> {
        if let Some(existing) = self.store.find_user_by_login(input.username.trim())? {
            log::debug!(
                "bootstrap account {} already present as {}",
                existing.username,
                existing.tier
            );
            return Ok(None);
        }
        let root = self.create_account(input, Tier::SuperAdmin)?;
        log::info!("provisioned super admin {} ({})", root.username, root.id);
        Ok(Some(root))
    }
}
