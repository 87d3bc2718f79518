//! Wiring: one [`Storefront`] owns the store, the image store and the credential hasher,
//! and hands out services borrowing them.

use crate::account::AccountService;
use crate::auth::{CredentialHasher, Sha256CredentialHasher};
use crate::category::CategoryService;
use crate::config::AppConfig;
use crate::connection::{self, ConnectionError};
use crate::error::ServiceError;
use crate::executor::MayPostgresExecutor;
use crate::migration::{startup_migrations, MigrationError};
use crate::model::{NewAccount, User};
use crate::product::{DiskImageStore, ImageError, ImageStore, ProductService};
use crate::store::{EntityStore, MemoryStore, PgStore};
use crate::wishlist::WishlistService;
use std::fmt;

#[derive(Debug)]
pub enum StartupError {
    Connection(ConnectionError),
    Migration(MigrationError),
    Uploads(ImageError),
    /// The bootstrap super admin could not be created
    Bootstrap(ServiceError),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::Connection(e) => write!(f, "Database connection failed: {}", e),
            StartupError::Migration(e) => write!(f, "Startup migrations failed: {}", e),
            StartupError::Uploads(e) => write!(f, "Upload directory unusable: {}", e),
            StartupError::Bootstrap(e) => write!(f, "Bootstrap account failed: {}", e),
        }
    }
}

impl std::error::Error for StartupError {}

impl From<ConnectionError> for StartupError {
    fn from(err: ConnectionError) -> Self {
        StartupError::Connection(err)
    }
}

impl From<MigrationError> for StartupError {
    fn from(err: MigrationError) -> Self {
        StartupError::Migration(err)
    }
}

impl From<ImageError> for StartupError {
    fn from(err: ImageError) -> Self {
        StartupError::Uploads(err)
    }
}

impl From<ServiceError> for StartupError {
    fn from(err: ServiceError) -> Self {
        StartupError::Bootstrap(err)
    }
}

pub struct Storefront {
    store: Box<dyn EntityStore>,
    images: Box<dyn ImageStore>,
    hasher: Box<dyn CredentialHasher>,
}

impl Storefront {
    pub fn new(
        store: Box<dyn EntityStore>,
        images: Box<dyn ImageStore>,
        hasher: Box<dyn CredentialHasher>,
    ) -> Self {
        Self {
            store,
            images,
            hasher,
        }
    }

    /// In-memory store with images on disk, provisioned from `config.bootstrap`
    pub fn in_memory(config: &AppConfig) -> Result<Self, StartupError> {
        let app = Self::new(
            Box::new(MemoryStore::new()),
            Box::new(DiskImageStore::new(&config.uploads)?),
            Box::new(Sha256CredentialHasher::new(config.security.hash_rounds)),
        );
        app.provision(config)?;
        Ok(app)
    }

    /// Connect to PostgreSQL, apply pending migrations if enabled, then provision
    pub fn connect(config: &AppConfig) -> Result<Self, StartupError> {
        let client = connection::connect(&config.database.url)?;
        let executor = MayPostgresExecutor::new(client);

        if config.database.run_migrations {
            startup_migrations(
                &executor,
                Some(config.database.migration_lock_timeout_seconds),
            )?;
        }

        let app = Self::new(
            Box::new(PgStore::new(executor)),
            Box::new(DiskImageStore::new(&config.uploads)?),
            Box::new(Sha256CredentialHasher::new(config.security.hash_rounds)),
        );
        app.provision(config)?;
        log::info!("storefront connected");
        Ok(app)
    }

    fn provision(&self, config: &AppConfig) -> Result<Option<User>, StartupError> {
        let Some(bootstrap) = &config.bootstrap else {
            return Ok(None);
        };
        Ok(self
            .accounts()
            .provision_super_admin(&NewAccount::from(bootstrap))?)
    }

    pub fn store(&self) -> &dyn EntityStore {
        self.store.as_ref()
    }

    pub fn images(&self) -> &dyn ImageStore {
        self.images.as_ref()
    }

    pub fn categories(&self) -> CategoryService<'_> {
        CategoryService::new(self.store.as_ref())
    }

    pub fn products(&self) -> ProductService<'_> {
        ProductService::new(self.store.as_ref(), self.images.as_ref())
    }

    pub fn wishlist(&self) -> WishlistService<'_> {
        WishlistService::new(self.store.as_ref())
    }

    pub fn accounts(&self) -> AccountService<'_> {
        AccountService::new(
            self.store.as_ref(),
            self.hasher.as_ref(),
            self.images.as_ref(),
        )
    }
}
