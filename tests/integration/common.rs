use fake::faker::internet::en::SafeEmail;
use fake::faker::lorem::en::{Sentence, Words};
use fake::faker::name::en::Name;
use fake::Fake;
use rust_decimal::Decimal;
use std::path::Path;
use storefront::config::{BootstrapConfig, UploadConfig};
use storefront::model::{Category, NewAccount, NewCategory, NewProduct, Product};
use storefront::product::ImageUpload;
use storefront::{AppConfig, Caller, Storefront, Tier};
use tempfile::TempDir;
use uuid::Uuid;

pub const ROOT_PASSWORD: &str = "root-password";

/// A provisioned in-memory storefront with its upload directory
pub struct Shop {
    pub app: Storefront,
    pub root: Caller,
    dir: TempDir,
}

pub fn config(dir: &Path) -> AppConfig {
    let mut config = AppConfig {
        uploads: UploadConfig {
            dir: dir.to_path_buf(),
            ..UploadConfig::default()
        },
        bootstrap: Some(BootstrapConfig {
            username: "root".into(),
            email: "root@example.com".into(),
            name: "Root".into(),
            password: ROOT_PASSWORD.into(),
        }),
        ..AppConfig::default()
    };
    config.security.hash_rounds = 2;
    config
}

pub fn new_account() -> NewAccount {
    let suffix = Uuid::new_v4().simple().to_string();
    NewAccount {
        username: format!("user_{}", &suffix[..12]),
        name: Name().fake(),
        email: format!("{}.{}", &suffix[..8], SafeEmail().fake::<String>()),
        password: "secret123".into(),
    }
}

pub fn new_product(category: Uuid) -> NewProduct {
    let words: Vec<String> = Words(2..4).fake();
    NewProduct {
        name: words.join(" "),
        description: Sentence(6..10).fake(),
        price: Decimal::new((100..100_000).fake::<i64>(), 2),
        category,
    }
}

pub fn image(name: &str) -> ImageUpload {
    ImageUpload {
        file_name: name.to_string(),
        bytes: vec![0x89, b'P', b'N', b'G', 0, 1, 2, 3],
    }
}

impl Shop {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let app = Storefront::in_memory(&config(dir.path())).unwrap();
        let root = app.accounts().authenticate("root", ROOT_PASSWORD).unwrap();
        Self { app, root, dir }
    }

    pub fn upload_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Register an account and, if needed, promote it with the root account
    pub fn account(&self, tier: Tier) -> Caller {
        let user = self.app.accounts().register(new_account()).unwrap();
        if tier != Tier::User {
            self.app
                .accounts()
                .set_tier(&self.root, user.id, tier)
                .unwrap();
        }
        Caller::new(user.id, tier)
    }

    pub fn category(&self, name: &str, parent: Option<&Category>) -> Category {
        self.app
            .categories()
            .create(
                &self.root,
                NewCategory {
                    name: name.to_string(),
                    parent: parent.map(|p| p.id),
                },
            )
            .unwrap()
    }

    pub fn product(
        &self,
        owner: &Caller,
        category: &Category,
        image: Option<ImageUpload>,
    ) -> Product {
        self.app
            .products()
            .create(owner, new_product(category.id), image)
            .unwrap()
    }

    /// Path on disk of a stored image reference
    pub fn image_path(&self, reference: &str) -> std::path::PathBuf {
        let file = reference.rsplit('/').next().unwrap();
        self.upload_dir().join(file)
    }
}
