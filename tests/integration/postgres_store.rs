//! Runs only when `TEST_DATABASE_URL` points at a scratch PostgreSQL database.

use crate::common::{config, image, new_account, new_product, ROOT_PASSWORD};
use storefront::connection::connect;
use storefront::executor::MayPostgresExecutor;
use storefront::migration::{startup_migrations, Migrator};
use storefront::model::NewCategory;
use storefront::{Caller, EntityStore, PageRequest, ServiceError, Storefront, Tier};

fn database_url() -> Option<String> {
    match std::env::var("TEST_DATABASE_URL") {
        Ok(url) if !url.is_empty() => Some(url),
        _ => {
            eprintln!("TEST_DATABASE_URL not set; skipping PostgreSQL tests");
            None
        }
    }
}

fn storefront(url: String, dir: &std::path::Path) -> Storefront {
    let mut config = config(dir);
    config.database.url = url;
    config.database.migration_lock_timeout_seconds = 30;
    Storefront::connect(&config).unwrap()
}

fn unique(name: &str) -> String {
    format!("{name} {}", &uuid::Uuid::new_v4().simple().to_string()[..8])
}

#[test]
fn test_migrations_are_idempotent() {
    let Some(url) = database_url() else { return };
    let executor = MayPostgresExecutor::new(connect(&url).unwrap());

    startup_migrations(&executor, Some(30)).unwrap();
    assert_eq!(startup_migrations(&executor, Some(30)).unwrap(), 0);

    let status = Migrator::default().status(&executor).unwrap();
    assert!(status.pending.is_empty());
}

#[test]
fn test_hierarchy_and_catalogue_on_postgres() {
    let Some(url) = database_url() else { return };
    let dir = tempfile::tempdir().unwrap();
    let app = storefront(url, dir.path());
    let root = app.accounts().authenticate("root", ROOT_PASSWORD).unwrap();
    assert_eq!(root.tier, Tier::SuperAdmin);

    let create = |name: &str, parent| {
        app.categories().create(
            &root,
            NewCategory {
                name: unique(name),
                parent,
            },
        )
    };
    let electronics = create("Electronics", None).unwrap();
    let phones = create("Phones", Some(electronics.id)).unwrap();
    let smartphones = create("Smartphones", Some(phones.id)).unwrap();
    assert!(matches!(
        create("Android", Some(smartphones.id)),
        Err(ServiceError::MaxDepthExceeded { depth: 3 })
    ));

    let subtree = app.categories().subtree(electronics.id).unwrap();
    assert_eq!(subtree.height(), 2);

    let seller = app.accounts().register(new_account()).unwrap();
    let seller = Caller::from(&seller);
    let product = app
        .products()
        .create(&seller, new_product(smartphones.id), Some(image("pixel.png")))
        .unwrap();
    assert_eq!(app.products().get(product.id).unwrap(), product);

    assert!(matches!(
        app.categories().delete(&root, smartphones.id),
        Err(ServiceError::Conflict(_))
    ));

    app.wishlist().add(&seller, product.id).unwrap();
    assert!(matches!(
        app.wishlist().add(&seller, product.id),
        Err(ServiceError::Conflict(_))
    ));

    app.accounts().delete_user(&root, seller.id).unwrap();
    assert!(app.store().find_product(product.id).unwrap().is_none());
    assert_eq!(
        app.wishlist()
            .list(&seller, PageRequest::default())
            .unwrap()
            .total,
        0
    );

    for id in [smartphones.id, phones.id, electronics.id] {
        app.categories().delete(&root, id).unwrap();
    }
}

#[test]
fn test_duplicate_registration_on_postgres() {
    let Some(url) = database_url() else { return };
    let dir = tempfile::tempdir().unwrap();
    let app = storefront(url, dir.path());

    let input = new_account();
    let user = app.accounts().register(input.clone()).unwrap();
    assert!(matches!(
        app.accounts().register(input),
        Err(ServiceError::Validation(_))
    ));

    let root = app.accounts().authenticate("root", ROOT_PASSWORD).unwrap();
    app.accounts().delete_user(&root, user.id).unwrap();
}
