use crate::common::{image, new_account, new_product, Shop};
use rust_decimal::Decimal;
use storefront::auth::{authorize, AccountTarget, Action, Decision, DenyReason, Target};
use storefront::model::{CategoryChanges, NewCategory, ProductChanges, ProductFilter};
use storefront::{Caller, EntityStore, PageRequest, ServiceError, Tier};
use uuid::Uuid;

#[test]
fn test_fourth_level_category_is_rejected() {
    let shop = Shop::new();
    let electronics = shop.category("Electronics", None);
    let phones = shop.category("Phones", Some(&electronics));
    let smartphones = shop.category("Smartphones", Some(&phones));

    let err = shop
        .app
        .categories()
        .create(
            &shop.root,
            NewCategory {
                name: "Android".into(),
                parent: Some(smartphones.id),
            },
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::MaxDepthExceeded { depth: 3 }));
    assert_eq!(err.status_code(), 400);
    assert_eq!(shop.app.store().list_categories().unwrap().len(), 3);
}

#[test]
fn test_moving_a_branch_respects_depth() {
    let shop = Shop::new();
    let electronics = shop.category("Electronics", None);
    let phones = shop.category("Phones", Some(&electronics));
    let audio = shop.category("Audio", None);
    shop.category("Headphones", Some(&audio));

    // Audio has a child, so putting it under Phones would create a fourth level.
    let err = shop
        .app
        .categories()
        .update(
            &shop.root,
            audio.id,
            CategoryChanges {
                parent: Some(Some(phones.id)),
                ..CategoryChanges::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::MaxDepthExceeded { .. }));

    // One level lower is fine.
    let moved = shop
        .app
        .categories()
        .update(
            &shop.root,
            audio.id,
            CategoryChanges {
                parent: Some(Some(electronics.id)),
                ..CategoryChanges::default()
            },
        )
        .unwrap();
    assert_eq!(moved.parent, Some(electronics.id));
}

#[test]
fn test_category_cycle_is_rejected() {
    let shop = Shop::new();
    let electronics = shop.category("Electronics", None);
    let phones = shop.category("Phones", Some(&electronics));

    let err = shop
        .app
        .categories()
        .update(
            &shop.root,
            electronics.id,
            CategoryChanges {
                parent: Some(Some(phones.id)),
                ..CategoryChanges::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidParent(_)));
}

#[test]
fn test_tree_shape() {
    let shop = Shop::new();
    let electronics = shop.category("Electronics", None);
    let phones = shop.category("Phones", Some(&electronics));
    shop.category("Smartphones", Some(&phones));
    shop.category("Laptops", Some(&electronics));
    shop.category("Books", None);

    let tree = shop.app.categories().tree().unwrap();
    assert_eq!(tree.len(), 2);
    let electronics_node = tree.iter().find(|n| n.id == electronics.id).unwrap();
    assert_eq!(electronics_node.children.len(), 2);
    assert_eq!(electronics_node.height(), 2);
    let phones_node = electronics_node
        .children
        .iter()
        .find(|n| n.id == phones.id)
        .unwrap();
    assert_eq!(phones_node.children[0].name, "Smartphones");

    let subtree = shop.app.categories().subtree(phones.id).unwrap();
    assert_eq!(subtree.children.len(), 1);
    assert!(subtree.children[0].children.is_empty());
}

#[test]
fn test_regular_users_cannot_manage_categories() {
    let shop = Shop::new();
    let user = shop.account(Tier::User);
    let err = shop
        .app
        .categories()
        .create(
            &user,
            NewCategory {
                name: "Garden".into(),
                parent: None,
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Forbidden(DenyReason::InsufficientTier {
            required: Tier::Admin
        })
    ));
    assert_eq!(err.status_code(), 403);
}

#[test]
fn test_category_in_use_cannot_be_deleted() {
    let shop = Shop::new();
    let user = shop.account(Tier::User);
    let phones = shop.category("Phones", None);
    let product = shop.product(&user, &phones, None);

    let err = shop.app.categories().delete(&shop.root, phones.id).unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    shop.app.products().delete(&user, product.id).unwrap();
    shop.app.categories().delete(&shop.root, phones.id).unwrap();
}

#[test]
fn test_admin_cannot_delete_itself() {
    let shop = Shop::new();
    let admin = shop.account(Tier::Admin);

    let err = shop
        .app
        .accounts()
        .delete_admin(&admin, admin.id)
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Forbidden(DenyReason::CannotModifySelf)
    ));
    assert!(shop.app.store().find_user(admin.id).unwrap().is_some());

    // The super admin can.
    shop.app.accounts().delete_admin(&shop.root, admin.id).unwrap();
    assert!(shop.app.store().find_user(admin.id).unwrap().is_none());
}

#[test]
fn test_admin_deletes_another_users_product_and_its_image() {
    let shop = Shop::new();
    let owner = shop.account(Tier::User);
    let other = shop.account(Tier::User);
    let admin = shop.account(Tier::Admin);
    let phones = shop.category("Phones", None);
    let product = shop.product(&owner, &phones, Some(image("pixel.png")));
    let reference = product.image.clone().unwrap();
    assert!(shop.image_path(&reference).exists());

    let err = shop.app.products().delete(&other, product.id).unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(DenyReason::NotOwner)));

    shop.app.products().delete(&admin, product.id).unwrap();
    assert!(!shop.image_path(&reference).exists());
    assert!(matches!(
        shop.app.products().get(product.id),
        Err(ServiceError::NotFound { .. })
    ));
}

#[test]
fn test_replacing_an_image_removes_the_old_file() {
    let shop = Shop::new();
    let owner = shop.account(Tier::User);
    let phones = shop.category("Phones", None);
    let product = shop.product(&owner, &phones, Some(image("first.png")));
    let first = product.image.clone().unwrap();

    let updated = shop
        .app
        .products()
        .update(
            &owner,
            product.id,
            ProductChanges {
                price: Some(Decimal::new(19_999, 2)),
                ..ProductChanges::default()
            },
            Some(image("second.jpg")),
        )
        .unwrap();
    let second = updated.image.clone().unwrap();
    assert_ne!(first, second);
    assert!(!shop.image_path(&first).exists());
    assert!(shop.image_path(&second).exists());
    assert_eq!(updated.price, Decimal::new(19_999, 2));
}

#[test]
fn test_product_with_unsupported_image_is_rejected() {
    let shop = Shop::new();
    let owner = shop.account(Tier::User);
    let phones = shop.category("Phones", None);
    let err = shop
        .app
        .products()
        .create(&owner, new_product(phones.id), Some(image("notes.txt")))
        .unwrap_err();
    assert_eq!(err.status_code(), 400);
    assert_eq!(shop.app.store().products_owned_by(owner.id).unwrap().len(), 0);
}

#[test]
fn test_product_listing_filters() {
    let shop = Shop::new();
    let alice = shop.account(Tier::User);
    let bob = shop.account(Tier::User);
    let phones = shop.category("Phones", None);
    let books = shop.category("Books", None);
    shop.product(&alice, &phones, None);
    shop.product(&alice, &books, None);
    shop.product(&bob, &phones, None);

    let by_category = shop
        .app
        .products()
        .list(
            &ProductFilter {
                category: Some(phones.id),
                ..ProductFilter::default()
            },
            PageRequest::default(),
        )
        .unwrap();
    assert_eq!(by_category.total, 2);

    let mine = shop
        .app
        .products()
        .list_owned(&alice, PageRequest::new(1, 1).unwrap())
        .unwrap();
    assert_eq!(mine.total, 2);
    assert_eq!(mine.total_pages, 2);
    assert_eq!(mine.data.len(), 1);

    let inverted = shop.app.products().list(
        &ProductFilter {
            min_price: Some(Decimal::new(50, 0)),
            max_price: Some(Decimal::new(10, 0)),
            ..ProductFilter::default()
        },
        PageRequest::default(),
    );
    assert!(matches!(inverted, Err(ServiceError::Validation(_))));
}

#[test]
fn test_deleting_a_user_removes_their_catalogue() {
    let shop = Shop::new();
    let admin = shop.account(Tier::Admin);
    let seller = shop.account(Tier::User);
    let buyer = shop.account(Tier::User);
    let phones = shop.category("Phones", None);
    let product = shop.product(&seller, &phones, Some(image("phone.gif")));
    let reference = product.image.clone().unwrap();
    shop.app.wishlist().add(&buyer, product.id).unwrap();
    shop.app.wishlist().add(&seller, product.id).unwrap();

    shop.app.accounts().delete_user(&admin, seller.id).unwrap();

    assert!(shop.app.store().find_user(seller.id).unwrap().is_none());
    assert!(shop.app.store().find_product(product.id).unwrap().is_none());
    assert!(!shop.image_path(&reference).exists());
    // The buyer's entry pointed at the deleted product and is purged on read.
    let wishlist = shop
        .app
        .wishlist()
        .list(&buyer, PageRequest::default())
        .unwrap();
    assert_eq!(wishlist.total, 0);
}

#[test]
fn test_admin_cannot_delete_other_admins_through_user_route() {
    let shop = Shop::new();
    let admin = shop.account(Tier::Admin);
    let other_admin = shop.account(Tier::Admin);
    let err = shop
        .app
        .accounts()
        .delete_user(&admin, other_admin.id)
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Forbidden(DenyReason::InsufficientTier {
            required: Tier::SuperAdmin
        })
    ));
}

#[test]
fn test_registration_then_login() {
    let shop = Shop::new();
    let input = new_account();
    let user = shop.app.accounts().register(input.clone()).unwrap();
    let caller = shop
        .app
        .accounts()
        .authenticate(&input.email, &input.password)
        .unwrap();
    assert_eq!(caller, Caller::new(user.id, Tier::User));

    let duplicate = shop.app.accounts().register(input);
    assert!(matches!(duplicate, Err(ServiceError::Validation(_))));
}

#[test]
fn test_wishlist_round() {
    let shop = Shop::new();
    let user = shop.account(Tier::User);
    let phones = shop.category("Phones", None);
    let product = shop.product(&user, &phones, None);

    shop.app.wishlist().add(&user, product.id).unwrap();
    assert!(matches!(
        shop.app.wishlist().add(&user, product.id),
        Err(ServiceError::Conflict(_))
    ));
    shop.app.wishlist().remove(&user, product.id).unwrap();
    assert!(matches!(
        shop.app.wishlist().remove(&user, product.id),
        Err(ServiceError::NotFound { .. })
    ));
}

#[test]
fn test_authorization_matrix() {
    let user = Caller::new(Uuid::new_v4(), Tier::User);
    let admin = Caller::new(Uuid::new_v4(), Tier::Admin);
    let root = Caller::new(Uuid::new_v4(), Tier::SuperAdmin);
    let someone = Uuid::new_v4();

    let cases = [
        (user, Action::CreateProduct, Target::Nothing, true),
        (user, Action::ManageCategory, Target::Nothing, false),
        (admin, Action::ManageCategory, Target::Nothing, true),
        (user, Action::ModifyProduct, Target::Product { owner: user.id }, true),
        (user, Action::ModifyProduct, Target::Product { owner: someone }, false),
        (admin, Action::ModifyProduct, Target::Product { owner: someone }, true),
        (
            admin,
            Action::ManageAccount,
            Target::Account(AccountTarget::existing(someone, Tier::User)),
            true,
        ),
        (
            admin,
            Action::ManageAccount,
            Target::Account(AccountTarget::existing(someone, Tier::Admin)),
            false,
        ),
        (
            admin,
            Action::ManageAccount,
            Target::Account(AccountTarget::retier(someone, Tier::User, Tier::Admin)),
            false,
        ),
        (
            root,
            Action::ManageAccount,
            Target::Account(AccountTarget::existing(someone, Tier::Admin)),
            true,
        ),
        (
            root,
            Action::ManageAccount,
            Target::Account(AccountTarget::existing(root.id, Tier::SuperAdmin)),
            false,
        ),
    ];

    for (caller, action, target, allowed) in cases {
        let decision = authorize(&caller, action, &target);
        assert_eq!(
            decision.is_allowed(),
            allowed,
            "{:?} {:?} {:?} -> {:?}",
            caller.tier,
            action,
            target,
            decision
        );
    }
    assert_eq!(
        authorize(
            &admin,
            Action::ManageAccount,
            &Target::Account(AccountTarget::existing(admin.id, Tier::Admin)),
        ),
        Decision::Deny(DenyReason::CannotModifySelf)
    );
}
