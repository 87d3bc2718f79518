use crate::common::{new_account, Shop};
use std::sync::Arc;
use storefront::model::{CategoryChanges, NewCategory};
use storefront::{ServiceError, Tier};

const ROUNDS: usize = 10;
const WRITERS: usize = 8;

#[test]
fn test_racing_hierarchy_writes_keep_three_levels() {
    for _ in 0..ROUNDS {
        let shop = Arc::new(Shop::new());
        let electronics = shop.category("Electronics", None);
        let phones = shop.category("Phones", Some(&electronics));
        let audio = shop.category("Audio", Some(&electronics));
        let (phones, audio) = (phones.id, audio.id);

        // Either write alone is legal; together they would make four levels.
        let create = {
            let shop = shop.clone();
            may::go!(move || {
                shop.app.categories().create(
                    &shop.root,
                    NewCategory {
                        name: "Android".into(),
                        parent: Some(phones),
                    },
                )
            })
        };
        let rehome = {
            let shop = shop.clone();
            may::go!(move || {
                shop.app.categories().update(
                    &shop.root,
                    phones,
                    CategoryChanges {
                        parent: Some(Some(audio)),
                        ..CategoryChanges::default()
                    },
                )
            })
        };

        let created = create.join().unwrap();
        let rehomed = rehome.join().unwrap();
        assert!(
            created.is_ok() != rehomed.is_ok(),
            "exactly one write may win: {created:?} / {rehomed:?}"
        );
        let loser = created.err().or(rehomed.err()).unwrap();
        assert!(matches!(loser, ServiceError::MaxDepthExceeded { .. }));

        let tree = shop.app.categories().tree().unwrap();
        assert!(tree.iter().all(|root| root.height() <= 2));
    }
}

#[test]
fn test_racing_wishlist_adds_store_one_entry() {
    let shop = Arc::new(Shop::new());
    let buyer = shop.account(Tier::User);
    let phones = shop.category("Phones", None);
    let product = shop.product(&buyer, &phones, None);

    let handles: Vec<_> = (0..WRITERS)
        .map(|_| {
            let shop = shop.clone();
            may::go!(move || shop.app.wishlist().add(&buyer, product.id))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, ServiceError::Conflict(_))));
}

#[test]
fn test_racing_registrations_claim_a_username_once() {
    let shop = Arc::new(Shop::new());
    let input = new_account();

    let handles: Vec<_> = (0..WRITERS)
        .map(|_| {
            let shop = shop.clone();
            let input = input.clone();
            may::go!(move || shop.app.accounts().register(input))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, ServiceError::Validation(_))));
}
