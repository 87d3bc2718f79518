use super::image::{ImageStore, ImageUpload};
use crate::auth::{require, Action, Caller, Target};
use crate::error::{EntityKind, FieldErrors, ServiceError};
use crate::model::{NewProduct, Product, ProductChanges, ProductFilter};
use crate::pagination::{Page, PageRequest};
use crate::store::EntityStore;
use crate::validation;
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Catalogue operations
///
/// Image files follow the record: a failed create or update discards the newly stored file,
/// a successful update removes the replaced one, and delete removes the product's image.
pub struct ProductService<'a> {
    store: &'a dyn EntityStore,
    images: &'a dyn ImageStore,
}

fn category_must_exist(store: &dyn EntityStore, category: Uuid) -> Result<(), ServiceError> {
    if store.find_category(category)?.is_none() {
        return Err(ServiceError::Validation(
            FieldErrors::new("Invalid category").with("category", "Category not found"),
        ));
    }
    Ok(())
}

impl<'a> ProductService<'a> {
    pub fn new(store: &'a dyn EntityStore, images: &'a dyn ImageStore) -> Self {
        Self { store, images }
    }

    /// Best-effort removal; a leftover file is logged, never surfaced
    fn discard(&self, reference: &str) {
        if let Err(e) = self.images.remove(reference) {
            log::warn!("could not remove image {}: {}", reference, e);
        }
    }

    fn fetch(&self, id: Uuid) -> Result<Product, ServiceError> {
        self.store
            .find_product(id)?
            .ok_or_else(|| ServiceError::not_found(EntityKind::Product, id))
    }

    pub fn create(
        &self,
        caller: &Caller,
        input: NewProduct,
        image: Option<ImageUpload>,
    ) -> Result<Product, ServiceError> {
        require(caller, Action::CreateProduct, &Target::Nothing)?;

        let mut errors = FieldErrors::new("Invalid product");
        let name = validation::text(
            &mut errors,
            "name",
            "Name",
            &input.name,
            validation::MIN_PRODUCT_NAME_LEN,
        );
        let description = validation::text(
            &mut errors,
            "description",
            "Description",
            &input.description,
            validation::MIN_DESCRIPTION_LEN,
        );
        validation::price(&mut errors, input.price);
        errors.into_result()?;

        let image = image.map(|upload| self.images.store(&upload)).transpose()?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            name,
            description,
            price: input.price,
            category: input.category,
            owner: caller.id,
            image,
            created_at: now,
            updated_at: now,
        };

        let outcome = self.store.serialized(&mut |store| {
            category_must_exist(store, product.category)?;
            store.insert_product(&product)?;
            Ok(())
        });
        if let Err(err) = outcome {
            if let Some(reference) = &product.image {
                self.discard(reference);
            }
            return Err(err);
        }

        log::info!("product {} created by {}", product.id, caller.id);
        Ok(product)
    }

    pub fn get(&self, id: Uuid) -> Result<Product, ServiceError> {
        self.fetch(id)
    }

    /// Newest first, filtered by category, owner and an inclusive price range
    pub fn list(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<Page<Product>, ServiceError> {
        let mut errors = FieldErrors::new("Invalid filter");
        if filter.min_price.is_some_and(|min| min < Decimal::ZERO) {
            errors.add("min_price", "Minimum price cannot be negative");
        }
        if filter.max_price.is_some_and(|max| max < Decimal::ZERO) {
            errors.add("max_price", "Maximum price cannot be negative");
        }
        if let (Some(min), Some(max)) = (filter.min_price, filter.max_price) {
            if max <= min {
                errors.add("max_price", "Maximum price must be greater than minimum price");
            }
        }
        errors.into_result()?;

        Ok(self.store.list_products(filter, page)?)
    }

    /// The caller's own products
    pub fn list_owned(
        &self,
        caller: &Caller,
        page: PageRequest,
    ) -> Result<Page<Product>, ServiceError> {
        Ok(self
            .store
            .list_products(&ProductFilter::owned_by(caller.id), page)?)
    }

    pub fn update(
        &self,
        caller: &Caller,
        id: Uuid,
        changes: ProductChanges,
        image: Option<ImageUpload>,
    ) -> Result<Product, ServiceError> {
        let existing = self.fetch(id)?;
        require(
            caller,
            Action::ModifyProduct,
            &Target::Product {
                owner: existing.owner,
            },
        )?;

        if changes.is_empty() && image.is_none() {
            return Err(ServiceError::validation("No update data provided"));
        }
        let mut errors = FieldErrors::new("Invalid product");
        let name = changes.name.as_deref().map(|name| {
            validation::text(
                &mut errors,
                "name",
                "Name",
                name,
                validation::MIN_PRODUCT_NAME_LEN,
            )
        });
        let description = changes.description.as_deref().map(|description| {
            validation::text(
                &mut errors,
                "description",
                "Description",
                description,
                validation::MIN_DESCRIPTION_LEN,
            )
        });
        if let Some(price) = changes.price {
            validation::price(&mut errors, price);
        }
        errors.into_result()?;

        let new_image = image.map(|upload| self.images.store(&upload)).transpose()?;

        let mut saved: Option<(Product, Option<String>)> = None;
        let outcome = self.store.serialized(&mut |store| {
            let mut product = store
                .find_product(id)?
                .ok_or_else(|| ServiceError::not_found(EntityKind::Product, id))?;
            if let Some(category) = changes.category {
                if category != product.category {
                    category_must_exist(store, category)?;
                }
                product.category = category;
            }
            if let Some(name) = &name {
                product.name = name.clone();
            }
            if let Some(description) = &description {
                product.description = description.clone();
            }
            if let Some(price) = changes.price {
                product.price = price;
            }
            let replaced = match &new_image {
                Some(reference) => product.image.replace(reference.clone()),
                None => None,
            };
            product.updated_at = Utc::now();
            if !store.update_product(&product)? {
                return Err(ServiceError::not_found(EntityKind::Product, id));
            }
            saved = Some((product, replaced));
            Ok(())
        });

        match (outcome, saved) {
            (Ok(()), Some((product, replaced))) => {
                if let Some(old) = replaced {
                    self.discard(&old);
                }
                log::info!("product {} updated by {}", id, caller.id);
                Ok(product)
            }
            (outcome, _) => {
                if let Some(reference) = &new_image {
                    self.discard(reference);
                }
                Err(outcome
                    .err()
                    .unwrap_or_else(|| ServiceError::not_found(EntityKind::Product, id)))
            }
        }
    }

    pub fn delete(&self, caller: &Caller, id: Uuid) -> Result<Product, ServiceError> {
        let product = self.fetch(id)?;
        require(
            caller,
            Action::ModifyProduct,
            &Target::Product {
                owner: product.owner,
            },
        )?;

        if !self.store.delete_product(id)? {
            return Err(ServiceError::not_found(EntityKind::Product, id));
        }
        if let Some(reference) = &product.image {
            self.discard(reference);
        }
        log::info!(
            "product {} (owner {}) deleted by {}",
            id,
            product.owner,
            caller.id
        );
        Ok(product)
    }
}
