use super::hierarchy::{build_tree, validate_parent_assignment};
use crate::auth::{require, Action, Caller, Target};
use crate::error::{EntityKind, FieldErrors, ServiceError};
use crate::model::{Category, CategoryChanges, CategoryNode, NewCategory};
use crate::pagination::{Page, PageRequest};
use crate::store::EntityStore;
use crate::validation;
use chrono::Utc;
use uuid::Uuid;

/// Category CRUD and tree queries
///
/// Writes authorize first, then validate and write inside one serialized unit, so two
/// concurrent writers cannot both pass the depth check against the same snapshot.
pub struct CategoryService<'a> {
    store: &'a dyn EntityStore,
}

impl<'a> CategoryService<'a> {
    pub fn new(store: &'a dyn EntityStore) -> Self {
        Self { store }
    }

    pub fn create(&self, caller: &Caller, input: NewCategory) -> Result<Category, ServiceError> {
        require(caller, Action::ManageCategory, &Target::Nothing)?;

        let mut errors = FieldErrors::new("Invalid category");
        let name = validation::text(&mut errors, "name", "Name", &input.name, 1);
        errors.into_result()?;

        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4(),
            name,
            parent: input.parent,
            created_at: now,
            updated_at: now,
        };

        self.store.serialized(&mut |store| {
            validate_parent_assignment(store, None, category.parent)?;
            store.insert_category(&category)?;
            Ok(())
        })?;

        log::info!(
            "category {} '{}' created by {} (parent: {:?})",
            category.id,
            category.name,
            caller.id,
            category.parent
        );
        Ok(category)
    }

    pub fn update(
        &self,
        caller: &Caller,
        id: Uuid,
        changes: CategoryChanges,
    ) -> Result<Category, ServiceError> {
        require(caller, Action::ManageCategory, &Target::Nothing)?;

        if changes.is_empty() {
            return Err(ServiceError::validation("No update data provided"));
        }
        let mut errors = FieldErrors::new("Invalid category");
        let name = changes
            .name
            .as_deref()
            .map(|name| validation::text(&mut errors, "name", "Name", name, 1));
        errors.into_result()?;

        let mut updated = None;
        self.store.serialized(&mut |store| {
            let mut category = store
                .find_category(id)?
                .ok_or_else(|| ServiceError::not_found(EntityKind::Category, id))?;
            if let Some(parent) = changes.parent {
                if parent != category.parent {
                    validate_parent_assignment(store, Some(id), parent)?;
                }
                category.parent = parent;
            }
            if let Some(name) = &name {
                category.name = name.clone();
            }
            category.updated_at = Utc::now();
            if !store.update_category(&category)? {
                return Err(ServiceError::not_found(EntityKind::Category, id));
            }
            updated = Some(category);
            Ok(())
        })?;

        let category = updated.ok_or_else(|| ServiceError::not_found(EntityKind::Category, id))?;
        log::info!("category {} updated by {}", id, caller.id);
        Ok(category)
    }

    /// Delete a category that has neither child categories nor products
    pub fn delete(&self, caller: &Caller, id: Uuid) -> Result<Category, ServiceError> {
        require(caller, Action::ManageCategory, &Target::Nothing)?;

        let mut deleted = None;
        self.store.serialized(&mut |store| {
            let category = store
                .find_category(id)?
                .ok_or_else(|| ServiceError::not_found(EntityKind::Category, id))?;
            if !store.child_categories(id)?.is_empty() {
                return Err(ServiceError::Conflict(format!(
                    "category '{}' still has subcategories",
                    category.name
                )));
            }
            let products = store.count_products_in_category(id)?;
            if products > 0 {
                return Err(ServiceError::Conflict(format!(
                    "category '{}' is still used by {products} product(s)",
                    category.name
                )));
            }
            store.delete_category(id)?;
            deleted = Some(category);
            Ok(())
        })?;

        let category = deleted.ok_or_else(|| ServiceError::not_found(EntityKind::Category, id))?;
        log::info!("category {} '{}' deleted by {}", id, category.name, caller.id);
        Ok(category)
    }

    pub fn get(&self, id: Uuid) -> Result<Category, ServiceError> {
        self.store
            .find_category(id)?
            .ok_or_else(|| ServiceError::not_found(EntityKind::Category, id))
    }

    pub fn list(&self, page: PageRequest) -> Result<Page<Category>, ServiceError> {
        Ok(Page::from_all(self.store.list_categories()?, page))
    }

    /// The whole forest
    pub fn tree(&self) -> Result<Vec<CategoryNode>, ServiceError> {
        build_tree(self.store, None)
    }

    /// Category `id` with everything below it
    pub fn subtree(&self, id: Uuid) -> Result<CategoryNode, ServiceError> {
        let category = self.get(id)?;
        let mut node = CategoryNode::leaf(&category);
        node.children = build_tree(self.store, Some(id))?;
        Ok(node)
    }
}
