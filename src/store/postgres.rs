//! [`EntityStore`] over PostgreSQL.
//!
//! Works on any [`SqlExecutor`]: a [`MayPostgresExecutor`](crate::executor::MayPostgresExecutor)
//! for standalone statements, or a [`Transaction`] when running inside
//! [`serialized`](EntityStore::serialized). Tables are created by the embedded migrations in
//! [`crate::migration`].

use super::{EntityStore, StoreError, Unit};
use crate::error::ServiceError;
use crate::executor::SqlExecutor;
use crate::model::{Category, PasswordHash, Product, ProductFilter, Tier, User, WishlistEntry};
use crate::pagination::{Page, PageRequest};
use crate::transaction::Transaction;
use may_postgres::types::{FromSql, ToSql};
use may_postgres::Row;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, username, name, email, password_hash, tier, created_at";
const CATEGORY_COLUMNS: &str = "id, name, parent_id, created_at, updated_at";
const PRODUCT_COLUMNS: &str =
    "id, name, description, price, category_id, owner_id, image_ref, created_at, updated_at";
const WISHLIST_COLUMNS: &str = "id, user_id, product_id, created_at";

/// PostgreSQL-backed entity store
pub struct PgStore<E: SqlExecutor> {
    executor: E,
}

impl<E: SqlExecutor> PgStore<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn into_executor(self) -> E {
        self.executor
    }

    fn fetch_opt<T>(
        &self,
        sql: &str,
        params: &[&dyn ToSql],
        decode: fn(&Row) -> Result<T, StoreError>,
    ) -> Result<Option<T>, StoreError> {
        self.executor
            .query_opt(sql, params)?
            .map(|row| decode(&row))
            .transpose()
    }

    fn fetch_all<T>(
        &self,
        sql: &str,
        params: &[&dyn ToSql],
        decode: fn(&Row) -> Result<T, StoreError>,
    ) -> Result<Vec<T>, StoreError> {
        self.executor
            .query_all(sql, params)?
            .iter()
            .map(decode)
            .collect()
    }

    fn count(&self, sql: &str, params: &[&dyn ToSql]) -> Result<u64, StoreError> {
        let row = self.executor.query_one(sql, params)?;
        let count: i64 = column(&row, "count")?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

fn column<'r, T: FromSql<'r>>(row: &'r Row, name: &str) -> Result<T, StoreError> {
    row.try_get(name)
        .map_err(|e| StoreError::Corrupt(format!("column {name}: {e}")))
}

fn user_from_row(row: &Row) -> Result<User, StoreError> {
    let tier: String = column(row, "tier")?;
    Ok(User {
        id: column(row, "id")?,
        username: column(row, "username")?,
        name: column(row, "name")?,
        email: column(row, "email")?,
        password_hash: PasswordHash::new(column::<String>(row, "password_hash")?),
        tier: tier.parse::<Tier>().map_err(StoreError::Corrupt)?,
        created_at: column(row, "created_at")?,
    })
}

fn category_from_row(row: &Row) -> Result<Category, StoreError> {
    Ok(Category {
        id: column(row, "id")?,
        name: column(row, "name")?,
        parent: column(row, "parent_id")?,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}

fn product_from_row(row: &Row) -> Result<Product, StoreError> {
    Ok(Product {
        id: column(row, "id")?,
        name: column(row, "name")?,
        description: column(row, "description")?,
        price: column(row, "price")?,
        category: column(row, "category_id")?,
        owner: column(row, "owner_id")?,
        image: column(row, "image_ref")?,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}

fn wishlist_from_row(row: &Row) -> Result<WishlistEntry, StoreError> {
    Ok(WishlistEntry {
        id: column(row, "id")?,
        user: column(row, "user_id")?,
        product: column(row, "product_id")?,
        created_at: column(row, "created_at")?,
    })
}

/// WHERE clause and parameters for a product filter; parameters are numbered from `$1`
fn product_filter_sql(filter: &ProductFilter) -> (String, Vec<&dyn ToSql>) {
    let mut clauses = Vec::new();
    let mut params: Vec<&dyn ToSql> = Vec::new();
    if let Some(category) = &filter.category {
        params.push(category);
        clauses.push(format!("category_id = ${}", params.len()));
    }
    if let Some(owner) = &filter.owner {
        params.push(owner);
        clauses.push(format!("owner_id = ${}", params.len()));
    }
    if let Some(min) = &filter.min_price {
        params.push(min);
        clauses.push(format!("price >= ${}", params.len()));
    }
    if let Some(max) = &filter.max_price {
        params.push(max);
        clauses.push(format!("price <= ${}", params.len()));
    }
    let sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    (sql, params)
}

impl<E> EntityStore for PgStore<E>
where
    E: SqlExecutor + Send + Sync,
{
    fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.fetch_opt(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"),
            &[&id],
            user_from_row,
        )
    }

    fn find_user_by_login(&self, login: &str) -> Result<Option<User>, StoreError> {
        self.fetch_opt(
            &format!(
                "SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR email = $1 \
                 ORDER BY username = $1 DESC LIMIT 1"
            ),
            &[&login],
            user_from_row,
        )
    }

    fn find_user_conflicts(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        exclude: Option<Uuid>,
    ) -> Result<Vec<User>, StoreError> {
        self.fetch_all(
            &format!(
                "SELECT {USER_COLUMNS} FROM users \
                 WHERE (username = $1 OR email = $2) AND ($3::uuid IS NULL OR id <> $3)"
            ),
            &[&username, &email, &exclude],
            user_from_row,
        )
    }

    fn list_users(&self, tier: Tier, page: PageRequest) -> Result<Page<User>, StoreError> {
        let tier = tier.as_str();
        let limit = i64::from(page.limit);
        let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);
        let total = self.count(
            "SELECT COUNT(*) AS count FROM users WHERE tier = $1",
            &[&tier],
        )?;
        let data = self.fetch_all(
            &format!(
                "SELECT {USER_COLUMNS} FROM users WHERE tier = $1 \
                 ORDER BY created_at DESC, seq DESC LIMIT $2 OFFSET $3"
            ),
            &[&tier, &limit, &offset],
            user_from_row,
        )?;
        Ok(Page::new(data, page, total))
    }

    fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        self.executor.execute(
            "INSERT INTO users (id, username, name, email, password_hash, tier, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
            &[
                &user.id,
                &user.username,
                &user.name,
                &user.email,
                &user.password_hash.as_str(),
                &user.tier.as_str(),
                &user.created_at,
            ],
        )?;
        Ok(())
    }

    fn update_user(&self, user: &User) -> Result<bool, StoreError> {
        let rows = self.executor.execute(
            "UPDATE users SET username = $2, name = $3, email = $4, password_hash = $5, tier = $6 \
             WHERE id = $1",
            &[
                &user.id,
                &user.username,
                &user.name,
                &user.email,
                &user.password_hash.as_str(),
                &user.tier.as_str(),
            ],
        )?;
        Ok(rows > 0)
    }

    fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.executor.execute("DELETE FROM users WHERE id = $1", &[&id])? > 0)
    }

    fn find_category(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        self.fetch_opt(
            &format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"),
            &[&id],
            category_from_row,
        )
    }

    fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        self.fetch_all(
            &format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY seq"),
            &[],
            category_from_row,
        )
    }

    fn child_categories(&self, parent: Uuid) -> Result<Vec<Category>, StoreError> {
        self.fetch_all(
            &format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE parent_id = $1 ORDER BY seq"),
            &[&parent],
            category_from_row,
        )
    }

    fn insert_category(&self, category: &Category) -> Result<(), StoreError> {
        self.executor.execute(
            "INSERT INTO categories (id, name, parent_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5)",
            &[
                &category.id,
                &category.name,
                &category.parent,
                &category.created_at,
                &category.updated_at,
            ],
        )?;
        Ok(())
    }

    fn update_category(&self, category: &Category) -> Result<bool, StoreError> {
        let rows = self.executor.execute(
            "UPDATE categories SET name = $2, parent_id = $3, updated_at = $4 WHERE id = $1",
            &[
                &category.id,
                &category.name,
                &category.parent,
                &category.updated_at,
            ],
        )?;
        Ok(rows > 0)
    }

    fn delete_category(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self
            .executor
            .execute("DELETE FROM categories WHERE id = $1", &[&id])?
            > 0)
    }

    fn find_product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        self.fetch_opt(
            &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"),
            &[&id],
            product_from_row,
        )
    }

    fn list_products(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<Page<Product>, StoreError> {
        let limit = i64::from(page.limit);
        let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);
        let (where_sql, mut params) = product_filter_sql(filter);

        let total = self.count(
            &format!("SELECT COUNT(*) AS count FROM products{where_sql}"),
            &params,
        )?;

        params.push(&limit);
        let limit_idx = params.len();
        params.push(&offset);
        let offset_idx = params.len();
        let data = self.fetch_all(
            &format!(
                "SELECT {PRODUCT_COLUMNS} FROM products{where_sql} \
                 ORDER BY created_at DESC, seq DESC LIMIT ${limit_idx} OFFSET ${offset_idx}"
            ),
            &params,
            product_from_row,
        )?;
        Ok(Page::new(data, page, total))
    }

    fn products_owned_by(&self, owner: Uuid) -> Result<Vec<Product>, StoreError> {
        self.fetch_all(
            &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE owner_id = $1 ORDER BY seq"),
            &[&owner],
            product_from_row,
        )
    }

    fn count_products_in_category(&self, category: Uuid) -> Result<u64, StoreError> {
        self.count(
            "SELECT COUNT(*) AS count FROM products WHERE category_id = $1",
            &[&category],
        )
    }

    fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        self.executor.execute(
            "INSERT INTO products \
             (id, name, description, price, category_id, owner_id, image_ref, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            &[
                &product.id,
                &product.name,
                &product.description,
                &product.price,
                &product.category,
                &product.owner,
                &product.image,
                &product.created_at,
                &product.updated_at,
            ],
        )?;
        Ok(())
    }

    fn update_product(&self, product: &Product) -> Result<bool, StoreError> {
        let rows = self.executor.execute(
            "UPDATE products SET name = $2, description = $3, price = $4, category_id = $5, \
             image_ref = $6, updated_at = $7 WHERE id = $1",
            &[
                &product.id,
                &product.name,
                &product.description,
                &product.price,
                &product.category,
                &product.image,
                &product.updated_at,
            ],
        )?;
        Ok(rows > 0)
    }

    fn delete_product(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self
            .executor
            .execute("DELETE FROM products WHERE id = $1", &[&id])?
            > 0)
    }

    fn find_wishlist_entry(
        &self,
        user: Uuid,
        product: Uuid,
    ) -> Result<Option<WishlistEntry>, StoreError> {
        self.fetch_opt(
            &format!(
                "SELECT {WISHLIST_COLUMNS} FROM wishlist_entries \
                 WHERE user_id = $1 AND product_id = $2"
            ),
            &[&user, &product],
            wishlist_from_row,
        )
    }

    fn list_wishlist(&self, user: Uuid) -> Result<Vec<WishlistEntry>, StoreError> {
        self.fetch_all(
            &format!(
                "SELECT {WISHLIST_COLUMNS} FROM wishlist_entries WHERE user_id = $1 ORDER BY seq"
            ),
            &[&user],
            wishlist_from_row,
        )
    }

    fn insert_wishlist_entry(&self, entry: &WishlistEntry) -> Result<(), StoreError> {
        self.executor.execute(
            "INSERT INTO wishlist_entries (id, user_id, product_id, created_at) \
             VALUES ($1, $2, $3, $4)",
            &[&entry.id, &entry.user, &entry.product, &entry.created_at],
        )?;
        Ok(())
    }

    fn delete_wishlist_entry(&self, user: Uuid, product: Uuid) -> Result<bool, StoreError> {
        let rows = self.executor.execute(
            "DELETE FROM wishlist_entries WHERE user_id = $1 AND product_id = $2",
            &[&user, &product],
        )?;
        Ok(rows > 0)
    }

    fn delete_wishlist_entries(&self, ids: &[Uuid]) -> Result<u64, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let ids = ids.to_vec();
        Ok(self
            .executor
            .execute("DELETE FROM wishlist_entries WHERE id = ANY($1)", &[&ids])?)
    }

    fn delete_wishlist_by_user(&self, user: Uuid) -> Result<u64, StoreError> {
        Ok(self
            .executor
            .execute("DELETE FROM wishlist_entries WHERE user_id = $1", &[&user])?)
    }

    fn serialized(&self, unit: &mut Unit<'_>) -> Result<(), ServiceError> {
        let tx: Transaction = self.executor.begin_unit().map_err(StoreError::from)?;
        let scoped = PgStore::new(tx);
        match unit(&scoped) {
            Ok(()) => scoped
                .into_executor()
                .commit()
                .map_err(|e| StoreError::from(e).into()),
            Err(err) => {
                if let Err(rollback_err) = scoped.into_executor().rollback() {
                    log::warn!("rollback after failed unit also failed: {}", rollback_err);
                }
                Err(err)
            }
        }
    }
}
