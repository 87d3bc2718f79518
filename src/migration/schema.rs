//! The storefront schema.

use super::Migration;

pub static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 20240301090000,
        name: "create_users",
        statements: &[
            r#"
            CREATE TABLE users (
                id UUID PRIMARY KEY,
                seq BIGSERIAL NOT NULL,
                username TEXT NOT NULL,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                tier TEXT NOT NULL DEFAULT 'user',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                CONSTRAINT users_username_key UNIQUE (username),
                CONSTRAINT users_email_key UNIQUE (email),
                CONSTRAINT users_tier_check CHECK (tier IN ('user', 'admin', 'super_admin'))
            )
            "#,
            "CREATE INDEX idx_users_tier ON users (tier, created_at DESC)",
        ],
    },
    Migration {
        version: 20240301090100,
        name: "create_categories",
        statements: &[
            r#"
            CREATE TABLE categories (
                id UUID PRIMARY KEY,
                seq BIGSERIAL NOT NULL,
                name TEXT NOT NULL,
                parent_id UUID REFERENCES categories (id) ON DELETE RESTRICT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                CONSTRAINT categories_not_own_parent CHECK (parent_id IS NULL OR parent_id <> id)
            )
            "#,
            "CREATE INDEX idx_categories_parent ON categories (parent_id, seq)",
        ],
    },
    Migration {
        version: 20240301090200,
        name: "create_products",
        statements: &[
            r#"
            CREATE TABLE products (
                id UUID PRIMARY KEY,
                seq BIGSERIAL NOT NULL,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                price NUMERIC NOT NULL,
                category_id UUID NOT NULL REFERENCES categories (id) ON DELETE RESTRICT,
                owner_id UUID NOT NULL REFERENCES users (id) ON DELETE RESTRICT,
                image_ref TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                CONSTRAINT products_price_positive CHECK (price > 0)
            )
            "#,
            "CREATE INDEX idx_products_category ON products (category_id)",
            "CREATE INDEX idx_products_owner ON products (owner_id)",
            "CREATE INDEX idx_products_created ON products (created_at DESC, seq DESC)",
        ],
    },
    Migration {
        version: 20240301090300,
        name: "create_wishlist_entries",
        statements: &[
            // product_id carries no foreign key: entries for deleted products are purged
            // lazily when the wishlist is read.
            r#"
            CREATE TABLE wishlist_entries (
                id UUID PRIMARY KEY,
                seq BIGSERIAL NOT NULL,
                user_id UUID NOT NULL REFERENCES users (id) ON DELETE CASCADE,
                product_id UUID NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                CONSTRAINT wishlist_entries_user_product_key UNIQUE (user_id, product_id)
            )
            "#,
        ],
    },
];
