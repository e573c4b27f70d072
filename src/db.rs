//! Database bootstrap: create the database if needed, apply DDL, seed the admin account.

use crate::config::{entities::submission_entities, AdminSeed};
use crate::error::AppError;
use crate::migration::{apply_entity_tables, quote};
use sqlx::{ConnectOptions, PgPool};
use std::str::FromStr;

/// Typed tables in dependency order. Every statement is idempotent.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT,
        phone TEXT,
        role TEXT NOT NULL DEFAULT 'store_owner' CHECK (role IN ('admin', 'store_owner', 'customer')),
        status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'inactive', 'deleted')),
        google_id TEXT UNIQUE,
        profile_image TEXT,
        reset_token TEXT,
        reset_token_expires_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS stores (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        owner_id UUID NOT NULL REFERENCES users(id),
        name TEXT NOT NULL,
        description TEXT,
        address TEXT,
        phone TEXT,
        email TEXT,
        logo TEXT,
        image TEXT,
        status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'inactive')),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS collections (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name TEXT NOT NULL,
        description TEXT,
        image TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name TEXT NOT NULL,
        description TEXT,
        collection_id UUID REFERENCES collections(id) ON DELETE SET NULL,
        slug TEXT NOT NULL UNIQUE,
        meta_title TEXT,
        meta_desc TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS product_variations (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        product_id UUID NOT NULL REFERENCES products(id),
        sku TEXT NOT NULL CHECK (sku <> ''),
        price NUMERIC(12, 2) CHECK (price >= 0),
        usecase TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE (product_id, sku)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS variation_attributes (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name TEXT NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS variation_values (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        attribute_id UUID NOT NULL REFERENCES variation_attributes(id) ON DELETE CASCADE,
        value TEXT NOT NULL,
        UNIQUE (attribute_id, value)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS variation_attribute_maps (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        variation_id UUID NOT NULL REFERENCES product_variations(id),
        value_id UUID NOT NULL REFERENCES variation_values(id),
        UNIQUE (variation_id, value_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS product_images (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        variation_id UUID NOT NULL REFERENCES product_variations(id),
        image TEXT NOT NULL,
        is_primary BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS orders (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        order_number TEXT NOT NULL UNIQUE,
        product_id UUID REFERENCES products(id) ON DELETE SET NULL,
        user_id UUID NOT NULL REFERENCES users(id),
        quantity INTEGER NOT NULL CHECK (quantity > 0),
        total_amount NUMERIC(12, 2) NOT NULL DEFAULT 0,
        status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'approved', 'rejected')),
        notes TEXT,
        admin_notes TEXT,
        approved_by UUID REFERENCES users(id),
        approved_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS reviews (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        store_id UUID REFERENCES stores(id) ON DELETE CASCADE,
        product_id UUID REFERENCES products(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        rating INTEGER CHECK (rating BETWEEN 1 AND 5),
        comment TEXT,
        status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'approved', 'rejected')),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        CHECK (store_id IS NOT NULL OR product_id IS NOT NULL)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sliders (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        title TEXT NOT NULL,
        subtitle TEXT,
        image TEXT NOT NULL,
        link TEXT,
        collection_id UUID REFERENCES collections(id) ON DELETE SET NULL,
        sort_order INTEGER NOT NULL DEFAULT 0,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS seo (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        page_path TEXT NOT NULL UNIQUE,
        meta_title TEXT,
        meta_description TEXT,
        meta_keywords TEXT,
        og_image TEXT,
        canonical_url TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS stores_owner_id_idx ON stores (owner_id)",
    "CREATE INDEX IF NOT EXISTS products_collection_id_idx ON products (collection_id)",
    "CREATE INDEX IF NOT EXISTS product_variations_product_id_idx ON product_variations (product_id)",
    "CREATE INDEX IF NOT EXISTS product_images_variation_id_idx ON product_images (variation_id)",
    "CREATE INDEX IF NOT EXISTS orders_user_id_idx ON orders (user_id)",
    "CREATE INDEX IF NOT EXISTS reviews_store_id_idx ON reviews (store_id)",
    "CREATE INDEX IF NOT EXISTS reviews_product_id_idx ON reviews (product_id)",
];

/// Creates every table and index that does not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), AppError> {
    for ddl in SCHEMA {
        sqlx::query(ddl).execute(pool).await?;
    }
    for ddl in INDEXES {
        sqlx::query(ddl).execute(pool).await?;
    }
    apply_entity_tables(pool, &submission_entities()).await?;
    tracing::info!("database schema ready");
    Ok(())
}

/// Creates the database named in `database_url` when it is missing, connecting through the
/// `postgres` maintenance database.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = split_database_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| AppError::BadRequest(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        sqlx::query(&format!("CREATE DATABASE {}", quote(&db_name)))
            .execute(&mut conn)
            .await?;
        tracing::info!(database = %db_name, "created database");
    }
    Ok(())
}

/// `(url of the postgres database, target database name)`.
fn split_database_url(url: &str) -> Result<(String, String), AppError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| AppError::BadRequest("DATABASE_URL: no path".into()))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let mut parts = path_and_query.splitn(2, '?');
    let db_name = parts.next().unwrap_or("").trim().to_string();
    let query = parts.next().map(|q| format!("?{}", q)).unwrap_or_default();
    let base = url.get(..path_start).unwrap_or(url);
    Ok((format!("{}postgres{}", base, query), db_name))
}

/// Ensures an active admin account exists for `seed.email`. An existing account with that
/// email is promoted; its password is left alone.
pub async fn seed_admin(pool: &PgPool, seed: &AdminSeed) -> Result<(), AppError> {
    let email = seed.email.trim().to_lowercase();
    let promoted = sqlx::query(
        "UPDATE users SET role = 'admin', status = 'active', updated_at = NOW() WHERE email = $1",
    )
    .bind(&email)
    .execute(pool)
    .await?
    .rows_affected();
    if promoted > 0 {
        tracing::info!(email = %email, "admin account present");
        return Ok(());
    }
    let hash = crate::auth::hash_password(seed.password.clone()).await?;
    sqlx::query(
        "INSERT INTO users (name, email, password_hash, role, status) VALUES ('Administrator', $1, $2, 'admin', 'active') \
         ON CONFLICT (email) DO NOTHING",
    )
    .bind(&email)
    .bind(&hash)
    .execute(pool)
    .await?;
    tracing::info!(email = %email, "seeded admin account");
    Ok(())
}
