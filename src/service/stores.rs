//! Stores: public listing, owner management and transactional hard delete.

use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::like_pattern;
use super::validation::{ensure_email, required_text};
use crate::error::AppError;
use crate::model::{Store, StoreStatus};
use crate::pagination::Pagination;
use crate::patch::Patch;

pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<Store>, AppError> {
    Ok(sqlx::query_as::<_, Store>("SELECT * FROM stores WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

fn push_public_filters(qb: &mut QueryBuilder<'_, Postgres>, search: Option<&str>) {
    qb.push(" WHERE status = 'active'");
    if let Some(term) = search.map(str::trim).filter(|s| !s.is_empty()) {
        qb.push(" AND name ILIKE ").push_bind(like_pattern(term));
    }
}

/// Active stores, newest first.
pub async fn list_active(pool: &PgPool, search: Option<&str>, page: &Pagination) -> Result<(Vec<Store>, i64), AppError> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM stores");
    push_public_filters(&mut count, search);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM stores");
    push_public_filters(&mut qb, search);
    qb.push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(page.limit_i64())
        .push(" OFFSET ")
        .push_bind(page.offset());
    let rows = qb.build_query_as::<Store>().fetch_all(pool).await?;
    Ok((rows, total))
}

pub async fn list_by_owner(pool: &PgPool, owner_id: Uuid) -> Result<Vec<Store>, AppError> {
    Ok(
        sqlx::query_as::<_, Store>("SELECT * FROM stores WHERE owner_id = $1 ORDER BY created_at DESC")
            .bind(owner_id)
            .fetch_all(pool)
            .await?,
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStore {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Honoured for admins only.
    pub owner_id: Option<Uuid>,
}

fn optional_email(email: Option<String>) -> Result<Option<String>, AppError> {
    match email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
        Some(e) => Ok(Some(ensure_email(e, "email")?)),
        None => Ok(None),
    }
}

pub async fn create(
    pool: &PgPool,
    owner_id: Uuid,
    input: NewStore,
    logo: Option<String>,
    image: Option<String>,
) -> Result<Store, AppError> {
    let name = required_text(&input.name, "name")?;
    let email = optional_email(input.email)?;
    let store = sqlx::query_as::<_, Store>(
        r#"
        INSERT INTO stores (owner_id, name, description, address, phone, email, logo, image)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(owner_id)
    .bind(&name)
    .bind(&input.description)
    .bind(&input.address)
    .bind(&input.phone)
    .bind(&email)
    .bind(&logo)
    .bind(&image)
    .fetch_one(pool)
    .await?;
    tracing::info!(store_id = %store.id, owner_id = %owner_id, "store created");
    Ok(store)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorePatch {
    #[serde(default)]
    pub name: Patch<String>,
    #[serde(default)]
    pub description: Patch<String>,
    #[serde(default)]
    pub address: Patch<String>,
    #[serde(default)]
    pub phone: Patch<String>,
    #[serde(default)]
    pub email: Patch<String>,
    #[serde(default)]
    pub status: Patch<StoreStatus>,
}

/// Returns the updated store and the image paths that were replaced.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    patch: StorePatch,
    new_logo: Option<String>,
    new_image: Option<String>,
) -> Result<Option<(Store, Vec<String>)>, AppError> {
    let mut tx = pool.begin().await?;
    let Some(current) = sqlx::query_as::<_, Store>("SELECT * FROM stores WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
    else {
        return Ok(None);
    };

    let name = patch.name.trimmed().apply_required(current.name, "name")?;
    let email = match patch.email.trimmed() {
        Patch::Value(e) => Some(ensure_email(&e, "email")?),
        other => other.apply(current.email),
    };
    let status = patch.status.apply_required(current.status, "status")?;
    let mut replaced = Vec::new();
    let logo = match new_logo {
        Some(path) => {
            replaced.extend(current.logo);
            Some(path)
        }
        None => current.logo,
    };
    let image = match new_image {
        Some(path) => {
            replaced.extend(current.image);
            Some(path)
        }
        None => current.image,
    };

    let store = sqlx::query_as::<_, Store>(
        r#"
        UPDATE stores
        SET name = $2, description = $3, address = $4, phone = $5, email = $6,
            logo = $7, image = $8, status = $9, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&name)
    .bind(patch.description.apply(current.description))
    .bind(patch.address.apply(current.address))
    .bind(patch.phone.trimmed().apply(current.phone))
    .bind(&email)
    .bind(&logo)
    .bind(&image)
    .bind(status.as_str())
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(Some((store, replaced)))
}

/// Deletes the store and its reviews in one transaction. Returns the deleted row so the caller
/// can remove its files once the transaction has committed.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<Option<Store>, AppError> {
    let mut tx = pool.begin().await?;
    let reviews = sqlx::query("DELETE FROM reviews WHERE store_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    let deleted = sqlx::query_as::<_, Store>("DELETE FROM stores WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    if deleted.is_none() {
        return Ok(None);
    }
    tx.commit().await?;
    tracing::info!(store_id = %id, reviews, "store deleted");
    Ok(deleted)
}

/// Paths of files owned by a store row.
pub fn store_files(store: &Store) -> Vec<String> {
    store.logo.iter().chain(store.image.iter()).cloned().collect()
}
