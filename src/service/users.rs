//! User accounts: lookups, registration, profile and admin updates, password reset tokens.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::like_pattern;
use crate::error::AppError;
use crate::model::{Role, User, UserStatus};
use crate::pagination::Pagination;
use crate::patch::Patch;

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, AppError> {
    Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, AppError> {
    Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?)
}

pub async fn find_by_google_id(pool: &PgPool, google_id: &str) -> Result<Option<User>, AppError> {
    Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE google_id = $1")
        .bind(google_id)
        .fetch_optional(pool)
        .await?)
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub google_id: Option<String>,
    pub profile_image: Option<String>,
}

pub async fn create(pool: &PgPool, user: NewUser) -> Result<User, AppError> {
    let created = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (name, email, password_hash, phone, role, google_id, profile_image)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.phone)
    .bind(user.role.as_str())
    .bind(&user.google_id)
    .bind(&user.profile_image)
    .fetch_one(pool)
    .await?;
    tracing::info!(user_id = %created.id, role = %created.role, "user created");
    Ok(created)
}

/// Attaches a Google account to an existing user; fills the profile image if it was empty.
pub async fn link_google(pool: &PgPool, id: Uuid, google_id: &str, picture: Option<&str>) -> Result<User, AppError> {
    Ok(sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET google_id = $2, profile_image = COALESCE(profile_image, $3), updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(google_id)
    .bind(picture)
    .fetch_one(pool)
    .await?)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFilter {
    pub role: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    match filter.status.as_deref().filter(|s| !s.is_empty()) {
        Some(status) => {
            qb.push(" AND status = ").push_bind(status.to_string());
        }
        None => {
            qb.push(" AND status <> 'deleted'");
        }
    }
    if let Some(role) = filter.role.as_deref().filter(|s| !s.is_empty()) {
        qb.push(" AND role = ").push_bind(role.to_string());
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = like_pattern(search);
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Deleted accounts are hidden unless `status=deleted` is asked for.
pub async fn list(pool: &PgPool, filter: &UserFilter, page: &Pagination) -> Result<(Vec<User>, i64), AppError> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users WHERE TRUE");
    push_filters(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM users WHERE TRUE");
    push_filters(&mut qb, filter);
    qb.push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(page.limit_i64())
        .push(" OFFSET ")
        .push_bind(page.offset());
    let rows = qb.build_query_as::<User>().fetch_all(pool).await?;
    Ok((rows, total))
}

/// Fields an admin may change on any account.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserPatch {
    #[serde(default)]
    pub name: Patch<String>,
    #[serde(default)]
    pub phone: Patch<String>,
    #[serde(default)]
    pub role: Patch<Role>,
    #[serde(default)]
    pub status: Patch<UserStatus>,
}

pub async fn update_by_admin(pool: &PgPool, id: Uuid, patch: AdminUserPatch) -> Result<Option<User>, AppError> {
    let mut tx = pool.begin().await?;
    let Some(current) = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
    else {
        return Ok(None);
    };
    let name = patch.name.trimmed().apply_required(current.name, "name")?;
    let phone = patch.phone.trimmed().apply(current.phone);
    let role = patch.role.apply_required(current.role, "role")?;
    let status = patch.status.apply_required(current.status, "status")?;

    let updated = sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET name = $2, phone = $3, role = $4, status = $5, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&name)
    .bind(&phone)
    .bind(role.as_str())
    .bind(status.as_str())
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(Some(updated))
}

/// Fields a user may change on their own profile.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(default)]
    pub name: Patch<String>,
    #[serde(default)]
    pub phone: Patch<String>,
}

/// Applies `patch` and, when given, replaces the profile image. Returns the updated user and
/// the previous image path when it was replaced.
pub async fn update_profile(
    pool: &PgPool,
    id: Uuid,
    patch: ProfilePatch,
    new_image: Option<String>,
) -> Result<(User, Option<String>), AppError> {
    let mut tx = pool.begin().await?;
    let current = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("user".into()))?;
    let name = patch.name.trimmed().apply_required(current.name, "name")?;
    let phone = patch.phone.trimmed().apply(current.phone);
    let (image, replaced) = match new_image {
        Some(path) => (Some(path), current.profile_image),
        None => (current.profile_image, None),
    };

    let updated = sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET name = $2, phone = $3, profile_image = $4, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&name)
    .bind(&phone)
    .bind(&image)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok((updated, replaced))
}

/// Marks the account deleted. Returns false when it does not exist or is already deleted.
pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<bool, AppError> {
    let affected = sqlx::query(
        "UPDATE users SET status = 'deleted', updated_at = NOW() WHERE id = $1 AND status <> 'deleted'",
    )
    .bind(id)
    .execute(pool)
    .await?
    .rows_affected();
    Ok(affected == 1)
}

pub async fn set_password(pool: &PgPool, id: Uuid, password_hash: &str) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn store_reset_token(
    pool: &PgPool,
    id: Uuid,
    token: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE users SET reset_token = $2, reset_token_expires_at = $3, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(token)
    .bind(expires_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Sets a new password for the holder of an unexpired reset token and clears the token in the
/// same statement, so a token works once. Returns the user id, or None for an unknown or
/// expired token.
pub async fn consume_reset_token(pool: &PgPool, token: &str, password_hash: &str) -> Result<Option<Uuid>, AppError> {
    Ok(sqlx::query_scalar::<_, Uuid>(
        r#"
        UPDATE users
        SET password_hash = $2, reset_token = NULL, reset_token_expires_at = NULL, updated_at = NOW()
        WHERE reset_token = $1 AND reset_token_expires_at > NOW() AND status = 'active'
        RETURNING id
        "#,
    )
    .bind(token)
    .bind(password_hash)
    .fetch_optional(pool)
    .await?)
}
