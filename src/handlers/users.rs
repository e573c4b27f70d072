//! Admin user management.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};

use super::parse_uuid;
use crate::auth::AdminUser;
use crate::error::AppError;
use crate::extractors::{Json, Query};
use crate::pagination::{PageParams, Pagination};
use crate::response::{message, success_one_ok, success_page};
use crate::service::users::{self, AdminUserPatch, UserFilter};
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(page): Query<PageParams>,
    Query(filter): Query<UserFilter>,
) -> Result<impl IntoResponse, AppError> {
    let page = Pagination::from(page);
    let (rows, total) = users::list(&state.pool, &filter, &page).await?;
    Ok(success_page(rows, total, &page))
}

pub async fn read(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_uuid(&id, "user")?;
    let user = users::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("user".into()))?;
    Ok(success_one_ok(user))
}

pub async fn update(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(patch): Json<AdminUserPatch>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_uuid(&id, "user")?;
    let user = users::update_by_admin(&state.pool, id, patch)
        .await?
        .ok_or_else(|| AppError::NotFound("user".into()))?;
    tracing::info!(user_id = %id, admin_id = %admin.id, "user updated by admin");
    Ok(success_one_ok(user))
}

/// Soft delete: the row stays with status `deleted`.
pub async fn delete(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_uuid(&id, "user")?;
    if id == admin.id {
        return Err(AppError::BadRequest("admins cannot delete their own account".into()));
    }
    if !users::soft_delete(&state.pool, id).await? {
        return Err(AppError::NotFound("user".into()));
    }
    tracing::info!(user_id = %id, admin_id = %admin.id, "user deleted");
    Ok(message("User deleted"))
}
