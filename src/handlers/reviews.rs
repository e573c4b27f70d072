use axum::{
    extract::{Path, State},
    response::IntoResponse,
};

use super::parse_uuid;
use crate::auth::AdminUser;
use crate::error::AppError;
use crate::extractors::{Json, Query};
use crate::pagination::{PageParams, Pagination};
use crate::response::{message, success_one, success_one_ok, success_page};
use crate::service::reviews::{self, NewReview, ReviewFilter, ReviewPatch, Visibility};
use crate::state::AppState;

fn review_not_found() -> AppError {
    AppError::NotFound("review".into())
}

/// POST /api/reviews. Always stored as pending.
pub async fn submit(State(state): State<AppState>, Json(input): Json<NewReview>) -> Result<impl IntoResponse, AppError> {
    Ok(success_one(reviews::submit(&state.pool, input).await?))
}

async fn list_with(
    state: &AppState,
    page: PageParams,
    filter: &ReviewFilter,
    visibility: Visibility,
) -> Result<impl IntoResponse, AppError> {
    let page = Pagination::from(page);
    let (rows, total) = reviews::list(&state.pool, filter, visibility, &page).await?;
    Ok(success_page(rows, total, &page))
}

/// GET /api/reviews: approved only.
pub async fn list_public(
    State(state): State<AppState>,
    Query(page): Query<PageParams>,
    Query(filter): Query<ReviewFilter>,
) -> Result<impl IntoResponse, AppError> {
    list_with(&state, page, &filter, Visibility::ApprovedOnly).await
}

pub async fn read_public(State(state): State<AppState>, Path(id): Path<String>) -> Result<impl IntoResponse, AppError> {
    let id = parse_uuid(&id, "review")?;
    let review = reviews::find(&state.pool, id, Visibility::ApprovedOnly)
        .await?
        .ok_or_else(review_not_found)?;
    Ok(success_one_ok(review))
}

/// GET /api/admin/reviews
pub async fn list_admin(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(page): Query<PageParams>,
    Query(filter): Query<ReviewFilter>,
) -> Result<impl IntoResponse, AppError> {
    list_with(&state, page, &filter, Visibility::All).await
}

pub async fn read_admin(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_uuid(&id, "review")?;
    let review = reviews::find(&state.pool, id, Visibility::All)
        .await?
        .ok_or_else(review_not_found)?;
    Ok(success_one_ok(review))
}

pub async fn update(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(patch): Json<ReviewPatch>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_uuid(&id, "review")?;
    let review = reviews::update(&state.pool, id, patch).await?.ok_or_else(review_not_found)?;
    tracing::info!(review_id = %id, admin_id = %admin.id, status = review.status.as_str(), "review updated");
    Ok(success_one_ok(review))
}

pub async fn delete(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_uuid(&id, "review")?;
    if !reviews::delete(&state.pool, id).await? {
        return Err(review_not_found());
    }
    Ok(message("Review deleted"))
}
