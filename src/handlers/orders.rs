//! Orders: placed by store owners, approved or rejected by admins.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;

use super::parse_uuid;
use crate::auth::{AdminUser, AuthUser};
use crate::error::AppError;
use crate::extractors::{Json, OptionalJson, Query};
use crate::model::Order;
use crate::pagination::{PageParams, Pagination};
use crate::response::{message, success_one, success_one_ok, success_page};
use crate::service::orders::{self, NewOrder, OrderFilter, OrderPatch};
use crate::state::AppState;

fn order_not_found() -> AppError {
    AppError::NotFound("order".into())
}

/// Loads an order the caller owns, or any order for admins.
async fn visible_order(state: &AppState, user: &AuthUser, raw_id: &str) -> Result<Order, AppError> {
    let id = parse_uuid(raw_id, "order")?;
    let order = orders::find(&state.pool, id).await?.ok_or_else(order_not_found)?;
    user.ensure_owner_or_admin(order.user_id)?;
    Ok(order)
}

/// POST /api/orders
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<NewOrder>,
) -> Result<impl IntoResponse, AppError> {
    let target = input.user_id.unwrap_or(user.id());
    if target != user.id() && !user.is_admin() {
        return Err(AppError::Forbidden("cannot place orders for another user".into()));
    }
    let order = orders::create(&state.pool, target, input).await?;
    Ok(success_one(order))
}

/// GET /api/orders (admin)
pub async fn list(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(page): Query<PageParams>,
    Query(filter): Query<OrderFilter>,
) -> Result<impl IntoResponse, AppError> {
    let page = Pagination::from(page);
    let (rows, total) = orders::list(&state.pool, &filter, &page).await?;
    Ok(success_page(rows, total, &page))
}

/// GET /api/orders/my
pub async fn mine(
    State(state): State<AppState>,
    user: AuthUser,
    Query(page): Query<PageParams>,
    Query(filter): Query<OrderFilter>,
) -> Result<impl IntoResponse, AppError> {
    let page = Pagination::from(page);
    let filter = OrderFilter {
        user_id: Some(user.id()),
        ..filter
    };
    let (rows, total) = orders::list(&state.pool, &filter, &page).await?;
    Ok(success_page(rows, total, &page))
}

pub async fn read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(visible_order(&state, &user, &id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(patch): Json<OrderPatch>,
) -> Result<impl IntoResponse, AppError> {
    let order = visible_order(&state, &user, &id).await?;
    let order = orders::update(&state.pool, order.id, patch)
        .await?
        .ok_or_else(order_not_found)?;
    Ok(success_one_ok(order))
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let order = visible_order(&state, &user, &id).await?;
    orders::delete(&state.pool, order.id).await?.ok_or_else(order_not_found)?;
    Ok(message("Order deleted"))
}

pub async fn approve(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_uuid(&id, "order")?;
    Ok(success_one_ok(orders::approve(&state.pool, id, admin.id).await?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectRequest {
    pub admin_notes: Option<String>,
}

/// The body is optional; an empty request rejects without notes.
pub async fn reject(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    OptionalJson(body): OptionalJson<RejectRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_uuid(&id, "order")?;
    let notes = body
        .and_then(|b| b.admin_notes)
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    Ok(success_one_ok(orders::reject(&state.pool, id, admin.id, notes).await?))
}
