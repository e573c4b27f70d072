use axum::{
    extract::{Multipart, Path, State},
    response::IntoResponse,
};
use serde::Deserialize;

use super::parse_uuid;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::extractors::Query;
use crate::model::Store;
use crate::pagination::{PageParams, Pagination};
use crate::response::{message, success_many, success_one, success_one_ok, success_page};
use crate::service::stores::{self, NewStore, StorePatch};
use crate::state::AppState;
use crate::upload::{read_multipart, UploadField};

const STORE_FIELDS: &[UploadField] = &[UploadField::Logo, UploadField::StoreImage];

#[derive(Debug, Default, Deserialize)]
pub struct StoreSearch {
    pub search: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(page): Query<PageParams>,
    Query(q): Query<StoreSearch>,
) -> Result<impl IntoResponse, AppError> {
    let page = Pagination::from(page);
    let (rows, total) = stores::list_active(&state.pool, q.search.as_deref(), &page).await?;
    Ok(success_page(rows, total, &page))
}

pub async fn mine(State(state): State<AppState>, user: AuthUser) -> Result<impl IntoResponse, AppError> {
    Ok(success_many(stores::list_by_owner(&state.pool, user.id()).await?))
}

pub async fn read(State(state): State<AppState>, Path(id): Path<String>) -> Result<impl IntoResponse, AppError> {
    let id = parse_uuid(&id, "store")?;
    let store = stores::find(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("store".into()))?;
    Ok(success_one_ok(store))
}

/// Multipart: `data` + optional `logo` and `storeImage`.
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_multipart(&state.images, multipart, STORE_FIELDS).await?;
    let logo = form.files.first(UploadField::Logo);
    let image = form.files.first(UploadField::StoreImage);
    let result = match form.parse::<NewStore>() {
        Ok(input) => {
            let owner_id = match input.owner_id {
                Some(owner) if user.is_admin() => owner,
                _ => user.id(),
            };
            stores::create(&state.pool, owner_id, input, logo, image).await
        }
        Err(e) => Err(e),
    };
    let store = form.files.settle(result).await?;
    Ok(success_one(store))
}

async fn owned_store(state: &AppState, user: &AuthUser, raw_id: &str) -> Result<Store, AppError> {
    let id = parse_uuid(raw_id, "store")?;
    let store = stores::find(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("store".into()))?;
    user.ensure_owner_or_admin(store.owner_id)?;
    Ok(store)
}

/// Owner or admin. Replaced images are deleted once the update is committed.
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_multipart(&state.images, multipart, STORE_FIELDS).await?;
    let logo = form.files.first(UploadField::Logo);
    let image = form.files.first(UploadField::StoreImage);
    let result = async {
        let store = owned_store(&state, &user, &id).await?;
        let patch = form.parse::<StorePatch>()?;
        stores::update(&state.pool, store.id, patch, logo, image)
            .await?
            .ok_or_else(|| AppError::NotFound("store".into()))
    }
    .await;
    let (store, replaced) = form.files.settle(result).await?;
    state.images.remove_all_quietly(replaced).await;
    Ok(success_one_ok(store))
}

/// Hard delete of the store and its reviews; files go after commit.
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let store = owned_store(&state, &user, &id).await?;
    let deleted = stores::delete(&state.pool, store.id)
        .await?
        .ok_or_else(|| AppError::NotFound("store".into()))?;
    state.images.remove_all_quietly(stores::store_files(&deleted)).await;
    Ok(message("Store deleted"))
}
