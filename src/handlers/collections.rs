use axum::{
    extract::{Multipart, Path, State},
    response::IntoResponse,
};

use super::parse_uuid;
use crate::auth::AdminUser;
use crate::error::AppError;
use crate::extractors::Query;
use crate::pagination::{PageParams, Pagination};
use crate::response::{message, success_one, success_one_ok, success_page};
use crate::service::collections::{self, CollectionPatch, NewCollection};
use crate::state::AppState;
use crate::upload::{read_multipart, UploadField};

pub async fn list(State(state): State<AppState>, Query(page): Query<PageParams>) -> Result<impl IntoResponse, AppError> {
    let page = Pagination::from(page);
    let (rows, total) = collections::list(&state.pool, &page).await?;
    Ok(success_page(rows, total, &page))
}

pub async fn read(State(state): State<AppState>, Path(id): Path<String>) -> Result<impl IntoResponse, AppError> {
    let id = parse_uuid(&id, "collection")?;
    let row = collections::find(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("collection".into()))?;
    Ok(success_one_ok(row))
}

pub async fn create(
    State(state): State<AppState>,
    _admin: AdminUser,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_multipart(&state.images, multipart, &[UploadField::CollectionImage]).await?;
    let image = form.files.first(UploadField::CollectionImage);
    let result = match form.parse::<NewCollection>() {
        Ok(input) => collections::create(&state.pool, input, image).await,
        Err(e) => Err(e),
    };
    Ok(success_one(form.files.settle(result).await?))
}

pub async fn update(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_multipart(&state.images, multipart, &[UploadField::CollectionImage]).await?;
    let image = form.files.first(UploadField::CollectionImage);
    let result = async {
        let id = parse_uuid(&id, "collection")?;
        let patch = form.parse::<CollectionPatch>()?;
        collections::update(&state.pool, id, patch, image)
            .await?
            .ok_or_else(|| AppError::NotFound("collection".into()))
    }
    .await;
    let (row, released) = form.files.settle(result).await?;
    if let Some(old) = released {
        state.images.remove_quietly(&old).await;
    }
    Ok(success_one_ok(row))
}

pub async fn delete(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_uuid(&id, "collection")?;
    let row = collections::delete(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("collection".into()))?;
    if let Some(image) = row.image {
        state.images.remove_quietly(&image).await;
    }
    Ok(message("Collection deleted"))
}
