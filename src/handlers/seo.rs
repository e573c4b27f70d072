//! Per-page SEO metadata.

use axum::{
    extract::{Multipart, Path, State},
    response::IntoResponse,
};
use serde::Deserialize;

use super::parse_uuid;
use crate::auth::AdminUser;
use crate::error::AppError;
use crate::extractors::Query;
use crate::pagination::{PageParams, Pagination};
use crate::response::{message, success_one, success_one_ok, success_page};
use crate::service::seo::{self, NewSeo, SeoPatch};
use crate::state::AppState;
use crate::upload::{read_multipart, UploadField};

fn seo_not_found() -> AppError {
    AppError::NotFound("seo entry".into())
}

/// `og_image` may also hold an external URL; only files we stored are deleted.
fn is_uploaded(path: &str) -> bool {
    path.starts_with(UploadField::MetaImage.directory()) && path.ends_with(".jpg")
}

#[derive(Debug, Default, Deserialize)]
pub struct ResolveQuery {
    #[serde(default)]
    pub path: String,
}

/// GET /api/seo/resolve?path=...
pub async fn resolve(State(state): State<AppState>, Query(q): Query<ResolveQuery>) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(seo::resolve(&state.pool, &q.path, &state.config.seo).await?))
}

pub async fn list(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(page): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = Pagination::from(page);
    let (rows, total) = seo::list(&state.pool, &page).await?;
    Ok(success_page(rows, total, &page))
}

pub async fn read(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_uuid(&id, "seo")?;
    Ok(success_one_ok(seo::find(&state.pool, id).await?.ok_or_else(seo_not_found)?))
}

pub async fn create(
    State(state): State<AppState>,
    _admin: AdminUser,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_multipart(&state.images, multipart, &[UploadField::MetaImage]).await?;
    let image = form.files.first(UploadField::MetaImage);
    let result = match form.parse::<NewSeo>() {
        Ok(input) => seo::create(&state.pool, input, image).await,
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
    let form = read_multipart(&state.images, multipart, &[UploadField::MetaImage]).await?;
    let image = form.files.first(UploadField::MetaImage);
    let result = async {
        let id = parse_uuid(&id, "seo")?;
        let patch = form.parse::<SeoPatch>()?;
        seo::update(&state.pool, id, patch, image).await?.ok_or_else(seo_not_found)
    }
    .await;
    let (entry, replaced) = form.files.settle(result).await?;
    if let Some(old) = replaced.filter(|p| is_uploaded(p)) {
        state.images.remove_quietly(&old).await;
    }
    Ok(success_one_ok(entry))
}

pub async fn delete(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_uuid(&id, "seo")?;
    let entry = seo::delete(&state.pool, id).await?.ok_or_else(seo_not_found)?;
    if let Some(old) = entry.og_image.filter(|p| is_uploaded(p)) {
        state.images.remove_quietly(&old).await;
    }
    Ok(message("SEO entry deleted"))
}
