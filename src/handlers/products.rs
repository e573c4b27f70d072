//! Products with their variations, attribute pairs and images.

use axum::{
    extract::{Multipart, Path, State},
    response::IntoResponse,
};
use serde::Deserialize;

use super::parse_uuid;
use crate::auth::AdminUser;
use crate::error::AppError;
use crate::extractors::{Json, Query};
use crate::pagination::{PageParams, Pagination};
use crate::response::{message, success_many, success_one, success_one_ok, success_page};
use crate::service::catalog::{self, NewProduct, ProductFilter, ProductPatch, VariationInput};
use crate::state::AppState;
use crate::upload::{read_multipart, UploadField};

/// Variation images of any index.
const VARIATION_FIELDS: &[UploadField] = &[UploadField::VariationImage(0)];

fn product_not_found() -> AppError {
    AppError::NotFound("product".into())
}

pub async fn list(
    State(state): State<AppState>,
    Query(page): Query<PageParams>,
    Query(filter): Query<ProductFilter>,
) -> Result<impl IntoResponse, AppError> {
    let page = Pagination::from(page);
    let (rows, total) = catalog::list(&state.pool, &filter, &page).await?;
    Ok(success_page(rows, total, &page))
}

pub async fn read(State(state): State<AppState>, Path(id): Path<String>) -> Result<impl IntoResponse, AppError> {
    let id = parse_uuid(&id, "product")?;
    let product = catalog::find(&state.pool, id).await?.ok_or_else(product_not_found)?;
    Ok(success_one_ok(product))
}

pub async fn read_by_slug(State(state): State<AppState>, Path(slug): Path<String>) -> Result<impl IntoResponse, AppError> {
    let product = catalog::find_by_slug(&state.pool, slug.trim())
        .await?
        .ok_or_else(product_not_found)?;
    Ok(success_one_ok(product))
}

/// POST /api/products. `variationImages[i]` files attach to the i-th variation of `data`.
pub async fn create(
    State(state): State<AppState>,
    _admin: AdminUser,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_multipart(&state.images, multipart, VARIATION_FIELDS).await?;
    let result = async {
        let input = form.parse::<NewProduct>()?;
        let images = form.files.variation_image_groups(input.variations.len())?;
        catalog::create_product(&state.pool, input, &images).await
    }
    .await;
    let product = form.files.settle(result).await?;
    Ok(success_one(product))
}

pub async fn update(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
    Json(patch): Json<ProductPatch>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_uuid(&id, "product")?;
    let product = catalog::update(&state.pool, id, patch).await?.ok_or_else(product_not_found)?;
    Ok(success_one_ok(product))
}

/// Rows go in one transaction; image files are removed after it commits.
pub async fn delete(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_uuid(&id, "product")?;
    let files = catalog::delete_product(&state.pool, id).await?.ok_or_else(product_not_found)?;
    tracing::info!(product_id = %id, admin_id = %admin.id, images = files.len(), "product deleted");
    state.images.remove_all_quietly(files).await;
    Ok(message("Product deleted"))
}

#[derive(Debug, Deserialize)]
pub struct VariationsRequest {
    #[serde(default)]
    pub variations: Vec<VariationInput>,
}

/// POST /api/products/:id/variations
pub async fn add_variations(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_multipart(&state.images, multipart, VARIATION_FIELDS).await?;
    let result = async {
        let id = parse_uuid(&id, "product")?;
        let body = form.parse::<VariationsRequest>()?;
        let images = form.files.variation_image_groups(body.variations.len())?;
        catalog::add_variations(&state.pool, id, body.variations, &images)
            .await?
            .ok_or_else(product_not_found)
    }
    .await;
    let product = form.files.settle(result).await?;
    Ok(success_one(product))
}

/// DELETE /api/variations/:id
pub async fn delete_variation(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_uuid(&id, "variation")?;
    let files = catalog::delete_variation(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("variation".into()))?;
    state.images.remove_all_quietly(files).await;
    Ok(message("Variation deleted"))
}

/// POST /api/variations/:id/images (multipart `productImage`, repeatable)
pub async fn add_images(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_multipart(&state.images, multipart, &[UploadField::ProductImage]).await?;
    let paths = form.files.of(UploadField::ProductImage);
    let result = async {
        let id = parse_uuid(&id, "variation")?;
        if paths.is_empty() {
            return Err(AppError::Validation("productImage is required".into()));
        }
        catalog::add_images(&state.pool, id, &paths)
            .await?
            .ok_or_else(|| AppError::NotFound("variation".into()))
    }
    .await;
    let images = form.files.settle(result).await?;
    Ok(success_one(images))
}

/// DELETE /api/product-images/:id
pub async fn delete_image(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_uuid(&id, "image")?;
    let image = catalog::delete_image(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("image".into()))?;
    state.images.remove_quietly(&image.image).await;
    Ok(message("Image deleted"))
}

/// GET /api/variation-attributes
pub async fn list_attributes(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(success_many(catalog::list_attributes(&state.pool).await?))
}
