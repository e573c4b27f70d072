use axum::{
    extract::{Multipart, Path, State},
    response::IntoResponse,
};

use super::parse_uuid;
use crate::auth::AdminUser;
use crate::error::AppError;
use crate::response::{message, success_many, success_one, success_one_ok};
use crate::service::sliders::{self, NewSlider, SliderPatch};
use crate::state::AppState;
use crate::upload::{read_multipart, UploadField};

fn slider_not_found() -> AppError {
    AppError::NotFound("slider".into())
}

/// GET /api/sliders: active slides in display order.
pub async fn list_active(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(success_many(sliders::list_active(&state.pool).await?))
}

/// GET /api/admin/sliders
pub async fn list_all(State(state): State<AppState>, _admin: AdminUser) -> Result<impl IntoResponse, AppError> {
    Ok(success_many(sliders::list_all(&state.pool).await?))
}

pub async fn read(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_uuid(&id, "slider")?;
    Ok(success_one_ok(sliders::find(&state.pool, id).await?.ok_or_else(slider_not_found)?))
}

pub async fn create(
    State(state): State<AppState>,
    _admin: AdminUser,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_multipart(&state.images, multipart, &[UploadField::SliderImage]).await?;
    let image = form.files.first(UploadField::SliderImage);
    let result = async {
        let input = form.parse::<NewSlider>()?;
        let image = image.ok_or_else(|| AppError::Validation("sliderImage is required".into()))?;
        sliders::create(&state.pool, input, image).await
    }
    .await;
    Ok(success_one(form.files.settle(result).await?))
}

pub async fn update(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_multipart(&state.images, multipart, &[UploadField::SliderImage]).await?;
    let image = form.files.first(UploadField::SliderImage);
    let result = async {
        let id = parse_uuid(&id, "slider")?;
        let patch = form.parse::<SliderPatch>()?;
        sliders::update(&state.pool, id, patch, image).await?.ok_or_else(slider_not_found)
    }
    .await;
    let (slider, replaced) = form.files.settle(result).await?;
    if let Some(old) = replaced {
        state.images.remove_quietly(&old).await;
    }
    Ok(success_one_ok(slider))
}

pub async fn delete(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_uuid(&id, "slider")?;
    let slider = sliders::delete(&state.pool, id).await?.ok_or_else(slider_not_found)?;
    state.images.remove_quietly(&slider.image).await;
    Ok(message("Slider deleted"))
}
