use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::validation::required_text;
use crate::error::AppError;
use crate::model::Slider;
use crate::patch::Patch;

pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<Slider>, AppError> {
    Ok(sqlx::query_as::<_, Slider>("SELECT * FROM sliders WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

/// Active sliders in display order.
pub async fn list_active(pool: &PgPool) -> Result<Vec<Slider>, AppError> {
    Ok(sqlx::query_as::<_, Slider>(
        "SELECT * FROM sliders WHERE is_active ORDER BY sort_order, created_at",
    )
    .fetch_all(pool)
    .await?)
}

pub async fn list_all(pool: &PgPool) -> Result<Vec<Slider>, AppError> {
    Ok(sqlx::query_as::<_, Slider>("SELECT * FROM sliders ORDER BY sort_order, created_at")
        .fetch_all(pool)
        .await?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSlider {
    #[serde(default)]
    pub title: String,
    pub subtitle: Option<String>,
    pub link: Option<String>,
    pub collection_id: Option<Uuid>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

pub async fn create(pool: &PgPool, input: NewSlider, image: String) -> Result<Slider, AppError> {
    let title = required_text(&input.title, "title")?;
    Ok(sqlx::query_as::<_, Slider>(
        r#"
        INSERT INTO sliders (title, subtitle, image, link, collection_id, sort_order, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(&title)
    .bind(&input.subtitle)
    .bind(&image)
    .bind(&input.link)
    .bind(input.collection_id)
    .bind(input.sort_order)
    .bind(input.is_active)
    .fetch_one(pool)
    .await?)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliderPatch {
    #[serde(default)]
    pub title: Patch<String>,
    #[serde(default)]
    pub subtitle: Patch<String>,
    #[serde(default)]
    pub link: Patch<String>,
    #[serde(default)]
    pub collection_id: Patch<Uuid>,
    #[serde(default)]
    pub sort_order: Patch<i32>,
    #[serde(default)]
    pub is_active: Patch<bool>,
}

/// Returns the updated slider and the replaced image path, if any.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    patch: SliderPatch,
    new_image: Option<String>,
) -> Result<Option<(Slider, Option<String>)>, AppError> {
    let mut tx = pool.begin().await?;
    let Some(current) = sqlx::query_as::<_, Slider>("SELECT * FROM sliders WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
    else {
        return Ok(None);
    };
    let title = patch.title.trimmed().apply_required(current.title, "title")?;
    let (image, replaced) = match new_image {
        Some(path) => (path, Some(current.image)),
        None => (current.image, None),
    };
    let row = sqlx::query_as::<_, Slider>(
        r#"
        UPDATE sliders
        SET title = $2, subtitle = $3, image = $4, link = $5, collection_id = $6,
            sort_order = $7, is_active = $8, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&title)
    .bind(patch.subtitle.apply(current.subtitle))
    .bind(&image)
    .bind(patch.link.apply(current.link))
    .bind(patch.collection_id.apply(current.collection_id))
    .bind(patch.sort_order.apply_required(current.sort_order, "sortOrder")?)
    .bind(patch.is_active.apply_required(current.is_active, "isActive")?)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(Some((row, replaced)))
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<Option<Slider>, AppError> {
    Ok(sqlx::query_as::<_, Slider>("DELETE FROM sliders WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(pool)
        .await?)
}
