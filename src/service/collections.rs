use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::validation::required_text;
use crate::error::AppError;
use crate::model::Collection;
use crate::pagination::Pagination;
use crate::patch::Patch;

pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<Collection>, AppError> {
    Ok(sqlx::query_as::<_, Collection>("SELECT * FROM collections WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

pub async fn list(pool: &PgPool, page: &Pagination) -> Result<(Vec<Collection>, i64), AppError> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM collections")
        .fetch_one(pool)
        .await?;
    let rows = sqlx::query_as::<_, Collection>("SELECT * FROM collections ORDER BY name, id LIMIT $1 OFFSET $2")
        .bind(page.limit_i64())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;
    Ok((rows, total))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCollection {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
}

pub async fn create(pool: &PgPool, input: NewCollection, image: Option<String>) -> Result<Collection, AppError> {
    let name = required_text(&input.name, "name")?;
    Ok(sqlx::query_as::<_, Collection>(
        "INSERT INTO collections (name, description, image) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(&name)
    .bind(&input.description)
    .bind(&image)
    .fetch_one(pool)
    .await?)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionPatch {
    #[serde(default)]
    pub name: Patch<String>,
    #[serde(default)]
    pub description: Patch<String>,
    /// Only `null` is accepted here, to remove the current image. A new image is uploaded as
    /// `collectionImage`.
    #[serde(default)]
    pub image: Patch<String>,
}

/// New image column value and the path it releases.
fn image_change(
    current: Option<String>,
    uploaded: Option<String>,
    patch: Patch<String>,
) -> Result<(Option<String>, Option<String>), AppError> {
    match (uploaded, patch) {
        (_, Patch::Value(_)) => Err(AppError::Validation(
            "image accepts only null; upload collectionImage to replace it".into(),
        )),
        (Some(path), _) => Ok((Some(path), current)),
        (None, Patch::Null) => Ok((None, current)),
        (None, Patch::Missing) => Ok((current, None)),
    }
}

/// Returns the updated row and the image path it no longer uses.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    patch: CollectionPatch,
    new_image: Option<String>,
) -> Result<Option<(Collection, Option<String>)>, AppError> {
    let mut tx = pool.begin().await?;
    let Some(current) = sqlx::query_as::<_, Collection>("SELECT * FROM collections WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
    else {
        return Ok(None);
    };
    let name = patch.name.trimmed().apply_required(current.name, "name")?;
    let (image, released) = image_change(current.image, new_image, patch.image)?;
    let row = sqlx::query_as::<_, Collection>(
        r#"
        UPDATE collections SET name = $2, description = $3, image = $4, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&name)
    .bind(patch.description.apply(current.description))
    .bind(&image)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(Some((row, released)))
}

/// Products and sliders keep existing with their collection cleared.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<Option<Collection>, AppError> {
    Ok(sqlx::query_as::<_, Collection>("DELETE FROM collections WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current() -> Option<String> {
        Some("collections/old.jpg".into())
    }

    #[test]
    fn upload_replaces_and_releases_the_old_image() {
        let (image, released) = image_change(current(), Some("collections/new.jpg".into()), Patch::Missing).unwrap();
        assert_eq!(image.as_deref(), Some("collections/new.jpg"));
        assert_eq!(released, current());
    }

    #[test]
    fn null_clears_and_missing_keeps() {
        assert_eq!(image_change(current(), None, Patch::Null).unwrap(), (None, current()));
        assert_eq!(image_change(current(), None, Patch::Missing).unwrap(), (current(), None));
    }

    #[test]
    fn string_image_is_refused() {
        let err = image_change(current(), None, Patch::Value("http://elsewhere/x.jpg".into())).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
