use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::SeoDefaults;
use crate::error::AppError;
use crate::model::seo::normalize_path;
use crate::model::{ResolvedSeo, SeoEntry};
use crate::pagination::Pagination;
use crate::patch::Patch;

pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<SeoEntry>, AppError> {
    Ok(sqlx::query_as::<_, SeoEntry>("SELECT * FROM seo WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

pub async fn list(pool: &PgPool, page: &Pagination) -> Result<(Vec<SeoEntry>, i64), AppError> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM seo").fetch_one(pool).await?;
    let rows = sqlx::query_as::<_, SeoEntry>("SELECT * FROM seo ORDER BY page_path LIMIT $1 OFFSET $2")
        .bind(page.limit_i64())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;
    Ok((rows, total))
}

/// Stored metadata for `raw_path`, or the site defaults flagged `isDefault`.
pub async fn resolve(pool: &PgPool, raw_path: &str, defaults: &SeoDefaults) -> Result<ResolvedSeo, AppError> {
    let path = normalize_path(raw_path);
    let entry = sqlx::query_as::<_, SeoEntry>("SELECT * FROM seo WHERE page_path = $1")
        .bind(&path)
        .fetch_optional(pool)
        .await?;
    Ok(match entry {
        Some(e) => ResolvedSeo::from_entry(e),
        None => ResolvedSeo::defaults(path, defaults),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSeo {
    #[serde(default)]
    pub page_path: String,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub og_image: Option<String>,
    pub canonical_url: Option<String>,
}

pub async fn create(pool: &PgPool, input: NewSeo, uploaded_image: Option<String>) -> Result<SeoEntry, AppError> {
    let path = normalize_path(&input.page_path);
    Ok(sqlx::query_as::<_, SeoEntry>(
        r#"
        INSERT INTO seo (page_path, meta_title, meta_description, meta_keywords, og_image, canonical_url)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(&path)
    .bind(&input.meta_title)
    .bind(&input.meta_description)
    .bind(&input.meta_keywords)
    .bind(uploaded_image.or(input.og_image))
    .bind(&input.canonical_url)
    .fetch_one(pool)
    .await?)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoPatch {
    #[serde(default)]
    pub page_path: Patch<String>,
    #[serde(default)]
    pub meta_title: Patch<String>,
    #[serde(default)]
    pub meta_description: Patch<String>,
    #[serde(default)]
    pub meta_keywords: Patch<String>,
    #[serde(default)]
    pub og_image: Patch<String>,
    #[serde(default)]
    pub canonical_url: Patch<String>,
}

/// Returns the updated entry and the previous image when an upload replaced it.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    patch: SeoPatch,
    uploaded_image: Option<String>,
) -> Result<Option<(SeoEntry, Option<String>)>, AppError> {
    let mut tx = pool.begin().await?;
    let Some(current) = sqlx::query_as::<_, SeoEntry>("SELECT * FROM seo WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
    else {
        return Ok(None);
    };
    let page_path = patch
        .page_path
        .map(|p| normalize_path(&p))
        .apply_required(current.page_path, "pagePath")?;
    let (og_image, replaced) = match uploaded_image {
        Some(path) => (Some(path), current.og_image),
        None => (patch.og_image.apply(current.og_image), None),
    };

    let entry = sqlx::query_as::<_, SeoEntry>(
        r#"
        UPDATE seo
        SET page_path = $2, meta_title = $3, meta_description = $4, meta_keywords = $5,
            og_image = $6, canonical_url = $7, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&page_path)
    .bind(patch.meta_title.apply(current.meta_title))
    .bind(patch.meta_description.apply(current.meta_description))
    .bind(patch.meta_keywords.apply(current.meta_keywords))
    .bind(&og_image)
    .bind(patch.canonical_url.apply(current.canonical_url))
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(Some((entry, replaced)))
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<Option<SeoEntry>, AppError> {
    Ok(sqlx::query_as::<_, SeoEntry>("DELETE FROM seo WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(pool)
        .await?)
}
