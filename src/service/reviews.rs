//! Review moderation. Public submissions start pending; the public only ever sees approved
//! reviews; admins see and change everything.

use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::validation::{ensure_email, required_text};
use crate::error::AppError;
use crate::model::review::valid_rating;
use crate::model::{Review, ReviewStatus};
use crate::pagination::Pagination;
use crate::patch::Patch;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub store_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

fn ensure_rating(rating: Option<i32>) -> Result<(), AppError> {
    match rating {
        Some(r) if !valid_rating(r) => Err(AppError::Validation("rating must be between 1 and 5".into())),
        _ => Ok(()),
    }
}

/// Checks a submission and returns its normalized `(name, email)`.
pub fn validate_new(input: &NewReview) -> Result<(String, String), AppError> {
    let name = required_text(&input.name, "name")?;
    let email = ensure_email(&input.email, "email")?;
    ensure_rating(input.rating)?;
    if input.store_id.is_none() && input.product_id.is_none() {
        return Err(AppError::Validation("storeId or productId is required".into()));
    }
    Ok((name, email))
}

/// Stores a public submission. The status is always `pending`.
pub async fn submit(pool: &PgPool, input: NewReview) -> Result<Review, AppError> {
    let (name, email) = validate_new(&input)?;
    let review = sqlx::query_as::<_, Review>(
        r#"
        INSERT INTO reviews (store_id, product_id, name, email, rating, comment, status)
        VALUES ($1, $2, $3, $4, $5, $6, 'pending')
        RETURNING *
        "#,
    )
    .bind(input.store_id)
    .bind(input.product_id)
    .bind(&name)
    .bind(&email)
    .bind(input.rating)
    .bind(&input.comment)
    .fetch_one(pool)
    .await?;
    tracing::info!(review_id = %review.id, "review submitted");
    Ok(review)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewFilter {
    pub store_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    /// Ignored on public listings.
    pub status: Option<String>,
}

/// Which rows a caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    ApprovedOnly,
    All,
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ReviewFilter, visibility: Visibility) {
    qb.push(" WHERE TRUE");
    match visibility {
        Visibility::ApprovedOnly => {
            qb.push(" AND status = 'approved'");
        }
        Visibility::All => {
            if let Some(status) = filter.status.as_deref().filter(|s| !s.is_empty()) {
                qb.push(" AND status = ").push_bind(status.to_string());
            }
        }
    }
    if let Some(store_id) = filter.store_id {
        qb.push(" AND store_id = ").push_bind(store_id);
    }
    if let Some(product_id) = filter.product_id {
        qb.push(" AND product_id = ").push_bind(product_id);
    }
}

pub async fn list(
    pool: &PgPool,
    filter: &ReviewFilter,
    visibility: Visibility,
    page: &Pagination,
) -> Result<(Vec<Review>, i64), AppError> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM reviews");
    push_filters(&mut count, filter, visibility);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM reviews");
    push_filters(&mut qb, filter, visibility);
    qb.push(" ORDER BY created_at DESC, id LIMIT ")
        .push_bind(page.limit_i64())
        .push(" OFFSET ")
        .push_bind(page.offset());
    let rows = qb.build_query_as::<Review>().fetch_all(pool).await?;
    Ok((rows, total))
}

/// A non-approved review is reported as missing to the public.
pub async fn find(pool: &PgPool, id: Uuid, visibility: Visibility) -> Result<Option<Review>, AppError> {
    let review = sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(review.filter(|r| visibility == Visibility::All || r.status == ReviewStatus::Approved))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPatch {
    #[serde(default)]
    pub name: Patch<String>,
    #[serde(default)]
    pub email: Patch<String>,
    #[serde(default)]
    pub rating: Patch<i32>,
    #[serde(default)]
    pub comment: Patch<String>,
    #[serde(default)]
    pub status: Patch<ReviewStatus>,
}

/// Admin edit. Any status may be set from any status.
pub async fn update(pool: &PgPool, id: Uuid, patch: ReviewPatch) -> Result<Option<Review>, AppError> {
    let mut tx = pool.begin().await?;
    let Some(current) = sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
    else {
        return Ok(None);
    };
    let name = patch.name.trimmed().apply_required(current.name, "name")?;
    let email = match patch.email {
        Patch::Value(e) => ensure_email(&e, "email")?,
        other => other.apply_required(current.email, "email")?,
    };
    let rating = patch.rating.apply(current.rating);
    ensure_rating(rating)?;
    let status = patch.status.apply_required(current.status, "status")?;

    let review = sqlx::query_as::<_, Review>(
        r#"
        UPDATE reviews SET name = $2, email = $3, rating = $4, comment = $5, status = $6, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&name)
    .bind(&email)
    .bind(rating)
    .bind(patch.comment.apply(current.comment))
    .bind(status.as_str())
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    if status != current.status {
        tracing::info!(review_id = %id, from = current.status.as_str(), to = status.as_str(), "review moderated");
    }
    Ok(Some(review))
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, AppError> {
    let affected = sqlx::query("DELETE FROM reviews WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(affected == 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> NewReview {
        NewReview {
            store_id: Some(Uuid::nil()),
            product_id: None,
            name: " Ann ".into(),
            email: "Ann@Example.com".into(),
            rating: Some(5),
            comment: None,
        }
    }

    #[test]
    fn accepts_and_normalizes_valid_reviews() {
        assert_eq!(validate_new(&input()).unwrap(), ("Ann".to_string(), "ann@example.com".to_string()));
    }

    #[test]
    fn rejects_out_of_range_rating() {
        let mut r = input();
        r.rating = Some(6);
        assert!(validate_new(&r).is_err());
        r.rating = None;
        assert!(validate_new(&r).is_ok());
    }

    #[test]
    fn requires_a_target_and_a_valid_email() {
        let mut r = input();
        r.store_id = None;
        assert!(validate_new(&r).is_err());
        let mut r = input();
        r.email = "not-an-email".into();
        assert!(validate_new(&r).is_err());
    }
}
