//! Product catalog lifecycle.
//!
//! A product owns its variations; a variation owns its images and its attribute map rows.
//! Attributes and values are shared across products and resolved with atomic upserts, so
//! two products declaring `Color = Red` point at the same rows. Create and delete each run in
//! one transaction; image files are never touched inside it. Delete returns the file paths
//! for the caller to remove after commit.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::like_pattern;
use super::validation::required_text;
use crate::error::AppError;
use crate::model::{
    max_amount, AttributePair, AttributeWithValues, Product, ProductDetail, ProductImage, ProductVariation, VariationDetail,
    VariationValue,
};
use crate::pagination::Pagination;
use crate::patch::Patch;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariationInput {
    #[serde(default)]
    pub sku: String,
    pub price: Option<Decimal>,
    pub usecase: Option<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeInput>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub collection_id: Option<Uuid>,
    /// Derived from the name when absent.
    pub slug: Option<String>,
    pub meta_title: Option<String>,
    pub meta_desc: Option<String>,
    #[serde(default)]
    pub variations: Vec<VariationInput>,
}

/// Lowercase ASCII letters and digits separated by single dashes.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.trim().chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Trimmed, validated copy of one variation.
#[derive(Debug, Clone)]
struct CleanVariation {
    sku: String,
    price: Option<Decimal>,
    usecase: Option<String>,
    attributes: Vec<(String, String)>,
}

fn clean_variations(inputs: Vec<VariationInput>) -> Result<Vec<CleanVariation>, AppError> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(inputs.len());
    for (i, v) in inputs.into_iter().enumerate() {
        let sku = required_text(&v.sku, &format!("variations[{}].sku", i))?;
        if !seen.insert(sku.clone()) {
            return Err(AppError::Validation(format!("duplicate sku {}", sku)));
        }
        if let Some(price) = v.price {
            if price.is_sign_negative() && !price.is_zero() {
                return Err(AppError::Validation(format!("variations[{}].price must not be negative", i)));
            }
            if price.round_dp(2) > max_amount() {
                return Err(AppError::Validation(format!(
                    "variations[{}].price must not exceed {}",
                    i,
                    max_amount()
                )));
            }
        }
        let mut attributes = Vec::with_capacity(v.attributes.len());
        for a in v.attributes {
            let name = required_text(&a.name, &format!("variations[{}].attributes.name", i))?;
            let value = required_text(&a.value, &format!("variations[{}].attributes.value", i))?;
            attributes.push((name, value));
        }
        out.push(CleanVariation {
            sku,
            price: v.price.map(|p| p.round_dp(2)),
            usecase: v.usecase,
            attributes,
        });
    }
    Ok(out)
}

/// Id of the value row for `name = value`, creating the attribute and value when missing.
async fn resolve_value_id(conn: &mut PgConnection, name: &str, value: &str) -> Result<Uuid, AppError> {
    let attribute_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO variation_attributes (name) VALUES ($1)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;
    let value_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO variation_values (attribute_id, value) VALUES ($1, $2)
        ON CONFLICT (attribute_id, value) DO UPDATE SET value = EXCLUDED.value
        RETURNING id
        "#,
    )
    .bind(attribute_id)
    .bind(value)
    .fetch_one(&mut *conn)
    .await?;
    Ok(value_id)
}

/// Inserts image rows for a variation. The first one is primary when `first_is_primary`.
async fn insert_images(
    conn: &mut PgConnection,
    variation_id: Uuid,
    paths: &[String],
    first_is_primary: bool,
) -> Result<Vec<ProductImage>, AppError> {
    let mut rows = Vec::with_capacity(paths.len());
    for (i, path) in paths.iter().enumerate() {
        let row = sqlx::query_as::<_, ProductImage>(
            "INSERT INTO product_images (variation_id, image, is_primary) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(variation_id)
        .bind(path)
        .bind(first_is_primary && i == 0)
        .fetch_one(&mut *conn)
        .await?;
        rows.push(row);
    }
    Ok(rows)
}

async fn insert_variation(
    conn: &mut PgConnection,
    product_id: Uuid,
    variation: &CleanVariation,
    images: &[String],
) -> Result<Uuid, AppError> {
    let variation_id: Uuid = sqlx::query_scalar(
        "INSERT INTO product_variations (product_id, sku, price, usecase) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(product_id)
    .bind(&variation.sku)
    .bind(variation.price)
    .bind(&variation.usecase)
    .fetch_one(&mut *conn)
    .await?;

    for (name, value) in &variation.attributes {
        let value_id = resolve_value_id(conn, name, value).await?;
        sqlx::query(
            "INSERT INTO variation_attribute_maps (variation_id, value_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(variation_id)
        .bind(value_id)
        .execute(&mut *conn)
        .await?;
    }
    insert_images(conn, variation_id, images, true).await?;
    Ok(variation_id)
}

/// Creates a product with its variations, attribute pairs and images in one transaction.
/// `images[i]` holds the stored paths for variation `i`.
pub async fn create_product(pool: &PgPool, input: NewProduct, images: &[Vec<String>]) -> Result<ProductDetail, AppError> {
    let name = required_text(&input.name, "name")?;
    let slug = match input.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.to_lowercase(),
        None => slugify(&name),
    };
    if slug.is_empty() {
        return Err(AppError::Validation("slug is required".into()));
    }
    let variations = clean_variations(input.variations)?;

    let mut tx = pool.begin().await?;
    let product = sqlx::query_as::<_, Product>(
        r#"
        INSERT INTO products (name, description, collection_id, slug, meta_title, meta_desc)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(&name)
    .bind(&input.description)
    .bind(input.collection_id)
    .bind(&slug)
    .bind(&input.meta_title)
    .bind(&input.meta_desc)
    .fetch_one(&mut *tx)
    .await?;

    for (i, v) in variations.iter().enumerate() {
        let paths = images.get(i).map(Vec::as_slice).unwrap_or(&[]);
        insert_variation(&mut tx, product.id, v, paths).await?;
    }
    tx.commit().await?;
    tracing::info!(product_id = %product.id, variations = variations.len(), "product created");

    let mut details = load_details(pool, vec![product]).await?;
    details
        .pop()
        .ok_or_else(|| AppError::Internal("created product vanished".into()))
}

/// Adds variations to an existing product. Returns the refreshed product.
pub async fn add_variations(
    pool: &PgPool,
    product_id: Uuid,
    inputs: Vec<VariationInput>,
    images: &[Vec<String>],
) -> Result<Option<ProductDetail>, AppError> {
    if inputs.is_empty() {
        return Err(AppError::Validation("variations must not be empty".into()));
    }
    let variations = clean_variations(inputs)?;
    let mut tx = pool.begin().await?;
    let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM products WHERE id = $1 FOR UPDATE")
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Ok(None);
    }
    for (i, v) in variations.iter().enumerate() {
        let paths = images.get(i).map(Vec::as_slice).unwrap_or(&[]);
        insert_variation(&mut tx, product_id, v, paths).await?;
    }
    sqlx::query("UPDATE products SET updated_at = NOW() WHERE id = $1")
        .bind(product_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    find(pool, product_id).await
}

/// Attaches nested variations, attribute pairs and images to each product, keeping order.
pub async fn load_details(pool: &PgPool, products: Vec<Product>) -> Result<Vec<ProductDetail>, AppError> {
    if products.is_empty() {
        return Ok(Vec::new());
    }
    let product_ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
    let variations = sqlx::query_as::<_, ProductVariation>(
        "SELECT * FROM product_variations WHERE product_id = ANY($1) ORDER BY created_at, id",
    )
    .bind(&product_ids)
    .fetch_all(pool)
    .await?;
    let variation_ids: Vec<Uuid> = variations.iter().map(|v| v.id).collect();

    let pairs = sqlx::query_as::<_, AttributePair>(
        r#"
        SELECT m.variation_id, a.id AS attribute_id, a.name, v.id AS value_id, v.value
        FROM variation_attribute_maps m
        JOIN variation_values v ON v.id = m.value_id
        JOIN variation_attributes a ON a.id = v.attribute_id
        WHERE m.variation_id = ANY($1)
        ORDER BY a.name, v.value
        "#,
    )
    .bind(&variation_ids)
    .fetch_all(pool)
    .await?;
    let images = sqlx::query_as::<_, ProductImage>(
        "SELECT * FROM product_images WHERE variation_id = ANY($1) ORDER BY is_primary DESC, created_at, id",
    )
    .bind(&variation_ids)
    .fetch_all(pool)
    .await?;

    let mut pairs_by_variation: HashMap<Uuid, Vec<AttributePair>> = HashMap::new();
    for p in pairs {
        pairs_by_variation.entry(p.variation_id).or_default().push(p);
    }
    let mut images_by_variation: HashMap<Uuid, Vec<ProductImage>> = HashMap::new();
    for img in images {
        images_by_variation.entry(img.variation_id).or_default().push(img);
    }
    let mut variations_by_product: HashMap<Uuid, Vec<VariationDetail>> = HashMap::new();
    for v in variations {
        let detail = VariationDetail {
            attributes: pairs_by_variation.remove(&v.id).unwrap_or_default(),
            images: images_by_variation.remove(&v.id).unwrap_or_default(),
            variation: v,
        };
        variations_by_product
            .entry(detail.variation.product_id)
            .or_default()
            .push(detail);
    }

    Ok(products
        .into_iter()
        .map(|product| ProductDetail {
            variations: variations_by_product.remove(&product.id).unwrap_or_default(),
            product,
        })
        .collect())
}

pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<ProductDetail>, AppError> {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    match product {
        Some(p) => Ok(load_details(pool, vec![p]).await?.pop()),
        None => Ok(None),
    }
}

pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<ProductDetail>, AppError> {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE slug = $1")
        .bind(slug.trim().to_lowercase())
        .fetch_optional(pool)
        .await?;
    match product {
        Some(p) => Ok(load_details(pool, vec![p]).await?.pop()),
        None => Ok(None),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    pub collection_id: Option<Uuid>,
    pub search: Option<String>,
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    qb.push(" WHERE TRUE");
    if let Some(collection_id) = filter.collection_id {
        qb.push(" AND collection_id = ").push_bind(collection_id);
    }
    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = like_pattern(term);
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR slug ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

pub async fn list(pool: &PgPool, filter: &ProductFilter, page: &Pagination) -> Result<(Vec<ProductDetail>, i64), AppError> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
    push_filters(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM products");
    push_filters(&mut qb, filter);
    qb.push(" ORDER BY created_at DESC, id LIMIT ")
        .push_bind(page.limit_i64())
        .push(" OFFSET ")
        .push_bind(page.offset());
    let products = qb.build_query_as::<Product>().fetch_all(pool).await?;
    Ok((load_details(pool, products).await?, total))
}

/// Scalar product fields; variations are managed through their own routes.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    #[serde(default)]
    pub name: Patch<String>,
    #[serde(default)]
    pub description: Patch<String>,
    #[serde(default)]
    pub collection_id: Patch<Uuid>,
    #[serde(default)]
    pub slug: Patch<String>,
    #[serde(default)]
    pub meta_title: Patch<String>,
    #[serde(default)]
    pub meta_desc: Patch<String>,
}

pub async fn update(pool: &PgPool, id: Uuid, patch: ProductPatch) -> Result<Option<ProductDetail>, AppError> {
    let mut tx = pool.begin().await?;
    let Some(current) = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
    else {
        return Ok(None);
    };
    let name = patch.name.trimmed().apply_required(current.name, "name")?;
    let slug = patch
        .slug
        .trimmed()
        .map(|s| s.to_lowercase())
        .apply_required(current.slug, "slug")?;

    sqlx::query(
        r#"
        UPDATE products
        SET name = $2, description = $3, collection_id = $4, slug = $5, meta_title = $6, meta_desc = $7,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(&name)
    .bind(patch.description.apply(current.description))
    .bind(patch.collection_id.apply(current.collection_id))
    .bind(&slug)
    .bind(patch.meta_title.apply(current.meta_title))
    .bind(patch.meta_desc.apply(current.meta_desc))
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;
    find(pool, id).await
}

/// Deletes images, attribute maps and variations of the given variations, then returns the
/// image paths they held.
async fn delete_variation_rows(conn: &mut PgConnection, variation_ids: &[Uuid]) -> Result<Vec<String>, AppError> {
    let paths: Vec<String> = sqlx::query_scalar("DELETE FROM product_images WHERE variation_id = ANY($1) RETURNING image")
        .bind(variation_ids)
        .fetch_all(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM variation_attribute_maps WHERE variation_id = ANY($1)")
        .bind(variation_ids)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM product_variations WHERE id = ANY($1)")
        .bind(variation_ids)
        .execute(&mut *conn)
        .await?;
    Ok(paths)
}

/// Removes a product with its images, attribute maps and variations in one transaction.
/// Returns the image paths to delete from disk, or None when the product does not exist.
pub async fn delete_product(pool: &PgPool, id: Uuid) -> Result<Option<Vec<String>>, AppError> {
    let mut tx = pool.begin().await?;
    let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM products WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Ok(None);
    }
    let variation_ids: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM product_variations WHERE product_id = $1")
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;
    let paths = delete_variation_rows(&mut tx, &variation_ids).await?;
    sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    tracing::info!(product_id = %id, variations = variation_ids.len(), images = paths.len(), "product deleted");
    Ok(Some(paths))
}

/// Same cascade as product delete, for a single variation.
pub async fn delete_variation(pool: &PgPool, variation_id: Uuid) -> Result<Option<Vec<String>>, AppError> {
    let mut tx = pool.begin().await?;
    let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM product_variations WHERE id = $1 FOR UPDATE")
        .bind(variation_id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Ok(None);
    }
    let paths = delete_variation_rows(&mut tx, &[variation_id]).await?;
    tx.commit().await?;
    Ok(Some(paths))
}

/// Adds images to a variation. The first new image becomes primary when the variation has none.
pub async fn add_images(pool: &PgPool, variation_id: Uuid, paths: &[String]) -> Result<Option<Vec<ProductImage>>, AppError> {
    let mut tx = pool.begin().await?;
    let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM product_variations WHERE id = $1 FOR UPDATE")
        .bind(variation_id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Ok(None);
    }
    let has_primary: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM product_images WHERE variation_id = $1 AND is_primary)",
    )
    .bind(variation_id)
    .fetch_one(&mut *tx)
    .await?;
    let rows = insert_images(&mut tx, variation_id, paths, !has_primary).await?;
    tx.commit().await?;
    Ok(Some(rows))
}

pub async fn delete_image(pool: &PgPool, image_id: Uuid) -> Result<Option<ProductImage>, AppError> {
    Ok(sqlx::query_as::<_, ProductImage>("DELETE FROM product_images WHERE id = $1 RETURNING *")
        .bind(image_id)
        .fetch_optional(pool)
        .await?)
}

/// Every attribute with its known values, by name.
pub async fn list_attributes(pool: &PgPool) -> Result<Vec<AttributeWithValues>, AppError> {
    let attributes: Vec<(Uuid, String)> = sqlx::query_as("SELECT id, name FROM variation_attributes ORDER BY name")
        .fetch_all(pool)
        .await?;
    let values = sqlx::query_as::<_, VariationValue>("SELECT * FROM variation_values ORDER BY value")
        .fetch_all(pool)
        .await?;
    let mut by_attribute: HashMap<Uuid, Vec<VariationValue>> = HashMap::new();
    for v in values {
        by_attribute.entry(v.attribute_id).or_default().push(v);
    }
    Ok(attributes
        .into_iter()
        .map(|(id, name)| AttributeWithValues {
            values: by_attribute.remove(&id).unwrap_or_default(),
            id,
            name,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn variation(sku: &str, attrs: &[(&str, &str)]) -> VariationInput {
        VariationInput {
            sku: sku.into(),
            price: Some(Decimal::from_str("10.005").unwrap()),
            usecase: None,
            attributes: attrs
                .iter()
                .map(|(n, v)| AttributeInput {
                    name: (*n).into(),
                    value: (*v).into(),
                })
                .collect(),
        }
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Red Cotton T-Shirt! "), "red-cotton-t-shirt");
        assert_eq!(slugify("Ünïcode & Co"), "n-code-co");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn variations_are_trimmed_and_rounded() {
        let clean = clean_variations(vec![variation(" SKU-1 ", &[(" Color ", " Red ")])]).unwrap();
        assert_eq!(clean[0].sku, "SKU-1");
        assert_eq!(clean[0].attributes, vec![("Color".to_string(), "Red".to_string())]);
        assert_eq!(clean[0].price.unwrap().to_string(), "10.00");
    }

    #[test]
    fn rejects_blank_and_duplicate_skus() {
        assert!(clean_variations(vec![variation("  ", &[])]).is_err());
        assert!(clean_variations(vec![variation("A", &[]), variation("A", &[])]).is_err());
    }

    #[test]
    fn rejects_negative_prices_and_blank_attribute_values() {
        let mut v = variation("A", &[]);
        v.price = Some(Decimal::from_str("-1").unwrap());
        assert!(clean_variations(vec![v]).is_err());
        assert!(clean_variations(vec![variation("B", &[("Color", " ")])]).is_err());
    }

    #[test]
    fn prices_must_fit_the_amount_column() {
        let mut v = variation("A", &[]);
        v.price = Some(Decimal::from_str("100000000000").unwrap());
        assert!(matches!(clean_variations(vec![v]), Err(AppError::Validation(_))));
        let mut v = variation("B", &[]);
        v.price = Some(Decimal::from_str("9999999999.99").unwrap());
        assert!(clean_variations(vec![v]).is_ok());
    }

    #[test]
    fn product_payload_uses_camel_case() {
        let input: NewProduct = serde_json::from_value(serde_json::json!({
            "name": "Shirt",
            "collectionId": "00000000-0000-0000-0000-000000000001",
            "metaTitle": "Shirt",
            "variations": [{"sku": "S1", "price": "50.00", "attributes": [{"name": "Color", "value": "Red"}]}]
        }))
        .unwrap();
        assert!(input.collection_id.is_some());
        assert_eq!(input.variations[0].price, Some(Decimal::from_str("50.00").unwrap()));
    }
}
