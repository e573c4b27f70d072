//! Product catalog: products, variations, attribute/value pairs and images.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub collection_id: Option<Uuid>,
    pub slug: String,
    pub meta_title: Option<String>,
    pub meta_desc: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariation {
    pub id: Uuid,
    pub product_id: Uuid,
    pub sku: String,
    pub price: Option<Decimal>,
    pub usecase: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VariationAttribute {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VariationValue {
    pub id: Uuid,
    pub attribute_id: Uuid,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VariationAttributeMap {
    pub id: Uuid,
    pub variation_id: Uuid,
    pub value_id: Uuid,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductImage {
    pub id: Uuid,
    pub variation_id: Uuid,
    pub image: String,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

/// One `attribute = value` pair of a variation, as returned by the join query.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AttributePair {
    #[serde(skip)]
    pub variation_id: Uuid,
    pub attribute_id: Uuid,
    pub name: String,
    pub value_id: Uuid,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariationDetail {
    #[serde(flatten)]
    pub variation: ProductVariation,
    pub attributes: Vec<AttributePair>,
    pub images: Vec<ProductImage>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub variations: Vec<VariationDetail>,
}

/// An attribute with all values recorded for it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeWithValues {
    pub id: Uuid,
    pub name: String,
    pub values: Vec<VariationValue>,
}
