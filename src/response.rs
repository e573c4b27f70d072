//! Standard response envelope helpers.

use crate::pagination::Pagination;
use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

#[derive(Serialize)]
pub struct SuccessMany<T> {
    pub data: Vec<T>,
    pub meta: MetaCount,
}

#[derive(Serialize)]
pub struct MetaCount {
    pub count: u64,
}

#[derive(Serialize)]
pub struct SuccessPage<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

/// Pagination block of list responses.
#[derive(Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl PageMeta {
    pub fn new(total: i64, pagination: &Pagination) -> Self {
        let total = total.max(0);
        let limit = pagination.limit.max(1);
        let total_pages = ((total as u64 + limit as u64 - 1) / limit as u64) as u32;
        PageMeta {
            total,
            page: pagination.page,
            limit,
            total_pages,
        }
    }
}

pub fn success_one<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (
        StatusCode::CREATED,
        Json(SuccessOne {
            data,
            meta: None,
        }),
    )
}

pub fn success_one_ok<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (
        StatusCode::OK,
        Json(SuccessOne {
            data,
            meta: None,
        }),
    )
}

pub fn success_many<T: Serialize>(data: Vec<T>) -> (StatusCode, Json<SuccessMany<T>>) {
    let count = data.len() as u64;
    (
        StatusCode::OK,
        Json(SuccessMany {
            data,
            meta: MetaCount { count },
        }),
    )
}

pub fn success_page<T: Serialize>(data: Vec<T>, total: i64, pagination: &Pagination) -> (StatusCode, Json<SuccessPage<T>>) {
    (
        StatusCode::OK,
        Json(SuccessPage {
            data,
            meta: PageMeta::new(total, pagination),
        }),
    )
}

pub fn message(text: &str) -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(serde_json::json!({ "message": text })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        let p = Pagination { page: 2, limit: 10 };
        assert_eq!(
            PageMeta::new(21, &p),
            PageMeta {
                total: 21,
                page: 2,
                limit: 10,
                total_pages: 3
            }
        );
        assert_eq!(PageMeta::new(0, &p).total_pages, 0);
        assert_eq!(PageMeta::new(10, &p).total_pages, 1);
    }

    #[test]
    fn meta_serializes_camel_case() {
        let meta = PageMeta::new(5, &Pagination { page: 1, limit: 10 });
        let v = serde_json::to_value(meta).unwrap();
        assert_eq!(v["totalPages"], 1);
        assert_eq!(v["total"], 5);
    }
}
