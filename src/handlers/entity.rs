//! Descriptor-driven submission endpoints: `/api/:segment` and `/api/:segment/:id`.
//!
//! Keys are camelCase on the wire and snake_case in the table. Operations listed as public on
//! the descriptor need no token; every other operation requires an admin.

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::{Map, Value};

use crate::auth::AdminUser;
use crate::case::{keys_to_camel_case, to_snake_case};
use crate::config::{PkType, ResolvedEntity};
use crate::error::AppError;
use crate::extractors::{Json, Query};
use crate::pagination::{PageParams, Pagination};
use crate::response::{message, success_one, success_one_ok, success_page};
use crate::service::{CrudService, RequestValidator};
use crate::state::AppState;

fn entity<'a>(state: &'a AppState, segment: &str) -> Result<&'a ResolvedEntity, AppError> {
    state
        .model
        .entity_by_path(segment)
        .ok_or_else(|| AppError::NotFound(segment.to_string()))
}

/// Checks that `op` is enabled and, unless public, that the caller is an admin.
fn authorize(entity: &ResolvedEntity, op: &str, admin: Result<AdminUser, AppError>) -> Result<(), AppError> {
    if !entity.allows(op) {
        return Err(AppError::BadRequest(format!("{} not allowed", op)));
    }
    if entity.is_public(op) {
        return Ok(());
    }
    admin.map(|_| ())
}

fn parse_id(id_str: &str, pk_type: &PkType) -> Result<Value, AppError> {
    Ok(match pk_type {
        PkType::Uuid => {
            let u = uuid::Uuid::parse_str(id_str.trim()).map_err(|_| AppError::BadRequest("invalid id".into()))?;
            Value::String(u.to_string())
        }
        PkType::BigInt | PkType::Int => {
            let n: i64 = id_str.trim().parse().map_err(|_| AppError::BadRequest("invalid id".into()))?;
            Value::Number(n.into())
        }
        PkType::Text => Value::String(id_str.to_string()),
    })
}

/// Object body with keys renamed to columns. Keys that are not columns are dropped.
fn body_to_columns(entity: &ResolvedEntity, value: Value) -> Result<Map<String, Value>, AppError> {
    match value {
        Value::Object(m) => Ok(m
            .into_iter()
            .map(|(k, v)| (to_snake_case(&k), v))
            .filter(|(k, _)| entity.has_column(k))
            .collect()),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

fn filter_value(entity: &ResolvedEntity, col: &str, s: &str) -> Value {
    let pg_type = entity
        .column(col)
        .and_then(|c| c.pg_type.as_deref())
        .unwrap_or("text");
    if pg_type.contains("int") || pg_type.contains("serial") {
        if let Ok(n) = s.parse::<i64>() {
            return Value::Number(n.into());
        }
    }
    if pg_type.starts_with("bool") {
        if s.eq_ignore_ascii_case("true") {
            return Value::Bool(true);
        }
        if s.eq_ignore_ascii_case("false") {
            return Value::Bool(false);
        }
    }
    Value::String(s.to_string())
}

/// GET /api/:segment
pub async fn list(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    admin: Result<AdminUser, AppError>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity(&state, &segment)?;
    authorize(entity, "read", admin)?;

    let page = Pagination::from(PageParams {
        page: params.get("page").cloned(),
        limit: params.get("limit").cloned(),
    });
    let mut filters: Vec<(String, Value)> = params
        .iter()
        .filter(|(k, _)| k.as_str() != "page" && k.as_str() != "limit")
        .map(|(k, v)| (to_snake_case(k), v))
        .filter(|(col, _)| entity.has_column(col))
        .map(|(col, v)| {
            let val = filter_value(entity, &col, v);
            (col, val)
        })
        .collect();
    filters.sort_by(|a, b| a.0.cmp(&b.0));

    let (rows, total) = CrudService::list(&state.pool, entity, &filters, &page).await?;
    let rows: Vec<Value> = rows.into_iter().map(keys_to_camel_case).collect();
    Ok(success_page(rows, total, &page))
}

/// POST /api/:segment. Descriptor overrides (the initial status) win over the body.
pub async fn create(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    admin: Result<AdminUser, AppError>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity(&state, &segment)?;
    authorize(entity, "create", admin)?;
    let mut body = body_to_columns(entity, body)?;
    for (col, v) in &entity.create_overrides {
        body.insert(col.clone(), v.clone());
    }
    RequestValidator::validate(&body, &entity.validation)?;
    let row = CrudService::create(&state.pool, entity, &body).await?;
    tracing::info!(entity = %entity.table_name, "submission received");
    Ok(success_one(keys_to_camel_case(row)))
}

pub async fn read(
    State(state): State<AppState>,
    Path((segment, id_str)): Path<(String, String)>,
    admin: Result<AdminUser, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity(&state, &segment)?;
    authorize(entity, "read", admin)?;
    let id = parse_id(&id_str, &entity.pk_type)?;
    let row = CrudService::read(&state.pool, entity, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(id_str))?;
    Ok(success_one_ok(keys_to_camel_case(row)))
}

pub async fn update(
    State(state): State<AppState>,
    Path((segment, id_str)): Path<(String, String)>,
    admin: Result<AdminUser, AppError>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity(&state, &segment)?;
    authorize(entity, "update", admin)?;
    let id = parse_id(&id_str, &entity.pk_type)?;
    let mut body = body_to_columns(entity, body)?;
    for pk in &entity.pk_columns {
        body.remove(pk);
    }
    RequestValidator::validate_partial(&body, &entity.validation)?;
    let row = CrudService::update(&state.pool, entity, &id, &body)
        .await?
        .ok_or_else(|| AppError::NotFound(id_str))?;
    Ok(success_one_ok(keys_to_camel_case(row)))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((segment, id_str)): Path<(String, String)>,
    admin: Result<AdminUser, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity(&state, &segment)?;
    authorize(entity, "delete", admin)?;
    let id = parse_id(&id_str, &entity.pk_type)?;
    CrudService::delete(&state.pool, entity, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(id_str))?;
    Ok(message("Deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{entities::submission_entities, resolve};
    use serde_json::json;

    fn contacts() -> ResolvedEntity {
        resolve(&submission_entities())
            .unwrap()
            .entity_by_path("contacts")
            .unwrap()
            .clone()
    }

    #[test]
    fn public_create_needs_no_admin() {
        let e = contacts();
        assert!(authorize(&e, "create", Err(AppError::unauthorized())).is_ok());
        let err = authorize(&e, "read", Err(AppError::unauthorized())).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        assert!(matches!(
            authorize(&e, "bulk_create", Err(AppError::unauthorized())),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn body_keys_become_columns() {
        let e = contacts();
        let body = body_to_columns(&e, json!({"name": "A", "createdAt": "x", "bogus": 1, "email": "a@b.co"})).unwrap();
        assert_eq!(body.get("name"), Some(&json!("A")));
        assert!(body.contains_key("created_at"));
        assert!(!body.contains_key("bogus"));
        assert!(body_to_columns(&e, json!([1])).is_err());
    }

    #[test]
    fn parses_ids_by_key_type() {
        assert!(parse_id("not-a-uuid", &PkType::Uuid).is_err());
        assert_eq!(parse_id("42", &PkType::BigInt).unwrap(), json!(42));
    }
}
