//! HTTP handlers: extract, validate, call the service, wrap the result in the envelope.

pub mod auth;
pub mod collections;
pub mod entity;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod seo;
pub mod sliders;
pub mod stores;
pub mod users;

use crate::error::AppError;
use uuid::Uuid;

/// Path ids are parsed here so a malformed id gets the JSON error body.
pub(crate) fn parse_uuid(raw: &str, what: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::BadRequest(format!("invalid {} id", what)))
}
