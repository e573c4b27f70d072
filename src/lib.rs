//! Storefront: multi-tenant store, catalog and order backend on PostgreSQL.

pub mod auth;
pub mod case;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod mail;
pub mod migration;
pub mod model;
pub mod pagination;
pub mod patch;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod upload;

pub use config::AppConfig;
pub use db::{ensure_database_exists, ensure_schema, seed_admin};
pub use error::{AppError, ConfigError};
pub use routes::app;
pub use state::AppState;
