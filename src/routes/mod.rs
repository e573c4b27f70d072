//! Route tables per area and the assembled application router.

mod auth;
mod catalog;
mod commerce;
mod common;
mod entity;
mod site;

pub use auth::auth_routes;
pub use catalog::catalog_routes;
pub use commerce::commerce_routes;
pub use common::common_routes;
pub use entity::entity_routes;
pub use site::site_routes;

use axum::{extract::DefaultBodyLimit, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    trace::TraceLayer,
};

use crate::state::AppState;

/// Every API route, `/uploads` file serving and the shared layers.
pub fn app(state: AppState) -> Router {
    let uploads = ServeDir::new(state.images.root());
    let body_limit = state.config.upload.max_body_bytes;
    Router::new()
        .merge(common_routes(state.clone()))
        .merge(auth_routes(state.clone()))
        .merge(catalog_routes(state.clone()))
        .merge(commerce_routes(state.clone()))
        .merge(site_routes(state.clone()))
        .merge(entity_routes(state))
        .nest_service("/uploads", uploads)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
