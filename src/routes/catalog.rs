use crate::handlers::{collections, products};
use crate::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};

/// Products, variations, images and collections.
pub fn catalog_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/products", get(products::list).post(products::create))
        .route("/api/products/slug/:slug", get(products::read_by_slug))
        .route(
            "/api/products/:id",
            get(products::read).patch(products::update).delete(products::delete),
        )
        .route("/api/products/:id/variations", post(products::add_variations))
        .route("/api/variations/:id", delete(products::delete_variation))
        .route("/api/variations/:id/images", post(products::add_images))
        .route("/api/product-images/:id", delete(products::delete_image))
        .route("/api/variation-attributes", get(products::list_attributes))
        .route("/api/collections", get(collections::list).post(collections::create))
        .route(
            "/api/collections/:id",
            get(collections::read).patch(collections::update).delete(collections::delete),
        )
        .with_state(state)
}
