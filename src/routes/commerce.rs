use crate::handlers::{orders, reviews, stores};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

/// Stores, orders and reviews.
pub fn commerce_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/stores", get(stores::list).post(stores::create))
        .route("/api/stores/my", get(stores::mine))
        .route(
            "/api/stores/:id",
            get(stores::read).patch(stores::update).delete(stores::delete),
        )
        .route("/api/orders", get(orders::list).post(orders::create))
        .route("/api/orders/my", get(orders::mine))
        .route(
            "/api/orders/:id",
            get(orders::read).patch(orders::update).delete(orders::delete),
        )
        .route("/api/orders/:id/approve", post(orders::approve))
        .route("/api/orders/:id/reject", post(orders::reject))
        .route("/api/reviews", get(reviews::list_public).post(reviews::submit))
        .route("/api/reviews/:id", get(reviews::read_public))
        .route("/api/admin/reviews", get(reviews::list_admin))
        .route(
            "/api/admin/reviews/:id",
            get(reviews::read_admin).patch(reviews::update).delete(reviews::delete),
        )
        .with_state(state)
}
