//! Submission routes resolved by path segment. Merged last so the fixed `/api/...` routes win.

use crate::handlers::entity::{create, delete as delete_handler, list, read, update};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn entity_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/:path_segment", get(list).post(create))
        .route("/api/:path_segment/:id", get(read).patch(update).delete(delete_handler))
        .with_state(state)
}
