use crate::handlers::{seo, sliders};
use crate::state::AppState;
use axum::{routing::get, Router};

/// Home page sliders and SEO metadata.
pub fn site_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/sliders", get(sliders::list_active).post(sliders::create))
        .route("/api/sliders/:id", get(sliders::read).patch(sliders::update).delete(sliders::delete))
        .route("/api/admin/sliders", get(sliders::list_all))
        .route("/api/seo", get(seo::list).post(seo::create))
        .route("/api/seo/resolve", get(seo::resolve))
        .route("/api/seo/:id", get(seo::read).patch(seo::update).delete(seo::delete))
        .with_state(state)
}
