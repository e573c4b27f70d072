use crate::handlers::{auth, users};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

/// Sign-up, sign-in, password reset, the caller's profile and admin user management.
pub fn auth_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/google", post(auth::google))
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route("/api/auth/reset-password", post(auth::reset_password))
        .route("/api/auth/me", get(auth::me).patch(auth::update_me))
        .route("/api/auth/change-password", post(auth::change_password))
        .route("/api/users", get(users::list))
        .route("/api/users/:id", get(users::read).patch(users::update).delete(users::delete))
        .with_state(state)
}
