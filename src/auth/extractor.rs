//! Bearer-token extractors. The user row is reloaded on every request so role and status
//! changes take effect before the token expires.

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use uuid::Uuid;

use super::JwtService;
use crate::error::AppError;
use crate::model::{Role, User};
use crate::service::users;
use crate::state::AppState;

/// The authenticated, active caller.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.0.id
    }

    pub fn is_admin(&self) -> bool {
        self.0.role == Role::Admin
    }

    /// Admins pass; anyone else must be `owner_id`.
    pub fn ensure_owner_or_admin(&self, owner_id: Uuid) -> Result<(), AppError> {
        if self.is_admin() || self.0.id == owner_id {
            Ok(())
        } else {
            Err(AppError::Forbidden("not allowed to access this resource".into()))
        }
    }
}

/// An authenticated caller with the `admin` role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(AppError::unauthorized)?;
    JwtService::extract_from_header(header).ok_or_else(AppError::unauthorized)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state.jwt.validate_token(token)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::InvalidToken("subject is not a user id".into()))?;
        let user = users::find_by_id(&state.pool, user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("user no longer exists".into()))?;
        if !user.is_active() {
            return Err(AppError::Unauthorized("account is not active".into()));
        }
        Ok(AuthUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if user.role != Role::Admin {
            return Err(AppError::admin_only());
        }
        Ok(AdminUser(user))
    }
}
