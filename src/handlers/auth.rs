//! Registration, login, Google sign-in, password reset and the caller's own profile.

use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::{generate_reset_token, hash_password, verify_password, AuthUser};
use crate::error::AppError;
use crate::extractors::Json;
use crate::mail::password_reset_email;
use crate::model::{Role, User};
use crate::response::{message, success_one, success_one_ok};
use crate::service::users::{self, NewUser, ProfilePatch};
use crate::service::validation::{ensure_email, ensure_password, required_text};
use crate::state::AppState;
use crate::upload::{read_multipart, UploadField};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: User,
}

fn issue(state: &AppState, user: User) -> Result<AuthResponse, AppError> {
    let token = state
        .jwt
        .generate_token(&user.id.to_string(), &user.email, user.role.as_str())?;
    Ok(AuthResponse {
        token,
        token_type: "Bearer",
        expires_in: state.jwt.expires_in_seconds(),
        user,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub phone: Option<String>,
    /// `store_owner` (default) or `customer`.
    pub role: Option<Role>,
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = required_text(&body.name, "name")?;
    let email = ensure_email(&body.email, "email")?;
    ensure_password(&body.password)?;
    let role = match body.role.unwrap_or(Role::StoreOwner) {
        Role::Admin => return Err(AppError::Forbidden("cannot self-register as admin".into())),
        r => r,
    };
    if users::find_by_email(&state.pool, &email).await?.is_some() {
        return Err(AppError::Conflict("email is already registered".into()));
    }
    let user = users::create(
        &state.pool,
        NewUser {
            name,
            email,
            password_hash: Some(hash_password(body.password).await?),
            phone: body.phone.filter(|p| !p.trim().is_empty()),
            role,
            google_id: None,
            profile_image: None,
        },
    )
    .await?;
    Ok(success_one(issue(&state, user)?))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// POST /api/auth/login
pub async fn login(State(state): State<AppState>, Json(body): Json<LoginRequest>) -> Result<impl IntoResponse, AppError> {
    let invalid = || AppError::Unauthorized("invalid email or password".into());
    let email = body.email.trim().to_lowercase();
    let user = users::find_by_email(&state.pool, &email).await?.ok_or_else(invalid)?;
    let hash = user.password_hash.clone().ok_or_else(invalid)?;
    if !verify_password(body.password, hash).await? {
        return Err(invalid());
    }
    if !user.is_active() {
        return Err(AppError::Unauthorized("account is not active".into()));
    }
    tracing::info!(user_id = %user.id, "login");
    Ok(success_one_ok(issue(&state, user)?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleRequest {
    #[serde(default)]
    pub id_token: String,
}

/// POST /api/auth/google: find-or-create by verified email, linking the Google account.
pub async fn google(State(state): State<AppState>, Json(body): Json<GoogleRequest>) -> Result<impl IntoResponse, AppError> {
    let id_token = required_text(&body.id_token, "idToken")?;
    let identity = state.verifier.verify(&id_token).await?;

    let user = match users::find_by_google_id(&state.pool, &identity.subject).await? {
        Some(u) => u,
        None => match users::find_by_email(&state.pool, &identity.email).await? {
            Some(existing) => {
                users::link_google(&state.pool, existing.id, &identity.subject, identity.picture.as_deref()).await?
            }
            None => {
                let name = identity
                    .name
                    .clone()
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| identity.email.split('@').next().unwrap_or_default().to_string());
                users::create(
                    &state.pool,
                    NewUser {
                        name,
                        email: identity.email.clone(),
                        password_hash: None,
                        phone: None,
                        role: Role::StoreOwner,
                        google_id: Some(identity.subject.clone()),
                        profile_image: identity.picture.clone(),
                    },
                )
                .await?
            }
        },
    };
    if !user.is_active() {
        return Err(AppError::Unauthorized("account is not active".into()));
    }
    Ok(success_one_ok(issue(&state, user)?))
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

const FORGOT_PASSWORD_REPLY: &str = "If the email is registered, a reset link has been sent";

/// POST /api/auth/forgot-password. Answers the same way whether or not the email exists.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = body.email.trim().to_lowercase();
    let Some(user) = users::find_by_email(&state.pool, &email).await?.filter(User::is_active) else {
        tracing::debug!("password reset requested for unknown or inactive account");
        return Ok(message(FORGOT_PASSWORD_REPLY));
    };
    let token = generate_reset_token();
    let ttl = state.config.reset_token_ttl_minutes;
    users::store_reset_token(&state.pool, user.id, &token, Utc::now() + Duration::minutes(ttl)).await?;
    let mail = password_reset_email(&user.email, &state.config.frontend_url, &token, ttl);
    if let Err(e) = state.mailer.send(mail).await {
        tracing::warn!(user_id = %user.id, error = %e, "failed to send reset email");
    }
    Ok(message(FORGOT_PASSWORD_REPLY))
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub password: String,
}

/// POST /api/auth/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let token = required_text(&body.token, "token")?;
    ensure_password(&body.password)?;
    let hash = hash_password(body.password).await?;
    let user_id = users::consume_reset_token(&state.pool, &token, &hash)
        .await?
        .ok_or_else(|| AppError::BadRequest("invalid or expired reset token".into()))?;
    tracing::info!(user_id = %user_id, "password reset");
    Ok(message("Password has been reset"))
}

/// GET /api/auth/me
pub async fn me(AuthUser(user): AuthUser) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(user))
}

/// PATCH /api/auth/me (multipart: `data` + `profileImage`)
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_multipart(&state.images, multipart, &[UploadField::ProfileImage]).await?;
    let image = form.files.first(UploadField::ProfileImage);
    let result = match form.parse::<ProfilePatch>() {
        Ok(patch) => users::update_profile(&state.pool, user.id, patch, image).await,
        Err(e) => Err(e),
    };
    let (updated, replaced) = form.files.settle(result).await?;
    if let Some(old) = replaced {
        state.images.remove_quietly(&old).await;
    }
    Ok(success_one_ok(updated))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    /// Required when the account already has a password.
    pub current_password: Option<String>,
    #[serde(default)]
    pub new_password: String,
}

/// POST /api/auth/change-password
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    ensure_password(&body.new_password)?;
    if let Some(hash) = user.password_hash.clone() {
        let current = body.current_password.unwrap_or_default();
        if !verify_password(current, hash).await? {
            return Err(AppError::Unauthorized("current password is incorrect".into()));
        }
    }
    let hash = hash_password(body.new_password).await?;
    users::set_password(&state.pool, user.id, &hash).await?;
    Ok(message("Password updated"))
}
