//! Shared application state handed to every route.

use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::{GoogleTokenVerifier, IdentityVerifier, JwtService};
use crate::config::{entities::submission_entities, resolve, AppConfig, ResolvedModel};
use crate::error::ConfigError;
use crate::mail::{LogMailer, Mailer};
use crate::upload::ImageStore;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    /// Descriptor-driven submission tables (contacts, help requests, ...).
    pub model: Arc<ResolvedModel>,
    pub jwt: JwtService,
    pub images: ImageStore,
    pub mailer: Arc<dyn Mailer>,
    pub verifier: Arc<dyn IdentityVerifier>,
}

impl AppState {
    /// State with the log mailer and Google token verification. The server picks its mailer
    /// from `config.mail` through [`crate::mail::mailer_for`].
    pub fn new(pool: PgPool, config: AppConfig) -> Result<Self, ConfigError> {
        let verifier = Arc::new(GoogleTokenVerifier::new(config.google_client_id.clone()));
        Self::with_collaborators(pool, config, Arc::new(LogMailer), verifier)
    }

    pub fn with_collaborators(
        pool: PgPool,
        config: AppConfig,
        mailer: Arc<dyn Mailer>,
        verifier: Arc<dyn IdentityVerifier>,
    ) -> Result<Self, ConfigError> {
        let model = resolve(&submission_entities())?;
        Ok(AppState {
            pool,
            jwt: JwtService::new(config.jwt.clone()),
            images: ImageStore::new(&config.upload),
            config: Arc::new(config),
            model: Arc::new(model),
            mailer,
            verifier,
        })
    }
}
