//! Storefront HTTP server.
//!
//! Reads settings from the environment (a `.env` file is honoured), prepares the database and
//! serves the API. Run with `cargo run -p storefront-server`.

use std::sync::Arc;

use storefront::auth::GoogleTokenVerifier;
use storefront::mail::mailer_for;
use storefront::{app, ensure_database_exists, ensure_schema, seed_admin, AppConfig, AppState};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("storefront=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    ensure_database_exists(&config.database_url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    ensure_schema(&pool).await?;
    if let Some(seed) = &config.admin_seed {
        seed_admin(&pool, seed).await?;
    }
    tokio::fs::create_dir_all(&config.upload.dir).await?;

    let bind_addr = config.bind_addr.clone();
    let mailer = mailer_for(&config.mail).await;
    let verifier = Arc::new(GoogleTokenVerifier::new(config.google_client_id.clone()));
    tracing::info!(transport = ?config.mail.transport, "mail configured");
    let state = AppState::with_collaborators(pool, config, mailer, verifier)?;
    let router = app(state);

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("storefront listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}
