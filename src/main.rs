//! nuCMS - A WordPress-inspired content management backend

use anyhow::Result;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nucms::{
    api::{self, AppState},
    config::Config,
    db,
    services::{generate_secret, TokenService},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nucms=info,frontend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting nuCMS...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    let secret = match config.auth.jwt_secret.clone() {
        Some(secret) => secret,
        None => {
            tracing::warn!("No JWT secret configured; tokens will not survive a restart");
            generate_secret()
        }
    };
    let tokens = TokenService::new(secret.as_bytes(), config.auth.token_ttl_seconds)?;

    // Build application state
    let state = AppState::new(pool, &config, tokens);

    // Create the default admin on first start
    if let Some(admin) = state
        .user_service
        .ensure_default_admin(&config.auth.default_admin)
        .await?
    {
        tracing::warn!(
            "Default admin '{}' created; change its password after the first login",
            admin.username
        );
    }

    // Build router
    let app = api::build_router(state, &config.server.cors_origin)?;

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
