use anyhow::Result;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

mod jwt;
mod middleware;
mod models;
mod oauth;
mod rate_limiter;
mod repositories;
mod routes;
mod session;
mod validation;

use sqlx::PgPool;

use common::cache::RedisPool;

use crate::{jwt::JwtService, oauth::OAuthClient, session::SessionManager};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub redis_pool: RedisPool,
    pub jwt_service: JwtService,
    pub user_repository: crate::repositories::UserRepository,
    pub rate_limiter: crate::rate_limiter::RateLimiter,
    pub session_manager: SessionManager,
    pub oauth_client: Option<OAuthClient>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting authentication service");

    // Initialize database connection pool
    let db_config = common::database::DatabaseConfig::from_env()?;
    let pool = common::database::init_pool(&db_config).await?;

    // Check database connectivity
    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    // Apply the schema and seed the catalog plus the bootstrap admin
    common::database::run_migrations(&pool).await?;
    common::database::seed_defaults(&pool).await?;

    // Initialize JWT service
    let jwt_config = crate::jwt::JwtConfig::from_env()?;
    let jwt_service = crate::jwt::JwtService::new(jwt_config);

    // Initialize Redis connection pool
    let redis_config = common::cache::RedisConfig::from_env()?;
    let redis_pool = RedisPool::new(&redis_config).await?;

    let user_repository = crate::repositories::UserRepository::new(pool.clone());
    let rate_limiter =
        crate::rate_limiter::RateLimiter::new(crate::rate_limiter::RateLimiterConfig::default());
    let session_manager = SessionManager::new(redis_pool.clone(), jwt_service.clone());

    let oauth_client = match crate::oauth::OAuthConfig::from_env() {
        Some(config) => Some(OAuthClient::new_google(config)?),
        None => {
            warn!("GOOGLE_CLIENT_ID/GOOGLE_CLIENT_SECRET not set, Google sign-in disabled");
            None
        }
    };

    let app_state = AppState {
        db_pool: pool,
        redis_pool,
        jwt_service,
        user_repository,
        rate_limiter,
        session_manager,
        oauth_client,
    };

    info!("Authentication service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let port: u16 = std::env::var("AUTH_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(3000);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Authentication service listening on 0.0.0.0:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}
