use anyhow::Result;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

mod config;
mod email;
mod error;
mod middleware;
mod models;
mod repositories;
mod routes;
mod state;
mod stripe;

use common::cache::{RedisConfig, RedisPool};
use common::database::{DatabaseConfig, init_pool};

use crate::{
    config::ApiConfig,
    email::EmailClient,
    middleware::JwtVerifier,
    repositories::{
        BookingRepository, PaymentRepository, ReportRepository, ServiceRepository, UserRepository,
    },
    state::AppState,
    stripe::StripeClient,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting API service");

    let config = ApiConfig::from_env()?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    // Apply the schema and seed the catalog plus the bootstrap admin
    common::database::run_migrations(&pool).await?;
    common::database::seed_defaults(&pool).await?;

    // Initialize Redis connection pool
    let redis_config = RedisConfig::from_env()?;
    let redis_pool = RedisPool::new(&redis_config).await?;

    // Initialize repositories
    let service_repository = ServiceRepository::new(pool.clone());
    let booking_repository = BookingRepository::new(pool.clone());
    let payment_repository = PaymentRepository::new(pool.clone());
    let user_repository = UserRepository::new(pool.clone());
    let report_repository = ReportRepository::new(pool.clone());

    let jwt_verifier = JwtVerifier::new(&config.auth_secret);

    let stripe_client = config
        .stripe
        .as_ref()
        .map(|stripe| StripeClient::new(stripe.secret_key.clone()));

    let email_client = config
        .resend_api_key
        .as_ref()
        .map(|key| EmailClient::new(key.clone()));

    let port = config.port;

    let app_state = AppState {
        db_pool: pool,
        redis_pool,
        config,
        jwt_verifier,
        service_repository,
        booking_repository,
        payment_repository,
        user_repository,
        report_repository,
        stripe_client,
        email_client,
    };

    info!("API service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("API service listening on 0.0.0.0:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}
