//! Application state shared across handlers

use sqlx::PgPool;

use common::cache::RedisPool;

use crate::{
    config::ApiConfig,
    email::EmailClient,
    middleware::JwtVerifier,
    repositories::{
        BookingRepository, PaymentRepository, ReportRepository, ServiceRepository, UserRepository,
    },
    stripe::StripeClient,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub redis_pool: RedisPool,
    pub config: ApiConfig,
    pub jwt_verifier: JwtVerifier,
    pub service_repository: ServiceRepository,
    pub booking_repository: BookingRepository,
    pub payment_repository: PaymentRepository,
    pub user_repository: UserRepository,
    pub report_repository: ReportRepository,
    /// Absent when payments are disabled (development without Stripe keys)
    pub stripe_client: Option<StripeClient>,
    /// Absent when invoice email is disabled
    pub email_client: Option<EmailClient>,
}

impl AppState {
    /// Redis key of a user's cached dashboard summary
    pub fn dashboard_cache_key(user_id: uuid::Uuid) -> String {
        format!("dashboard:{}", user_id)
    }

    /// Drop the user's cached dashboard summary. Called after every booking
    /// mutation; failures are logged, never surfaced.
    pub async fn invalidate_dashboard_cache(&self, user_id: uuid::Uuid) {
        if let Err(e) = self
            .redis_pool
            .delete(&Self::dashboard_cache_key(user_id))
            .await
        {
            tracing::warn!("Failed to invalidate dashboard cache: {}", e);
        }
    }
}
