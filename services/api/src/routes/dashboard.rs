//! Per-user dashboard summary, cached in Redis

use axum::{
    Extension, Json, Router,
    extract::State,
    response::IntoResponse,
    routing::get,
};
use tracing::warn;

use crate::{error::ApiError, middleware::AuthUser, state::AppState};

/// Cache lifetime of the dashboard summary
const DASHBOARD_CACHE_TTL_SECONDS: u64 = 300;

pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard", get(get_dashboard))
}

/// Booking counts by status and total spent for the caller. Served from
/// Redis when fresh; every booking mutation invalidates the key.
pub async fn get_dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let cache_key = AppState::dashboard_cache_key(user.id);

    match state.redis_pool.get(&cache_key).await {
        Ok(Some(cached)) => {
            if let Ok(summary) = serde_json::from_str::<serde_json::Value>(&cached) {
                return Ok(Json(summary));
            }
            // A corrupt entry falls through to recomputation.
        }
        Ok(None) => {}
        Err(e) => warn!("Dashboard cache read failed: {}", e),
    }

    let summary = state
        .booking_repository
        .dashboard_summary(user.id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to compute dashboard summary: {}", e);
            ApiError::InternalServerError
        })?;

    let serialized = serde_json::to_value(&summary).map_err(|e| {
        tracing::error!("Failed to serialize dashboard summary: {}", e);
        ApiError::InternalServerError
    })?;

    if let Err(e) = state
        .redis_pool
        .set(
            &cache_key,
            &serialized.to_string(),
            Some(DASHBOARD_CACHE_TTL_SECONDS),
        )
        .await
    {
        warn!("Dashboard cache write failed: {}", e);
    }

    Ok(Json(serialized))
}
