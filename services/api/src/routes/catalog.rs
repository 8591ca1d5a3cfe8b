//! Public service catalog routes

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;

use crate::{
    error::ApiError,
    middleware::AuthUser,
    models::Role,
    state::AppState,
};

/// Query parameters for the service listing
#[derive(Debug, Deserialize)]
pub struct ListServicesQuery {
    /// Include deactivated services; honored for admins only
    #[serde(default)]
    pub all: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/services", get(list_services))
        .route("/services/:slug", get(get_service))
}

/// List active services. Admins may pass `?all=true` to include
/// deactivated ones.
pub async fn list_services(
    State(state): State<AppState>,
    user: Option<Extension<AuthUser>>,
    Query(query): Query<ListServicesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let is_admin = user.map(|u| u.role == Role::Admin).unwrap_or(false);
    let include_inactive = query.all && is_admin;

    let services = state
        .service_repository
        .list(include_inactive)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list services: {}", e);
            ApiError::InternalServerError
        })?;

    Ok(Json(services))
}

/// Get a service by slug
pub async fn get_service(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let service = state
        .service_repository
        .find_by_slug(&slug)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get service: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or(ApiError::NotFound("Service"))?;

    Ok(Json(service))
}
