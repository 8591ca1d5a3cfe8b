//! API service routes

pub mod admin;
pub mod bookings;
pub mod catalog;
pub mod dashboard;
pub mod payments;
pub mod profile;

use axum::{
    Json, Router,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;

use crate::{
    middleware::{auth_middleware, optional_auth_middleware},
    state::AppState,
};

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .merge(catalog::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            optional_auth_middleware,
        ));

    let protected_routes = Router::new()
        .merge(bookings::router())
        .merge(payments::router())
        .merge(dashboard::router())
        .merge(profile::router())
        .merge(admin::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/webhooks/stripe", post(payments::stripe_webhook))
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "api-service"
    }))
}
