//! Booking lifecycle routes
//!
//! Creation recomputes the total cost server-side; cancel and complete are
//! owner-only and go through the strict status transition, enforced again
//! at the database with a compare-and-swap so a racing webhook cannot be
//! overwritten.

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::{AuthUser, Policy, authorize},
    models::{BookingCreateRequest, BookingStatus, booking::calculate_total_cost},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/bookings", post(create_booking))
        .route("/bookings", get(list_bookings))
        .route("/bookings/:id", get(get_booking))
        .route("/bookings/:id/cancel", post(cancel_booking))
        .route("/bookings/:id/complete", post(complete_booking))
}

/// Create a booking with status PENDING
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<BookingCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&user, Policy::Authenticated)?;
    payload.validate().map_err(ApiError::Validation)?;

    let service = state
        .service_repository
        .find_by_id(payload.service_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to look up service: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or(ApiError::NotFound("Service"))?;

    // The client may have sent a total; it is never trusted.
    let total_cost = calculate_total_cost(payload.duration_value, service.base_rate);
    if let Some(client_total) = payload.total_cost {
        if client_total != total_cost {
            tracing::warn!(
                "Discarding client-sent total {} in favor of computed {}",
                client_total,
                total_cost
            );
        }
    }

    let booking = state
        .booking_repository
        .create(user.id, &payload, total_cost)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create booking: {}", e);
            ApiError::InternalServerError
        })?;

    state.invalidate_dashboard_cache(user.id).await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "booking_id": booking.id,
        })),
    ))
}

/// The caller's bookings with service and payment joined
pub async fn list_bookings(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let bookings = state
        .booking_repository
        .list_for_user(user.id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list bookings: {}", e);
            ApiError::InternalServerError
        })?;

    Ok(Json(bookings))
}

/// Get a booking by ID; owner or admin
pub async fn get_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let booking = state
        .booking_repository
        .find_by_id(id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get booking: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or(ApiError::NotFound("Booking"))?;

    if authorize(&user, Policy::Owner(booking.user_id)).is_err() {
        authorize(&user, Policy::AdminOnly)?;
    }

    Ok(Json(booking))
}

/// Cancel a booking; owner only, allowed from PENDING or CONFIRMED
pub async fn cancel_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let booking = state
        .booking_repository
        .find_by_id(id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get booking: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or(ApiError::NotFound("Booking"))?;

    authorize(&user, Policy::Owner(booking.user_id))?;

    if !booking.status.can_transition_to(BookingStatus::Cancelled) {
        return Err(ApiError::Conflict(format!(
            "A {} booking cannot be cancelled",
            booking.status.as_str().to_lowercase()
        )));
    }

    let updated = state
        .booking_repository
        .update_status_guarded(
            id,
            &[BookingStatus::Pending, BookingStatus::Confirmed],
            BookingStatus::Cancelled,
        )
        .await
        .map_err(|e| {
            tracing::error!("Failed to cancel booking: {}", e);
            ApiError::InternalServerError
        })?;

    if !updated {
        return Err(ApiError::Conflict(
            "Booking can no longer be cancelled".to_string(),
        ));
    }

    state.invalidate_dashboard_cache(user.id).await;

    Ok(Json(json!({"success": true})))
}

/// Mark a booking completed; owner only, allowed from CONFIRMED only
pub async fn complete_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let booking = state
        .booking_repository
        .find_by_id(id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get booking: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or(ApiError::NotFound("Booking"))?;

    authorize(&user, Policy::Owner(booking.user_id))?;

    if booking.status != BookingStatus::Confirmed {
        return Err(ApiError::Conflict(
            "Only confirmed bookings can be marked as completed".to_string(),
        ));
    }

    let updated = state
        .booking_repository
        .update_status_guarded(id, &[BookingStatus::Confirmed], BookingStatus::Completed)
        .await
        .map_err(|e| {
            tracing::error!("Failed to complete booking: {}", e);
            ApiError::InternalServerError
        })?;

    if !updated {
        return Err(ApiError::Conflict(
            "Only confirmed bookings can be marked as completed".to_string(),
        ));
    }

    state.invalidate_dashboard_cache(user.id).await;

    Ok(Json(json!({"success": true})))
}
