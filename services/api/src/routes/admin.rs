//! Admin management routes
//!
//! Every handler checks `Policy::AdminOnly` first. Booking status has no
//! normal admin mutation: the only admin path is the explicitly named
//! force-override, which bypasses the lifecycle and logs who did it.

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::{AuthUser, Policy, authorize},
    models::{
        BookingStatus, Role, ServiceInput,
        user::UserUpdateInput,
    },
    state::AppState,
};

/// Default and maximum sizes of the per-service revenue report
const SERVICE_REPORT_DEFAULT_LIMIT: i64 = 10;
const SERVICE_REPORT_MAX_LIMIT: i64 = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/services", post(create_service))
        .route("/admin/services/:id", put(update_service))
        .route("/admin/services/:id", delete(delete_service))
        .route("/admin/services/:id/toggle", post(toggle_service))
        .route("/admin/users", get(list_users))
        .route("/admin/users/:id", get(get_user))
        .route("/admin/users/:id", put(update_user))
        .route("/admin/users/:id", delete(delete_user))
        .route("/admin/users/:id/role", put(update_user_role))
        .route("/admin/users/:id/password", post(reset_user_password))
        .route("/admin/bookings", get(list_bookings))
        .route("/admin/bookings/:id/force-status", post(force_booking_status))
        .route("/admin/reports/sales", get(sales_report))
        .route("/admin/reports/services", get(service_report))
}

// ---- Service management ----

/// Create a catalog service
pub async fn create_service(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<ServiceInput>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&user, Policy::AdminOnly)?;
    payload.validate().map_err(ApiError::Validation)?;

    let existing = state
        .service_repository
        .find_by_slug(&payload.slug)
        .await
        .map_err(|e| {
            error!("Failed to look up slug: {}", e);
            ApiError::InternalServerError
        })?;

    if existing.is_some() {
        return Err(ApiError::Conflict(
            "Service with this slug already exists".to_string(),
        ));
    }

    let service = state
        .service_repository
        .create(&payload)
        .await
        .map_err(|e| {
            error!("Failed to create service: {}", e);
            ApiError::InternalServerError
        })?;

    Ok((StatusCode::CREATED, Json(service)))
}

/// Update a catalog service
pub async fn update_service(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ServiceInput>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&user, Policy::AdminOnly)?;
    payload.validate().map_err(ApiError::Validation)?;

    let service = state
        .service_repository
        .find_by_id(id)
        .await
        .map_err(|e| {
            error!("Failed to get service: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or(ApiError::NotFound("Service"))?;

    if payload.slug != service.slug {
        let existing = state
            .service_repository
            .find_by_slug(&payload.slug)
            .await
            .map_err(|e| {
                error!("Failed to look up slug: {}", e);
                ApiError::InternalServerError
            })?;

        if existing.is_some() {
            return Err(ApiError::Conflict(
                "Service with this slug already exists".to_string(),
            ));
        }
    }

    let updated = state
        .service_repository
        .update(id, &payload)
        .await
        .map_err(|e| {
            error!("Failed to update service: {}", e);
            ApiError::InternalServerError
        })?;

    Ok(Json(updated))
}

/// Hard-delete a service with no bookings. Services with bookings must be
/// deactivated instead.
pub async fn delete_service(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&user, Policy::AdminOnly)?;

    state
        .service_repository
        .find_by_id(id)
        .await
        .map_err(|e| {
            error!("Failed to get service: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or(ApiError::NotFound("Service"))?;

    let bookings = state.service_repository.booking_count(id).await.map_err(|e| {
        error!("Failed to count bookings: {}", e);
        ApiError::InternalServerError
    })?;

    if bookings > 0 {
        return Err(ApiError::Conflict(
            "Cannot delete service with existing bookings. Deactivate it instead.".to_string(),
        ));
    }

    state.service_repository.delete(id).await.map_err(|e| {
        error!("Failed to delete service: {}", e);
        ApiError::InternalServerError
    })?;

    Ok(Json(json!({"success": true})))
}

/// Flip a service's active flag
pub async fn toggle_service(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&user, Policy::AdminOnly)?;

    let service = state
        .service_repository
        .toggle_active(id)
        .await
        .map_err(|e| {
            error!("Failed to toggle service: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or(ApiError::NotFound("Service"))?;

    Ok(Json(service))
}

// ---- User management ----

/// List all users
pub async fn list_users(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&user, Policy::AdminOnly)?;

    let users = state.user_repository.list_all().await.map_err(|e| {
        error!("Failed to list users: {}", e);
        ApiError::InternalServerError
    })?;

    Ok(Json(users))
}

/// Get a user by ID
pub async fn get_user(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&user, Policy::AdminOnly)?;

    let found = state
        .user_repository
        .find_by_id(id)
        .await
        .map_err(|e| {
            error!("Failed to get user: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or(ApiError::NotFound("User"))?;

    Ok(Json(found))
}

/// Edit a user's identity fields, re-checking email and NID uniqueness
pub async fn update_user(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UserUpdateInput>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&user, Policy::AdminOnly)?;
    payload.validate().map_err(ApiError::Validation)?;

    let target = state
        .user_repository
        .find_by_id(id)
        .await
        .map_err(|e| {
            error!("Failed to get user: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or(ApiError::NotFound("User"))?;

    if payload.email != target.email {
        let existing = state
            .user_repository
            .find_by_email(&payload.email)
            .await
            .map_err(|e| {
                error!("Failed to look up email: {}", e);
                ApiError::InternalServerError
            })?;

        if existing.is_some() {
            return Err(ApiError::Conflict("Email already in use".to_string()));
        }
    }

    if let Some(nid) = payload.nid.as_deref() {
        if target.nid.as_deref() != Some(nid) {
            let existing = state.user_repository.find_by_nid(nid).await.map_err(|e| {
                error!("Failed to look up NID: {}", e);
                ApiError::InternalServerError
            })?;

            if existing.is_some() {
                return Err(ApiError::Conflict("NID already in use".to_string()));
            }
        }
    }

    let updated = state.user_repository.update(id, &payload).await.map_err(|e| {
        error!("Failed to update user: {}", e);
        ApiError::InternalServerError
    })?;

    Ok(Json(updated))
}

/// Request for a role change
#[derive(Deserialize)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

/// Change a user's role. Admins cannot demote themselves.
pub async fn update_user_role(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&user, Policy::AdminOnly)?;

    if id == user.id && payload.role == Role::User {
        return Err(ApiError::Conflict("You cannot demote yourself".to_string()));
    }

    state
        .user_repository
        .find_by_id(id)
        .await
        .map_err(|e| {
            error!("Failed to get user: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or(ApiError::NotFound("User"))?;

    let updated = state
        .user_repository
        .update_role(id, payload.role)
        .await
        .map_err(|e| {
            error!("Failed to update role: {}", e);
            ApiError::InternalServerError
        })?;

    Ok(Json(updated))
}

/// Delete a user. Admins cannot delete themselves; bookings cascade.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&user, Policy::AdminOnly)?;

    if id == user.id {
        return Err(ApiError::Conflict("You cannot delete yourself".to_string()));
    }

    let deleted = state.user_repository.delete(id).await.map_err(|e| {
        error!("Failed to delete user: {}", e);
        ApiError::InternalServerError
    })?;

    if !deleted {
        return Err(ApiError::NotFound("User"));
    }

    Ok(Json(json!({"success": true})))
}

/// Request for an admin password reset
#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

/// Set a new password for a user
pub async fn reset_user_password(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&user, Policy::AdminOnly)?;

    if payload.password.len() < 6 {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters long".to_string(),
        ));
    }

    state
        .user_repository
        .find_by_id(id)
        .await
        .map_err(|e| {
            error!("Failed to get user: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or(ApiError::NotFound("User"))?;

    state
        .user_repository
        .set_password(id, &payload.password)
        .await
        .map_err(|e| {
            error!("Failed to reset password: {}", e);
            ApiError::InternalServerError
        })?;

    Ok(Json(json!({"success": true})))
}

// ---- Booking oversight ----

/// Query parameters for the admin bookings list
#[derive(Deserialize)]
pub struct ListBookingsQuery {
    pub status: Option<String>,
}

/// All bookings, optionally filtered by status
pub async fn list_bookings(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ListBookingsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&user, Policy::AdminOnly)?;

    let status = query
        .status
        .as_deref()
        .map(|s| s.parse::<BookingStatus>())
        .transpose()
        .map_err(ApiError::Validation)?;

    let bookings = state
        .booking_repository
        .list_all(status)
        .await
        .map_err(|e| {
            error!("Failed to list bookings: {}", e);
            ApiError::InternalServerError
        })?;

    Ok(Json(bookings))
}

/// Request for the booking status force-override
#[derive(Deserialize)]
pub struct ForceStatusRequest {
    pub status: BookingStatus,
}

/// Force a booking into any status, bypassing the lifecycle. Audited: the
/// actor, old status, and new status are logged.
pub async fn force_booking_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ForceStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&user, Policy::AdminOnly)?;

    let booking = state
        .booking_repository
        .find_by_id(id)
        .await
        .map_err(|e| {
            error!("Failed to get booking: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or(ApiError::NotFound("Booking"))?;

    warn!(
        "Admin {} forced booking {} from {} to {}",
        user.id, id, booking.status, payload.status
    );

    let updated = state
        .booking_repository
        .force_status(id, payload.status)
        .await
        .map_err(|e| {
            error!("Failed to force booking status: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or(ApiError::NotFound("Booking"))?;

    state.invalidate_dashboard_cache(updated.user_id).await;

    Ok(Json(updated))
}

// ---- Reports ----

/// Query parameters for the sales report
#[derive(Deserialize)]
pub struct SalesReportQuery {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Sales report: totals, counts by status, per-service counts, recent rows
pub async fn sales_report(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<SalesReportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&user, Policy::AdminOnly)?;

    let report = state
        .report_repository
        .sales_report(query.start_date, query.end_date)
        .await
        .map_err(|e| {
            error!("Failed to build sales report: {}", e);
            ApiError::InternalServerError
        })?;

    Ok(Json(report))
}

/// Query parameters for the per-service report
#[derive(Deserialize)]
pub struct ServiceReportQuery {
    pub limit: Option<i64>,
}

/// Per-service totals ordered by revenue
pub async fn service_report(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ServiceReportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&user, Policy::AdminOnly)?;

    let limit = query
        .limit
        .unwrap_or(SERVICE_REPORT_DEFAULT_LIMIT)
        .clamp(1, SERVICE_REPORT_MAX_LIMIT);

    let report = state
        .report_repository
        .service_report(limit)
        .await
        .map_err(|e| {
            error!("Failed to build service report: {}", e);
            ApiError::InternalServerError
        })?;

    Ok(Json(report))
}
