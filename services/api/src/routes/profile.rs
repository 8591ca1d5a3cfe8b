//! Self-service profile routes

use axum::{
    Extension, Json, Router,
    extract::State,
    response::IntoResponse,
    routing::patch,
};

use crate::{
    error::ApiError,
    middleware::{AuthUser, Policy, authorize},
    models::user::ProfileUpdateInput,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/profile", patch(update_profile))
}

/// Update the caller's own name, contact, and NID
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<ProfileUpdateInput>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&user, Policy::Authenticated)?;
    payload.validate().map_err(ApiError::Validation)?;

    if let Some(nid) = payload.nid.as_deref() {
        let existing = state.user_repository.find_by_nid(nid).await.map_err(|e| {
            tracing::error!("Failed to look up NID: {}", e);
            ApiError::InternalServerError
        })?;

        if let Some(other) = existing {
            if other.id != user.id {
                return Err(ApiError::Conflict("NID already in use".to_string()));
            }
        }
    }

    let updated = state
        .user_repository
        .update_profile(user.id, &payload)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update profile: {}", e);
            ApiError::InternalServerError
        })?;

    Ok(Json(updated))
}
