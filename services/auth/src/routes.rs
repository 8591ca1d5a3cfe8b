//! Authentication service routes

use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    AppState,
    jwt::{TokenType, refresh_claims},
    middleware::{AuthUser, auth_middleware},
    models::{LoginCredentials, NewUser, OAuthNewUser},
    oauth::OAuthSession,
    validation,
};

/// Lifetime of the stashed OAuth state between redirect and callback
const OAUTH_STATE_TTL_SECONDS: u64 = 600;

/// Response for token generation
#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Request for registration
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub contact: Option<String>,
    pub nid: Option<String>,
}

/// Request for token refresh and logout
#[derive(Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Request for profile completion after OAuth sign-up
#[derive(Deserialize)]
pub struct CompleteProfileRequest {
    pub nid: String,
    pub contact: String,
}

/// Query parameters Google sends to the OAuth callback
#[derive(Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: String,
    pub state: String,
}

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/auth/complete-profile", post(complete_profile))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh_token))
        .route("/auth/logout", post(logout))
        .route("/auth/oauth/google", get(google_oauth_start))
        .route("/auth/oauth/google/callback", get(google_oauth_callback))
        .merge(protected_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "auth-service"
    }))
}

/// Register a new account with email and password
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    validation::validate_name(&payload.name).map_err(AuthError::Validation)?;
    validation::validate_email(&payload.email).map_err(AuthError::Validation)?;
    validation::validate_password(&payload.password).map_err(AuthError::Validation)?;
    if let Some(contact) = payload.contact.as_deref() {
        validation::validate_contact(contact).map_err(AuthError::Validation)?;
    }
    if let Some(nid) = payload.nid.as_deref() {
        validation::validate_nid(nid).map_err(AuthError::Validation)?;
    }

    let existing = state
        .user_repository
        .find_by_email(&payload.email)
        .await
        .map_err(|e| {
            error!("Failed to look up email: {}", e);
            AuthError::InternalServerError
        })?;

    if existing.is_some() {
        return Err(AuthError::Conflict("Email already registered".to_string()));
    }

    if let Some(nid) = payload.nid.as_deref() {
        let existing = state.user_repository.find_by_nid(nid).await.map_err(|e| {
            error!("Failed to look up NID: {}", e);
            AuthError::InternalServerError
        })?;

        if existing.is_some() {
            return Err(AuthError::Conflict("NID already in use".to_string()));
        }
    }

    let user = state
        .user_repository
        .create(&NewUser {
            name: payload.name,
            email: payload.email,
            password: payload.password,
            contact: payload.contact,
            nid: payload.nid,
        })
        .await
        .map_err(|e| {
            error!("Failed to create user: {}", e);
            AuthError::InternalServerError
        })?;

    info!("Registered new user: {}", user.email);

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "user_id": user.id,
        })),
    ))
}

/// Credentials login endpoint
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginCredentials>,
) -> Result<impl IntoResponse, AuthError> {
    let allowed = state
        .rate_limiter
        .is_allowed(&payload.email)
        .await
        .map_err(|e| {
            error!("Rate limiter failure: {}", e);
            AuthError::InternalServerError
        })?;

    if !allowed {
        warn!("Rate limited login for: {}", payload.email);
        return Err(AuthError::TooManyRequests);
    }

    let user = state
        .user_repository
        .find_by_email(&payload.email)
        .await
        .map_err(|e| {
            error!("Failed to look up user: {}", e);
            AuthError::InternalServerError
        })?
        .ok_or(AuthError::Unauthorized)?;

    let valid = state
        .user_repository
        .verify_password(&user, &payload.password)
        .await
        .map_err(|e| {
            error!("Failed to verify password: {}", e);
            AuthError::InternalServerError
        })?;

    if !valid {
        return Err(AuthError::Unauthorized);
    }

    info!("Login for user: {}", user.email);
    issue_token_pair(&state, &user).await
}

/// Refresh token endpoint. Claims are rebuilt from the database so role and
/// profile changes propagate here, and the refresh token is rotated.
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let claims = state
        .jwt_service
        .validate_token(&payload.refresh_token)
        .map_err(|_| AuthError::Unauthorized)?;

    if claims.token_type != TokenType::Refresh {
        return Err(AuthError::Unauthorized);
    }

    let is_blacklisted = state
        .jwt_service
        .is_token_blacklisted(&state.redis_pool, &payload.refresh_token)
        .await
        .map_err(|e| {
            error!("Failed to check if token is blacklisted: {}", e);
            AuthError::InternalServerError
        })?;

    if is_blacklisted {
        return Err(AuthError::Unauthorized);
    }

    let session_valid = state
        .session_manager
        .is_session_valid(claims.sub, &payload.refresh_token)
        .await
        .map_err(|e| {
            error!("Failed to check session: {}", e);
            AuthError::InternalServerError
        })?;

    if !session_valid {
        return Err(AuthError::Unauthorized);
    }

    let user = state
        .user_repository
        .find_by_id(claims.sub)
        .await
        .map_err(|e| {
            error!("Failed to look up user: {}", e);
            AuthError::InternalServerError
        })?
        .ok_or(AuthError::Unauthorized)?;

    let refreshed = refresh_claims(&claims, &user);

    let access_token = state
        .jwt_service
        .reissue_access_token(&refreshed)
        .map_err(|e| {
            error!("Failed to reissue access token: {}", e);
            AuthError::InternalServerError
        })?;

    let new_refresh_token = state
        .jwt_service
        .rotate_refresh_token(&state.redis_pool, &user, &payload.refresh_token)
        .await
        .map_err(|e| {
            error!("Failed to rotate refresh token: {}", e);
            AuthError::InternalServerError
        })?;

    state
        .session_manager
        .create_session(user.id, &new_refresh_token)
        .await
        .map_err(|e| {
            error!("Failed to update session: {}", e);
            AuthError::InternalServerError
        })?;

    let response = TokenResponse {
        access_token,
        refresh_token: new_refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt_service.access_token_expiry(),
    };

    Ok((StatusCode::OK, Json(response)))
}

/// Logout endpoint
pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let claims = state
        .jwt_service
        .validate_token(&payload.refresh_token)
        .map_err(|_| AuthError::Unauthorized)?;

    if claims.token_type != TokenType::Refresh {
        return Err(AuthError::Unauthorized);
    }

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_err(|e| {
            error!("Failed to get current time: {}", e);
            AuthError::InternalServerError
        })?
        .as_secs();

    let expiry = claims.exp.saturating_sub(now);
    state
        .jwt_service
        .blacklist_token(&state.redis_pool, &payload.refresh_token, expiry)
        .await
        .map_err(|e| {
            error!("Failed to blacklist token: {}", e);
            AuthError::InternalServerError
        })?;

    state
        .session_manager
        .delete_session(claims.sub)
        .await
        .map_err(|e| {
            error!("Failed to remove session: {}", e);
            AuthError::InternalServerError
        })?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({"message": "Logged out successfully"})),
    ))
}

/// Begin the Google sign-in flow: stash CSRF state and PKCE verifier in
/// Redis, then redirect the browser to Google's consent screen.
pub async fn google_oauth_start(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AuthError> {
    let Some(oauth_client) = state.oauth_client.as_ref() else {
        error!("Google OAuth requested but GOOGLE_CLIENT_ID/GOOGLE_CLIENT_SECRET are not set");
        return Err(AuthError::InternalServerError);
    };

    let (auth_url, csrf_token, pkce_verifier) = oauth_client
        .generate_auth_url(&["openid", "email", "profile"])
        .map_err(|e| {
            error!("Failed to generate authorization URL: {}", e);
            AuthError::InternalServerError
        })?;

    let created_at = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_err(|e| {
            error!("Failed to get current time: {}", e);
            AuthError::InternalServerError
        })?
        .as_secs();

    let session = OAuthSession {
        csrf_token: csrf_token.secret().clone(),
        pkce_verifier: pkce_verifier.secret().clone(),
        created_at,
    };

    let session_json = serde_json::to_string(&session).map_err(|e| {
        error!("Failed to serialize OAuth session: {}", e);
        AuthError::InternalServerError
    })?;

    state
        .redis_pool
        .set(
            &OAuthSession::key(csrf_token.secret()),
            &session_json,
            Some(OAUTH_STATE_TTL_SECONDS),
        )
        .await
        .map_err(|e| {
            error!("Failed to store OAuth session: {}", e);
            AuthError::InternalServerError
        })?;

    Ok(Redirect::temporary(&auth_url))
}

/// Google OAuth callback: verify state, exchange the code, and sign the
/// user in. First sign-in creates the account without a password hash; an
/// existing email links to the same account.
pub async fn google_oauth_callback(
    State(state): State<AppState>,
    Query(query): Query<OAuthCallbackQuery>,
) -> Result<impl IntoResponse, AuthError> {
    let Some(oauth_client) = state.oauth_client.as_ref() else {
        error!("Google OAuth callback hit but Google sign-in is not configured");
        return Err(AuthError::InternalServerError);
    };

    let session_key = OAuthSession::key(&query.state);
    let session_json = state
        .redis_pool
        .get(&session_key)
        .await
        .map_err(|e| {
            error!("Failed to load OAuth session: {}", e);
            AuthError::InternalServerError
        })?
        .ok_or(AuthError::Unauthorized)?;

    // One-shot state: a replayed callback must not find it again.
    if let Err(e) = state.redis_pool.delete(&session_key).await {
        warn!("Failed to delete OAuth session: {}", e);
    }

    let session: OAuthSession = serde_json::from_str(&session_json).map_err(|e| {
        error!("Failed to parse OAuth session: {}", e);
        AuthError::InternalServerError
    })?;

    if session.csrf_token != query.state {
        return Err(AuthError::Unauthorized);
    }

    let access_token = oauth_client
        .exchange_code(
            query.code,
            oauth2::PkceCodeVerifier::new(session.pkce_verifier),
        )
        .await
        .map_err(|e| {
            error!("Failed to exchange authorization code: {}", e);
            AuthError::Unauthorized
        })?;

    let profile = oauth_client
        .get_user_profile(&access_token)
        .await
        .map_err(|e| {
            error!("Failed to fetch Google profile: {}", e);
            AuthError::InternalServerError
        })?;

    let user = match state
        .user_repository
        .find_by_email(&profile.email)
        .await
        .map_err(|e| {
            error!("Failed to look up user: {}", e);
            AuthError::InternalServerError
        })? {
        Some(user) => user,
        None => state
            .user_repository
            .create_from_oauth(&OAuthNewUser {
                name: profile.name.clone(),
                email: profile.email.clone(),
                image: profile.picture.clone(),
            })
            .await
            .map_err(|e| {
                error!("Failed to create OAuth user: {}", e);
                AuthError::InternalServerError
            })?,
    };

    info!("Google sign-in for user: {}", user.email);
    issue_token_pair(&state, &user).await
}

/// Set the national ID and contact number collected after OAuth sign-up
pub async fn complete_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<CompleteProfileRequest>,
) -> Result<impl IntoResponse, AuthError> {
    validation::validate_nid(&payload.nid).map_err(AuthError::Validation)?;
    validation::validate_contact(&payload.contact).map_err(AuthError::Validation)?;

    let existing = state
        .user_repository
        .find_by_nid(&payload.nid)
        .await
        .map_err(|e| {
            error!("Failed to look up NID: {}", e);
            AuthError::InternalServerError
        })?;

    if let Some(other) = existing {
        if other.id != auth_user.id {
            return Err(AuthError::Conflict("NID already in use".to_string()));
        }
    }

    state
        .user_repository
        .complete_profile(auth_user.id, &payload.nid, &payload.contact)
        .await
        .map_err(|e| {
            error!("Failed to complete profile: {}", e);
            AuthError::InternalServerError
        })?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({"success": true})),
    ))
}

/// Issue an access/refresh pair and store the session
async fn issue_token_pair(
    state: &AppState,
    user: &crate::models::User,
) -> Result<(StatusCode, Json<TokenResponse>), AuthError> {
    let access_token = state.jwt_service.issue_access_token(user).map_err(|e| {
        error!("Failed to issue access token: {}", e);
        AuthError::InternalServerError
    })?;

    let refresh_token = state.jwt_service.issue_refresh_token(user).map_err(|e| {
        error!("Failed to issue refresh token: {}", e);
        AuthError::InternalServerError
    })?;

    state
        .session_manager
        .create_session(user.id, &refresh_token)
        .await
        .map_err(|e| {
            error!("Failed to store session: {}", e);
            AuthError::InternalServerError
        })?;

    let response = TokenResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt_service.access_token_expiry(),
    };

    Ok((StatusCode::OK, Json(response)))
}

/// Custom error type for authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("Too many attempts, try again later")]
    TooManyRequests,

    #[error("Internal server error")]
    InternalServerError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::Conflict(_) => StatusCode::CONFLICT,
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            AuthError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(serde_json::json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_map_to_expected_statuses() {
        let cases = [
            (AuthError::Unauthorized, StatusCode::UNAUTHORIZED),
            (
                AuthError::Conflict("dup".to_string()),
                StatusCode::CONFLICT,
            ),
            (
                AuthError::Validation("bad".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (AuthError::TooManyRequests, StatusCode::TOO_MANY_REQUESTS),
            (
                AuthError::InternalServerError,
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
