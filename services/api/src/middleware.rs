//! Authentication middleware and the authorization policy
//!
//! Authentication is one middleware that validates the bearer access token
//! and inserts an [`AuthUser`] into request extensions. Authorization is one
//! [`authorize`] predicate parameterized by [`Policy`]; every mutation
//! handler calls it instead of re-implementing role and ownership checks.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ApiError, models::Role, state::AppState};

/// JWT claims structure, mirroring what the auth service signs
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// Account email
    pub email: String,
    /// Account role (USER or ADMIN)
    pub role: String,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Token type (access or refresh)
    pub token_type: TokenType,
}

/// Token type enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum TokenType {
    /// Access token
    Access,
    /// Refresh token
    Refresh,
}

/// Authenticated caller
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

/// Token verifier built once at startup from the shared `AUTH_SECRET`
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    /// Create a verifier for HS256 tokens signed with `secret`
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.validate_exp = true;

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Validate an access token and return the caller it identifies
    pub fn verify(&self, token: &str) -> Result<AuthUser, ApiError> {
        let token_data =
            jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
                .map_err(|_| ApiError::Unauthorized)?;

        if token_data.claims.token_type != TokenType::Access {
            return Err(ApiError::Unauthorized);
        }

        let role: Role = token_data
            .claims
            .role
            .parse()
            .map_err(|_| ApiError::Unauthorized)?;

        Ok(AuthUser {
            id: token_data.claims.sub,
            email: token_data.claims.email,
            role,
        })
    }
}

fn bearer_token(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
}

/// Authentication middleware: rejects requests without a valid access token
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&req).ok_or(ApiError::Unauthorized)?;
    let user = state.jwt_verifier.verify(token)?;

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

/// Optional authentication for public routes: inserts an [`AuthUser`] when a
/// valid token is presented, passes the request through untouched otherwise
pub async fn optional_auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(&req) {
        if let Ok(user) = state.jwt_verifier.verify(token) {
            req.extensions_mut().insert(user);
        }
    }

    next.run(req).await
}

/// Authorization policy for a mutation entry point
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Policy {
    /// Any signed-in user
    Authenticated,
    /// Role must be ADMIN
    AdminOnly,
    /// Caller must be the resource owner
    Owner(Uuid),
}

/// The single authorization predicate applied at every mutation entry point
pub fn authorize(user: &AuthUser, policy: Policy) -> Result<(), ApiError> {
    match policy {
        Policy::Authenticated => Ok(()),
        Policy::AdminOnly => {
            if user.role == Role::Admin {
                Ok(())
            } else {
                Err(ApiError::Unauthorized)
            }
        }
        Policy::Owner(owner_id) => {
            if user.id == owner_id {
                Ok(())
            } else {
                Err(ApiError::Unauthorized)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: "test@care.xyz".to_string(),
            role,
        }
    }

    #[test]
    fn authenticated_policy_admits_any_caller() {
        assert!(authorize(&user(Role::User), Policy::Authenticated).is_ok());
        assert!(authorize(&user(Role::Admin), Policy::Authenticated).is_ok());
    }

    #[test]
    fn admin_only_rejects_plain_users() {
        assert!(authorize(&user(Role::Admin), Policy::AdminOnly).is_ok());
        assert!(matches!(
            authorize(&user(Role::User), Policy::AdminOnly),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn owner_policy_checks_identity_not_role() {
        let caller = user(Role::User);
        assert!(authorize(&caller, Policy::Owner(caller.id)).is_ok());

        // Admins are not owners of other people's bookings; they use the
        // force-override path instead.
        let admin = user(Role::Admin);
        assert!(matches!(
            authorize(&admin, Policy::Owner(caller.id)),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn verifier_round_trips_its_own_tokens() {
        use jsonwebtoken::{EncodingKey, Header, encode};

        let secret = "test-secret-for-unit-tests";
        let verifier = JwtVerifier::new(secret);

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs();

        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "test@care.xyz".to_string(),
            role: "ADMIN".to_string(),
            iat: now,
            exp: now + 900,
            token_type: TokenType::Access,
        };

        let token = encode(
            &Header::new(jsonwebtoken::Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();

        let user = verifier.verify(&token).unwrap();
        assert_eq!(user.id, claims.sub);
        assert_eq!(user.role, Role::Admin);

        // Refresh tokens must not pass the access-token check.
        let refresh = Claims {
            token_type: TokenType::Refresh,
            ..claims
        };
        let token = encode(
            &Header::new(jsonwebtoken::Algorithm::HS256),
            &refresh,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();
        assert!(verifier.verify(&token).is_err());

        assert!(JwtVerifier::new("other-secret").verify(&token).is_err());
    }
}
