//! JWT service for session token generation, validation, and management
//!
//! Tokens are signed with HS256 using the shared `AUTH_SECRET`. Refresh
//! tokens are rotated on use and blacklisted in Redis for their remaining
//! lifetime so a stolen token cannot be replayed.

use anyhow::Result;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::models::User;

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared secret for signing and verifying tokens
    pub secret: String,
    /// Access token expiration time in seconds (default: 15 minutes)
    pub access_token_expiry: u64,
    /// Refresh token expiration time in seconds (default: 7 days)
    pub refresh_token_expiry: u64,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `AUTH_SECRET`: Shared signing secret
    /// - `JWT_ACCESS_TOKEN_EXPIRY`: Access token expiry in seconds (default: 900)
    /// - `JWT_REFRESH_TOKEN_EXPIRY`: Refresh token expiry in seconds (default: 604800)
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var("AUTH_SECRET")
            .map_err(|_| anyhow::anyhow!("AUTH_SECRET environment variable not set"))?;

        let access_token_expiry = std::env::var("JWT_ACCESS_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "900".to_string()) // 15 minutes
            .parse()
            .unwrap_or(900);

        let refresh_token_expiry = std::env::var("JWT_REFRESH_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "604800".to_string()) // 7 days
            .parse()
            .unwrap_or(604800);

        Ok(JwtConfig {
            secret,
            access_token_expiry,
            refresh_token_expiry,
        })
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
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

/// Rebuild claims from a fresh user row. Pure: identity and timestamps are
/// preserved, role and email come from the database so role changes
/// propagate on the next refresh.
pub fn refresh_claims(claims: &Claims, user: &User) -> Claims {
    Claims {
        sub: claims.sub,
        email: user.email.clone(),
        role: user.role.as_str().to_string(),
        iat: claims.iat,
        exp: claims.exp,
        token_type: claims.token_type,
    }
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.validate_exp = true;

        JwtService {
            encoding_key,
            decoding_key,
            validation,
            config,
        }
    }

    /// Issue an access token for a user
    pub fn issue_access_token(&self, user: &User) -> Result<String> {
        let now = unix_now()?;

        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
            iat: now,
            exp: now + self.config.access_token_expiry,
            token_type: TokenType::Access,
        };

        self.encode_claims(&claims)
    }

    /// Issue a refresh token for a user
    pub fn issue_refresh_token(&self, user: &User) -> Result<String> {
        let now = unix_now()?;

        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
            iat: now,
            exp: now + self.config.refresh_token_expiry,
            token_type: TokenType::Refresh,
        };

        self.encode_claims(&claims)
    }

    /// Re-stamp refreshed claims as a new access token
    pub fn reissue_access_token(&self, claims: &Claims) -> Result<String> {
        let now = unix_now()?;

        let claims = Claims {
            iat: now,
            exp: now + self.config.access_token_expiry,
            token_type: TokenType::Access,
            ..claims.clone()
        };

        self.encode_claims(&claims)
    }

    fn encode_claims(&self, claims: &Claims) -> Result<String> {
        let token = encode(
            &Header::new(jsonwebtoken::Algorithm::HS256),
            claims,
            &self.encoding_key,
        )?;
        Ok(token)
    }

    /// Validate a token and return the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }

    /// Check if a token is blacklisted in Redis
    pub async fn is_token_blacklisted(
        &self,
        redis_pool: &common::cache::RedisPool,
        token: &str,
    ) -> Result<bool> {
        let key = format!("blacklisted_token:{}", token);
        let result = redis_pool.get(&key).await?;
        Ok(result.is_some())
    }

    /// Blacklist a token in Redis
    pub async fn blacklist_token(
        &self,
        redis_pool: &common::cache::RedisPool,
        token: &str,
        expiry: u64,
    ) -> Result<()> {
        let key = format!("blacklisted_token:{}", token);
        redis_pool.set(&key, "1", Some(expiry.max(1))).await?;
        Ok(())
    }

    /// Get the access token expiry time
    pub fn access_token_expiry(&self) -> u64 {
        self.config.access_token_expiry
    }

    /// Get the refresh token expiry time
    pub fn refresh_token_expiry(&self) -> u64 {
        self.config.refresh_token_expiry
    }

    /// Rotate a refresh token
    ///
    /// Blacklists the old refresh token for its remaining lifetime and
    /// issues a new one for the same user.
    pub async fn rotate_refresh_token(
        &self,
        redis_pool: &common::cache::RedisPool,
        user: &User,
        old_refresh_token: &str,
    ) -> Result<String> {
        let claims = self.validate_token(old_refresh_token)?;

        if claims.token_type != TokenType::Refresh {
            return Err(anyhow::anyhow!("Token is not a refresh token"));
        }

        if claims.sub != user.id {
            return Err(anyhow::anyhow!("Token does not belong to user"));
        }

        let now = unix_now()?;
        let expiry = claims.exp.saturating_sub(now);
        self.blacklist_token(redis_pool, old_refresh_token, expiry)
            .await?;

        self.issue_refresh_token(user)
    }
}

fn unix_now() -> Result<u64> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| anyhow::anyhow!("Failed to get current time: {}", e))?
        .as_secs();
    Ok(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::Utc;

    fn test_service() -> JwtService {
        JwtService::new(JwtConfig {
            secret: "test-secret-for-unit-tests".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 604800,
        })
    }

    fn test_user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Test User".to_string(),
            email: "test@care.xyz".to_string(),
            password_hash: None,
            role,
            contact: None,
            nid: None,
            division: None,
            district: None,
            upazila: None,
            address: None,
            image: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn access_token_round_trips() {
        let service = test_service();
        let user = test_user(Role::User);

        let token = service.issue_access_token(&user).unwrap();
        let claims = service.validate_token(&token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.role, "USER");
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn refresh_token_carries_refresh_type() {
        let service = test_service();
        let user = test_user(Role::Admin);

        let token = service.issue_refresh_token(&user).unwrap();
        let claims = service.validate_token(&token).unwrap();

        assert_eq!(claims.token_type, TokenType::Refresh);
        assert_eq!(claims.role, "ADMIN");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let service = test_service();
        let other = JwtService::new(JwtConfig {
            secret: "a-different-secret".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 604800,
        });

        let token = service.issue_access_token(&test_user(Role::User)).unwrap();
        assert!(other.validate_token(&token).is_err());
    }

    #[test]
    fn refresh_claims_picks_up_role_change() {
        let service = test_service();
        let mut user = test_user(Role::User);

        let token = service.issue_refresh_token(&user).unwrap();
        let claims = service.validate_token(&token).unwrap();

        // Promote the user, then rebuild claims from the fresh row.
        user.role = Role::Admin;
        let refreshed = refresh_claims(&claims, &user);

        assert_eq!(refreshed.role, "ADMIN");
        assert_eq!(refreshed.sub, claims.sub);
        assert_eq!(refreshed.iat, claims.iat);
        assert_eq!(refreshed.exp, claims.exp);
        assert_eq!(refreshed.token_type, claims.token_type);
    }

    #[test]
    fn reissued_access_token_reflects_refreshed_role() {
        let service = test_service();
        let mut user = test_user(Role::User);

        let token = service.issue_refresh_token(&user).unwrap();
        let claims = service.validate_token(&token).unwrap();

        user.role = Role::Admin;
        let refreshed = refresh_claims(&claims, &user);
        let access = service.reissue_access_token(&refreshed).unwrap();
        let access_claims = service.validate_token(&access).unwrap();

        assert_eq!(access_claims.role, "ADMIN");
        assert_eq!(access_claims.token_type, TokenType::Access);
    }
}
