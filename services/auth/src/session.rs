//! Session management using Redis
//!
//! One session per user, keyed `session:{user_id}`, holding the currently
//! valid refresh token. The key expires with the refresh token so stale
//! sessions clean themselves up.

use anyhow::Result;
use common::cache::RedisPool;
use tracing::info;
use uuid::Uuid;

use crate::jwt::JwtService;

/// Session manager for handling user sessions in Redis
#[derive(Clone)]
pub struct SessionManager {
    redis_pool: RedisPool,
    jwt_service: JwtService,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(redis_pool: RedisPool, jwt_service: JwtService) -> Self {
        Self {
            redis_pool,
            jwt_service,
        }
    }

    fn session_key(user_id: Uuid) -> String {
        format!("session:{}", user_id)
    }

    /// Store the refresh token as the user's active session
    pub async fn create_session(&self, user_id: Uuid, refresh_token: &str) -> Result<()> {
        info!("Creating session for user: {}", user_id);

        self.redis_pool
            .set(
                &Self::session_key(user_id),
                refresh_token,
                Some(self.jwt_service.refresh_token_expiry()),
            )
            .await?;

        Ok(())
    }

    /// Get the refresh token stored for a user, if any
    pub async fn get_session(&self, user_id: Uuid) -> Result<Option<String>> {
        let refresh_token = self.redis_pool.get(&Self::session_key(user_id)).await?;
        Ok(refresh_token)
    }

    /// Delete a session for a user
    pub async fn delete_session(&self, user_id: Uuid) -> Result<()> {
        info!("Deleting session for user: {}", user_id);

        self.redis_pool.delete(&Self::session_key(user_id)).await?;
        Ok(())
    }

    /// Check that the presented refresh token matches the stored session
    pub async fn is_session_valid(&self, user_id: Uuid, refresh_token: &str) -> Result<bool> {
        let stored_token = self.get_session(user_id).await?;

        match stored_token {
            Some(token) => Ok(token == refresh_token),
            None => Ok(false),
        }
    }
}
