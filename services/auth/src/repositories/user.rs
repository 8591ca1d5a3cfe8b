//! User repository for database operations

use anyhow::Result;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use crate::models::{NewUser, OAuthNewUser, User};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, contact, nid, \
     division, district, upazila, address, image, created_at, updated_at";

fn user_from_row(row: &PgRow) -> Result<User> {
    let role: String = row.get("role");
    Ok(User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role: role.parse().map_err(|e: String| anyhow::anyhow!(e))?,
        contact: row.get("contact"),
        nid: row.get("nid"),
        division: row.get("division"),
        district: row.get("district"),
        upazila: row.get("upazila"),
        address: row.get("address"),
        image: row.get("image"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user from a registration payload
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        info!("Creating new user: {}", new_user.email);

        let salt = SaltString::generate(&mut rand::thread_rng());
        let argon2 = Argon2::default();
        let password_hash = argon2
            .hash_password(new_user.password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
            .to_string();

        let sql = format!(
            r#"
            INSERT INTO users (name, email, password_hash, contact, nid)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(&new_user.name)
            .bind(&new_user.email)
            .bind(&password_hash)
            .bind(&new_user.contact)
            .bind(&new_user.nid)
            .fetch_one(&self.pool)
            .await?;

        user_from_row(&row)
    }

    /// Create a user on first OAuth sign-in. No password hash is stored;
    /// credentials login stays disabled for the account.
    pub async fn create_from_oauth(&self, profile: &OAuthNewUser) -> Result<User> {
        info!("Creating OAuth user: {}", profile.email);

        let sql = format!(
            r#"
            INSERT INTO users (name, email, image)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(&profile.name)
            .bind(&profile.email)
            .bind(&profile.image)
            .fetch_one(&self.pool)
            .await?;

        user_from_row(&row)
    }

    /// Find a user by email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Find a user by national ID
    pub async fn find_by_nid(&self, nid: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE nid = $1");
        let row = sqlx::query(&sql)
            .bind(nid)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Verify a user's password. OAuth-only accounts (no stored hash)
    /// always fail credentials verification.
    pub async fn verify_password(&self, user: &User, password: &str) -> Result<bool> {
        let Some(stored) = user.password_hash.as_deref() else {
            return Ok(false);
        };

        let parsed_hash = PasswordHash::new(stored)
            .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;

        let argon2 = Argon2::default();
        let result = argon2.verify_password(password.as_bytes(), &parsed_hash);

        Ok(result.is_ok())
    }

    /// Set the national ID and contact number collected after OAuth sign-up
    pub async fn complete_profile(&self, user_id: Uuid, nid: &str, contact: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET nid = $2, contact = $3, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(nid)
        .bind(contact)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
