//! User repository for the API service
//!
//! Profile updates and the admin user surface. Registration and login live
//! in the auth service; both map the same users table.

use anyhow::Result;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use crate::models::{
    Role, User,
    user::{ProfileUpdateInput, UserUpdateInput},
};

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

    /// List all users, newest first
    pub async fn list_all(&self) -> Result<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.iter().map(user_from_row).collect()
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

    /// Find a user by email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&sql)
            .bind(email)
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

    /// Admin edit of a user's identity fields
    pub async fn update(&self, id: Uuid, input: &UserUpdateInput) -> Result<User> {
        let sql = format!(
            r#"
            UPDATE users
            SET name = $2, email = $3, contact = $4, nid = $5, updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.contact)
            .bind(&input.nid)
            .fetch_one(&self.pool)
            .await?;

        user_from_row(&row)
    }

    /// Self-service profile update
    pub async fn update_profile(&self, id: Uuid, input: &ProfileUpdateInput) -> Result<User> {
        let sql = format!(
            r#"
            UPDATE users
            SET name = $2, contact = $3, nid = $4, updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(&input.name)
            .bind(&input.contact)
            .bind(&input.nid)
            .fetch_one(&self.pool)
            .await?;

        user_from_row(&row)
    }

    /// Change a user's role
    pub async fn update_role(&self, id: Uuid, role: Role) -> Result<User> {
        info!("Setting role {} for user {}", role, id);

        let sql = format!(
            r#"
            UPDATE users
            SET role = $2, updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(role.as_str())
            .fetch_one(&self.pool)
            .await?;

        user_from_row(&row)
    }

    /// Delete a user; their bookings cascade
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Admin password reset
    pub async fn set_password(&self, id: Uuid, password: &str) -> Result<()> {
        let salt = SaltString::generate(&mut rand::thread_rng());
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
            .to_string();

        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&password_hash)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
