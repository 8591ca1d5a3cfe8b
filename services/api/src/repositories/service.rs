//! Service catalog repository

use anyhow::Result;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use crate::models::{Service, ServiceInput};

const SERVICE_COLUMNS: &str =
    "id, title, slug, description, category, base_rate, active, image_url, created_at, updated_at";

fn service_from_row(row: &PgRow) -> Service {
    Service {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        description: row.get("description"),
        category: row.get("category"),
        base_rate: row.get("base_rate"),
        active: row.get("active"),
        image_url: row.get("image_url"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Service repository
#[derive(Clone)]
pub struct ServiceRepository {
    pool: PgPool,
}

impl ServiceRepository {
    /// Create a new service repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List services, optionally including deactivated ones
    pub async fn list(&self, include_inactive: bool) -> Result<Vec<Service>> {
        let sql = if include_inactive {
            format!("SELECT {SERVICE_COLUMNS} FROM services ORDER BY title")
        } else {
            format!("SELECT {SERVICE_COLUMNS} FROM services WHERE active ORDER BY title")
        };

        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(service_from_row).collect())
    }

    /// Find a service by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Service>> {
        let sql = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(service_from_row))
    }

    /// Find a service by slug
    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Service>> {
        let sql = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE slug = $1");
        let row = sqlx::query(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(service_from_row))
    }

    /// Create a new catalog service
    pub async fn create(&self, input: &ServiceInput) -> Result<Service> {
        info!("Creating service: {}", input.slug);

        let sql = format!(
            r#"
            INSERT INTO services (title, slug, description, category, base_rate, image_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {SERVICE_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(&input.title)
            .bind(&input.slug)
            .bind(&input.description)
            .bind(&input.category)
            .bind(input.base_rate)
            .bind(&input.image_url)
            .fetch_one(&self.pool)
            .await?;

        Ok(service_from_row(&row))
    }

    /// Update an existing service
    pub async fn update(&self, id: Uuid, input: &ServiceInput) -> Result<Service> {
        let sql = format!(
            r#"
            UPDATE services
            SET title = $2, slug = $3, description = $4, category = $5,
                base_rate = $6, image_url = $7, updated_at = now()
            WHERE id = $1
            RETURNING {SERVICE_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(&input.title)
            .bind(&input.slug)
            .bind(&input.description)
            .bind(&input.category)
            .bind(input.base_rate)
            .bind(&input.image_url)
            .fetch_one(&self.pool)
            .await?;

        Ok(service_from_row(&row))
    }

    /// Flip the active flag
    pub async fn toggle_active(&self, id: Uuid) -> Result<Option<Service>> {
        let sql = format!(
            r#"
            UPDATE services
            SET active = NOT active, updated_at = now()
            WHERE id = $1
            RETURNING {SERVICE_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(service_from_row))
    }

    /// Hard-delete a service. Callers must first check it has no bookings.
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM services WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Number of bookings referencing the service
    pub async fn booking_count(&self, id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE service_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
