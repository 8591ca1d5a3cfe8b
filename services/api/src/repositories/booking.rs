//! Booking repository

use anyhow::Result;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use crate::models::{
    Booking, BookingCreateRequest, BookingDetails, BookingStatus, Payment,
    booking::DashboardSummary,
};

const BOOKING_COLUMNS: &str = "id, user_id, service_id, duration_unit, duration_value, \
     division, district, city, area, address, total_cost, status, created_at, updated_at";

pub(crate) fn booking_from_row(row: &PgRow) -> Result<Booking> {
    let status: String = row.get("status");
    let duration_unit: String = row.get("duration_unit");

    Ok(Booking {
        id: row.get("id"),
        user_id: row.get("user_id"),
        service_id: row.get("service_id"),
        duration_unit: duration_unit.parse().map_err(|e: String| anyhow::anyhow!(e))?,
        duration_value: row.get("duration_value"),
        division: row.get("division"),
        district: row.get("district"),
        city: row.get("city"),
        area: row.get("area"),
        address: row.get("address"),
        total_cost: row.get("total_cost"),
        status: status.parse().map_err(|e: String| anyhow::anyhow!(e))?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn details_from_row(row: &PgRow) -> Result<BookingDetails> {
    let payment = match row.get::<Option<Uuid>, _>("payment_id") {
        Some(payment_id) => Some(Payment {
            id: payment_id,
            booking_id: row.get("id"),
            amount: row.get("payment_amount"),
            currency: row.get("payment_currency"),
            provider_intent_id: row.get("provider_intent_id"),
            status: row.get("payment_status"),
            receipt_url: row.get("receipt_url"),
            created_at: row.get("payment_created_at"),
        }),
        None => None,
    };

    Ok(BookingDetails {
        booking: booking_from_row(row)?,
        service_title: row.get("service_title"),
        payment,
    })
}

/// Columns for the joined booking/service/payment listings
const DETAILS_SELECT: &str = r#"
    SELECT b.id, b.user_id, b.service_id, b.duration_unit, b.duration_value,
           b.division, b.district, b.city, b.area, b.address,
           b.total_cost, b.status, b.created_at, b.updated_at,
           s.title AS service_title,
           p.id AS payment_id, p.amount AS payment_amount,
           p.currency AS payment_currency, p.provider_intent_id,
           p.status AS payment_status, p.receipt_url,
           p.created_at AS payment_created_at
    FROM bookings b
    JOIN services s ON s.id = b.service_id
    LEFT JOIN payments p ON p.booking_id = b.id
"#;

/// Booking repository
#[derive(Clone)]
pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    /// Create a new booking repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a booking with the server-computed total cost, status PENDING
    pub async fn create(
        &self,
        user_id: Uuid,
        request: &BookingCreateRequest,
        total_cost: i64,
    ) -> Result<Booking> {
        info!("Creating booking for user {}", user_id);

        let sql = format!(
            r#"
            INSERT INTO bookings (user_id, service_id, duration_unit, duration_value,
                                  division, district, city, area, address, total_cost, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'PENDING')
            RETURNING {BOOKING_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(request.service_id)
            .bind(request.duration_unit.as_str())
            .bind(request.duration_value)
            .bind(&request.division)
            .bind(&request.district)
            .bind(&request.city)
            .bind(&request.area)
            .bind(&request.address)
            .bind(total_cost)
            .fetch_one(&self.pool)
            .await?;

        booking_from_row(&row)
    }

    /// Find a booking by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(booking_from_row).transpose()
    }

    /// A user's bookings with service title and payment joined, newest first
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<BookingDetails>> {
        let sql = format!("{DETAILS_SELECT} WHERE b.user_id = $1 ORDER BY b.created_at DESC");
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(details_from_row).collect()
    }

    /// All bookings, optionally filtered by status, newest first
    pub async fn list_all(&self, status: Option<BookingStatus>) -> Result<Vec<BookingDetails>> {
        let rows = match status {
            Some(status) => {
                let sql =
                    format!("{DETAILS_SELECT} WHERE b.status = $1 ORDER BY b.created_at DESC");
                sqlx::query(&sql)
                    .bind(status.as_str())
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!("{DETAILS_SELECT} ORDER BY b.created_at DESC");
                sqlx::query(&sql).fetch_all(&self.pool).await?
            }
        };

        rows.iter().map(details_from_row).collect()
    }

    /// Compare-and-swap status update: succeeds only while the booking is
    /// still in one of the expected states, so a concurrent webhook or
    /// cancel cannot be overwritten.
    pub async fn update_status_guarded(
        &self,
        id: Uuid,
        expected: &[BookingStatus],
        next: BookingStatus,
    ) -> Result<bool> {
        let expected: Vec<String> = expected.iter().map(|s| s.as_str().to_string()).collect();

        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET status = $2, updated_at = now()
            WHERE id = $1 AND status = ANY($3)
            "#,
        )
        .bind(id)
        .bind(next.as_str())
        .bind(&expected)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Unconditional status update for the admin force-override
    pub async fn force_status(&self, id: Uuid, next: BookingStatus) -> Result<Option<Booking>> {
        let sql = format!(
            r#"
            UPDATE bookings
            SET status = $2, updated_at = now()
            WHERE id = $1
            RETURNING {BOOKING_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(next.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(booking_from_row).transpose()
    }

    /// Per-user booking counts by status and minor-unit total over the
    /// user's succeeded payments
    pub async fn dashboard_summary(&self, user_id: Uuid) -> Result<DashboardSummary> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) FILTER (WHERE b.status = 'PENDING') AS pending,
                   COUNT(*) FILTER (WHERE b.status = 'CONFIRMED') AS confirmed,
                   COUNT(*) FILTER (WHERE b.status = 'COMPLETED') AS completed,
                   COUNT(*) FILTER (WHERE b.status = 'CANCELLED') AS cancelled,
                   COALESCE(SUM(p.amount) FILTER (WHERE p.status = 'succeeded'), 0)::BIGINT
                       AS total_spent
            FROM bookings b
            LEFT JOIN payments p ON p.booking_id = b.id
            WHERE b.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(DashboardSummary {
            pending: row.get("pending"),
            confirmed: row.get("confirmed"),
            completed: row.get("completed"),
            cancelled: row.get("cancelled"),
            total_spent: row.get("total_spent"),
        })
    }
}
