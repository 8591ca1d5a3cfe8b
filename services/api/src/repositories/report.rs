//! Admin report queries
//!
//! Pure aggregation over bookings, payments, and services. Revenue sums are
//! taken over succeeded payments only, cast to BIGINT so the minor-unit
//! totals come back as i64.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::models::report::{
    SalesReport, SalesReportRow, ServiceBookingCount, ServiceReportRow, StatusCounts,
};

/// Rows shown in the sales report's recent-bookings table
const SALES_REPORT_ROW_LIMIT: i64 = 50;

/// Report repository
#[derive(Clone)]
pub struct ReportRepository {
    pool: PgPool,
}

impl ReportRepository {
    /// Create a new report repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Sales report over an optional date range: totals, counts by status,
    /// per-service counts, and the most recent bookings
    pub async fn sales_report(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<SalesReport> {
        let totals = sqlx::query(
            r#"
            SELECT COUNT(*) AS total_bookings,
                   COUNT(*) FILTER (WHERE b.status = 'PENDING') AS pending,
                   COUNT(*) FILTER (WHERE b.status = 'CONFIRMED') AS confirmed,
                   COUNT(*) FILTER (WHERE b.status = 'COMPLETED') AS completed,
                   COUNT(*) FILTER (WHERE b.status = 'CANCELLED') AS cancelled,
                   COALESCE(SUM(p.amount) FILTER (WHERE p.status = 'succeeded'), 0)::BIGINT
                       AS total_revenue
            FROM bookings b
            LEFT JOIN payments p ON p.booking_id = b.id
            WHERE ($1::timestamptz IS NULL OR b.created_at >= $1)
              AND ($2::timestamptz IS NULL OR b.created_at <= $2)
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        let by_service = sqlx::query(
            r#"
            SELECT s.title AS service_title, COUNT(*) AS bookings
            FROM bookings b
            JOIN services s ON s.id = b.service_id
            WHERE ($1::timestamptz IS NULL OR b.created_at >= $1)
              AND ($2::timestamptz IS NULL OR b.created_at <= $2)
            GROUP BY s.title
            ORDER BY bookings DESC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let recent = sqlx::query(
            r#"
            SELECT b.id, s.title AS service_title, u.name AS user_name,
                   u.email AS user_email, b.status, b.total_cost,
                   COALESCE(p.status, 'unpaid') AS payment_status, b.created_at
            FROM bookings b
            JOIN services s ON s.id = b.service_id
            JOIN users u ON u.id = b.user_id
            LEFT JOIN payments p ON p.booking_id = b.id
            WHERE ($1::timestamptz IS NULL OR b.created_at >= $1)
              AND ($2::timestamptz IS NULL OR b.created_at <= $2)
            ORDER BY b.created_at DESC
            LIMIT $3
            "#,
        )
        .bind(start)
        .bind(end)
        .bind(SALES_REPORT_ROW_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        let bookings = recent
            .iter()
            .map(|row| {
                let status: String = row.get("status");
                Ok(SalesReportRow {
                    id: row.get("id"),
                    service_title: row.get("service_title"),
                    user_name: row.get("user_name"),
                    user_email: row.get("user_email"),
                    status: status.parse().map_err(|e: String| anyhow::anyhow!(e))?,
                    total_cost: row.get("total_cost"),
                    payment_status: row.get("payment_status"),
                    created_at: row.get("created_at"),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(SalesReport {
            total_bookings: totals.get("total_bookings"),
            total_revenue: totals.get("total_revenue"),
            bookings_by_status: StatusCounts {
                pending: totals.get("pending"),
                confirmed: totals.get("confirmed"),
                completed: totals.get("completed"),
                cancelled: totals.get("cancelled"),
            },
            bookings_by_service: by_service
                .iter()
                .map(|row| ServiceBookingCount {
                    service_title: row.get("service_title"),
                    bookings: row.get("bookings"),
                })
                .collect(),
            bookings,
        })
    }

    /// Per-service totals ordered by revenue, top N
    pub async fn service_report(&self, limit: i64) -> Result<Vec<ServiceReportRow>> {
        let rows = sqlx::query(
            r#"
            SELECT s.id, s.title, s.category, s.active, s.base_rate,
                   COUNT(b.id) AS total_bookings,
                   COUNT(b.id) FILTER (WHERE b.status = 'COMPLETED') AS completed_bookings,
                   COALESCE(SUM(p.amount) FILTER (WHERE p.status = 'succeeded'), 0)::BIGINT
                       AS total_revenue
            FROM services s
            LEFT JOIN bookings b ON b.service_id = s.id
            LEFT JOIN payments p ON p.booking_id = b.id
            GROUP BY s.id
            ORDER BY total_revenue DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| ServiceReportRow {
                id: row.get("id"),
                title: row.get("title"),
                category: row.get("category"),
                active: row.get("active"),
                base_rate: row.get("base_rate"),
                total_bookings: row.get("total_bookings"),
                completed_bookings: row.get("completed_bookings"),
                total_revenue: row.get("total_revenue"),
            })
            .collect())
    }
}
