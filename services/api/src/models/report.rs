//! Admin report models
//!
//! Read-only aggregations over bookings, payments, and services. Revenue
//! only counts succeeded payments, in the minor currency unit.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::BookingStatus;

/// Booking counts broken down by status
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusCounts {
    pub pending: i64,
    pub confirmed: i64,
    pub completed: i64,
    pub cancelled: i64,
}

/// Bookings per service title
#[derive(Debug, Clone, Serialize)]
pub struct ServiceBookingCount {
    pub service_title: String,
    pub bookings: i64,
}

/// One row of the sales report's recent-bookings table
#[derive(Debug, Clone, Serialize)]
pub struct SalesReportRow {
    pub id: Uuid,
    pub service_title: String,
    pub user_name: String,
    pub user_email: String,
    pub status: BookingStatus,
    pub total_cost: i64,
    pub payment_status: String,
    pub created_at: DateTime<Utc>,
}

/// Sales report over an optional date range
#[derive(Debug, Clone, Serialize)]
pub struct SalesReport {
    pub total_bookings: i64,
    /// Minor-unit sum over succeeded payments
    pub total_revenue: i64,
    pub bookings_by_status: StatusCounts,
    pub bookings_by_service: Vec<ServiceBookingCount>,
    pub bookings: Vec<SalesReportRow>,
}

/// Per-service totals, ordered by revenue
#[derive(Debug, Clone, Serialize)]
pub struct ServiceReportRow {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub active: bool,
    pub base_rate: i32,
    pub total_bookings: i64,
    pub completed_bookings: i64,
    /// Minor-unit sum over succeeded payments
    pub total_revenue: i64,
}
