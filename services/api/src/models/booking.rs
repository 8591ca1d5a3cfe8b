//! Booking models and the status lifecycle
//!
//! The lifecycle is `PENDING -> CONFIRMED -> COMPLETED`, with `CANCELLED`
//! reachable from `PENDING` or `CONFIRMED`. Every user-facing mutation and
//! the payment webhook go through [`BookingStatus::can_transition_to`]; only
//! the explicitly named admin force-override bypasses it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::Payment;

/// Longest bookable duration: 720 hours or 30 days
pub const MAX_DURATION_VALUE: i32 = 720;

/// Booking status. Stored as TEXT in the bookings table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "CONFIRMED")]
    Confirmed,
    #[serde(rename = "COMPLETED")]
    Completed,
    #[serde(rename = "CANCELLED")]
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }

    /// Whether the strict lifecycle permits moving to `next`
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;

        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Confirmed, Completed)
                | (Pending, Cancelled)
                | (Confirmed, Cancelled)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BookingStatus::Pending),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "COMPLETED" => Ok(BookingStatus::Completed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            other => Err(format!("unknown booking status: {}", other)),
        }
    }
}

/// Billing unit for a booking. Stored as TEXT in the bookings table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DurationUnit {
    #[serde(rename = "HOUR")]
    Hour,
    #[serde(rename = "DAY")]
    Day,
}

impl DurationUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            DurationUnit::Hour => "HOUR",
            DurationUnit::Day => "DAY",
        }
    }
}

impl FromStr for DurationUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HOUR" => Ok(DurationUnit::Hour),
            "DAY" => Ok(DurationUnit::Day),
            other => Err(format!("unknown duration unit: {}", other)),
        }
    }
}

/// Booking entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub service_id: Uuid,
    pub duration_unit: DurationUnit,
    pub duration_value: i32,
    pub division: String,
    pub district: String,
    pub city: String,
    pub area: String,
    pub address: String,
    /// Whole BDT, always recomputed server-side at creation
    pub total_cost: i64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A booking joined with its service title and payment, as listed on the
/// user dashboard and the admin bookings table
#[derive(Debug, Clone, Serialize)]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: Booking,
    pub service_title: String,
    pub payment: Option<Payment>,
}

/// Payload for creating a booking. Any client-supplied total is discarded;
/// the cost is recomputed from the service base rate.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingCreateRequest {
    pub service_id: Uuid,
    pub duration_unit: DurationUnit,
    pub duration_value: i32,
    pub division: String,
    pub district: String,
    pub city: String,
    pub area: String,
    pub address: String,
    /// Ignored. Present so clients sending it do not fail deserialization.
    #[serde(default)]
    pub total_cost: Option<i64>,
}

impl BookingCreateRequest {
    /// Validate the payload shape
    pub fn validate(&self) -> Result<(), String> {
        if self.duration_value < 1 {
            return Err("Duration must be at least 1".to_string());
        }

        if self.duration_value > MAX_DURATION_VALUE {
            return Err("Duration too long".to_string());
        }

        for (value, field) in [
            (&self.division, "Division"),
            (&self.district, "District"),
            (&self.city, "City"),
            (&self.area, "Area"),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{} is required", field));
            }
        }

        if self.address.trim().len() < 6 {
            return Err("Address is required".to_string());
        }

        Ok(())
    }
}

/// Compute the booking cost from the duration and the service base rate.
/// Widened to i64 so the largest catalog rates cannot overflow.
pub fn calculate_total_cost(duration_value: i32, base_rate: i32) -> i64 {
    i64::from(duration_value) * i64::from(base_rate)
}

/// Per-user dashboard summary, cached in Redis for five minutes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub pending: i64,
    pub confirmed: i64,
    pub completed: i64,
    pub cancelled: i64,
    /// Minor-unit sum over the user's succeeded payments
    pub total_spent: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_permits_only_forward_transitions() {
        use BookingStatus::*;

        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Cancelled));

        // Completed and cancelled bookings are terminal.
        for next in [Pending, Confirmed, Completed, Cancelled] {
            assert!(!Completed.can_transition_to(next));
            assert!(!Cancelled.can_transition_to(next));
        }

        // No skipping or rewinding.
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Confirmed.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Completed,
            BookingStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<BookingStatus>().unwrap(), status);
        }
        assert!("SHIPPED".parse::<BookingStatus>().is_err());
    }

    #[test]
    fn cost_is_duration_times_base_rate() {
        assert_eq!(calculate_total_cost(3, 500), 1500);
        assert_eq!(calculate_total_cost(1, 15000), 15000);
        // 720 hours of the most expensive catalog service stays in range.
        assert_eq!(calculate_total_cost(720, 15000), 10_800_000);
        // Worst representable inputs do not overflow the i64.
        assert_eq!(
            calculate_total_cost(i32::MAX, i32::MAX),
            i64::from(i32::MAX) * i64::from(i32::MAX)
        );
    }

    fn request() -> BookingCreateRequest {
        BookingCreateRequest {
            service_id: Uuid::new_v4(),
            duration_unit: DurationUnit::Hour,
            duration_value: 3,
            division: "Dhaka".to_string(),
            district: "Dhaka".to_string(),
            city: "Dhaka".to_string(),
            area: "Gulshan".to_string(),
            address: "House 12, Road 5, Gulshan-1".to_string(),
            total_cost: None,
        }
    }

    #[test]
    fn create_request_bounds_duration() {
        let mut r = request();
        r.duration_value = 0;
        assert!(r.validate().is_err());
        r.duration_value = 721;
        assert!(r.validate().is_err());
        r.duration_value = 720;
        assert!(r.validate().is_ok());
    }

    #[test]
    fn create_request_requires_location_fields() {
        let mut r = request();
        r.area = "  ".to_string();
        assert!(r.validate().is_err());

        let mut r = request();
        r.address = "short".to_string();
        assert!(r.validate().is_err());
    }
}
