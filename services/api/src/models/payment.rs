//! Payment models
//!
//! A payment is recorded only by the webhook handler on a succeeded charge,
//! one per booking. Amounts are stored in the minor currency unit (poisha)
//! exactly as reported by the gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payment entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    /// Minor currency unit (poisha)
    pub amount: i64,
    pub currency: String,
    /// Gateway payment-intent id; unique, so duplicate webhook delivery
    /// is a no-op
    pub provider_intent_id: String,
    pub status: String,
    pub receipt_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Payment row to insert on a confirmed charge
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub booking_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub provider_intent_id: String,
    pub status: String,
    pub receipt_url: Option<String>,
}
