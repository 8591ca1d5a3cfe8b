//! Payment repository
//!
//! Payments are only ever written here, by the webhook handler, inside one
//! transaction with the booking confirmation. The UNIQUE constraint on
//! `provider_intent_id` makes duplicate gateway delivery a no-op.

use anyhow::Result;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use crate::models::{BookingStatus, NewPayment, Payment};

const PAYMENT_COLUMNS: &str =
    "id, booking_id, amount, currency, provider_intent_id, status, receipt_url, created_at";

fn payment_from_row(row: &PgRow) -> Payment {
    Payment {
        id: row.get("id"),
        booking_id: row.get("booking_id"),
        amount: row.get("amount"),
        currency: row.get("currency"),
        provider_intent_id: row.get("provider_intent_id"),
        status: row.get("status"),
        receipt_url: row.get("receipt_url"),
        created_at: row.get("created_at"),
    }
}

/// Result of processing a succeeded payment event
#[derive(Debug)]
pub enum ConfirmOutcome {
    /// Booking confirmed and payment recorded
    Confirmed(Payment),
    /// The intent (or booking) already has a payment row; nothing written
    AlreadyProcessed,
    /// The booking is no longer in a state that can be confirmed
    InvalidState(BookingStatus),
}

/// Payment repository
#[derive(Clone)]
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    /// Create a new payment repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find the payment for a booking
    pub async fn find_by_booking(&self, booking_id: Uuid) -> Result<Option<Payment>> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE booking_id = $1");
        let row = sqlx::query(&sql)
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(payment_from_row))
    }

    /// Atomically record a succeeded payment and confirm its booking.
    ///
    /// The payment insert and the PENDING -> CONFIRMED transition commit
    /// together or not at all. A unique violation on the intent id means a
    /// redelivered event and rolls back cleanly.
    pub async fn confirm_booking(&self, payment: &NewPayment) -> Result<ConfirmOutcome> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            INSERT INTO payments (booking_id, amount, currency, provider_intent_id,
                                  status, receipt_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PAYMENT_COLUMNS}
            "#
        );
        let inserted = sqlx::query(&sql)
            .bind(payment.booking_id)
            .bind(payment.amount)
            .bind(&payment.currency)
            .bind(&payment.provider_intent_id)
            .bind(&payment.status)
            .bind(&payment.receipt_url)
            .fetch_one(&mut *tx)
            .await;

        let row = match inserted {
            Ok(row) => row,
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                tx.rollback().await?;
                info!(
                    "Payment intent {} already recorded, skipping",
                    payment.provider_intent_id
                );
                return Ok(ConfirmOutcome::AlreadyProcessed);
            }
            Err(e) => return Err(e.into()),
        };

        let updated = sqlx::query(
            r#"
            UPDATE bookings
            SET status = 'CONFIRMED', updated_at = now()
            WHERE id = $1 AND status = 'PENDING'
            "#,
        )
        .bind(payment.booking_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // The booking left PENDING some other way; don't attach a
            // payment to a state the lifecycle forbids.
            let status: String =
                sqlx::query_scalar("SELECT status FROM bookings WHERE id = $1")
                    .bind(payment.booking_id)
                    .fetch_one(&mut *tx)
                    .await?;

            tx.rollback().await?;
            let status = status.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            return Ok(ConfirmOutcome::InvalidState(status));
        }

        tx.commit().await?;

        Ok(ConfirmOutcome::Confirmed(payment_from_row(&row)))
    }
}
